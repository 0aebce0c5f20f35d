use bytes::Bytes;
use patchwire_core::PatchwireError;
use serde_json::{Map, Value};

use crate::element::ElementPatch;

pub const STATE_PATCH: &str = "state-patch";
pub const COMPONENT_STATE_PATCH: &str = "component-state-patch";
pub const METHOD_INVOKE: &str = "method-invoke";
pub const ELEMENT_PATCH: &str = "element-patch";

/// `id` / `retry` fields stamped onto every block emitted after they are set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventEnvelope {
    pub id: Option<String>,
    pub retry_ms: Option<u64>,
}

impl EventEnvelope {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.retry_ms.is_none()
    }
}

/// One atomic instruction for the reactive client.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOperation {
    /// Merge patch against the client's global state.
    State {
        patch: Map<String, Value>,
        only_if_missing: bool,
    },
    Elements {
        markup: String,
        target: ElementPatch,
    },
    /// Merge patch against one named component's local state.
    ComponentState {
        component: String,
        patch: Map<String, Value>,
        only_if_missing: bool,
    },
    MethodInvocation {
        component: String,
        method: String,
        args: Vec<Value>,
    },
}

impl PatchOperation {
    pub fn event_type(&self) -> &'static str {
        match self {
            PatchOperation::State { .. } => STATE_PATCH,
            PatchOperation::Elements { .. } => ELEMENT_PATCH,
            PatchOperation::ComponentState { .. } => COMPONENT_STATE_PATCH,
            PatchOperation::MethodInvocation { .. } => METHOD_INVOKE,
        }
    }

    /// The `data:` payload lines of this operation, without the field prefix.
    pub fn data_lines(&self) -> Result<Vec<String>, PatchwireError> {
        Ok(match self {
            PatchOperation::State { patch, only_if_missing } => {
                let mut lines = Vec::with_capacity(2);
                if *only_if_missing {
                    lines.push("onlyIfMissing true".to_string());
                }
                push_prefixed(&mut lines, "state", &compact_json(&Value::Object(patch.clone()))?);
                lines
            }
            PatchOperation::Elements { markup, target } => {
                let mut lines = target.header_lines();
                push_prefixed(&mut lines, "elements", markup);
                lines
            }
            PatchOperation::ComponentState {
                component,
                patch,
                only_if_missing,
            } => {
                let mut lines = vec![format!("component {component}")];
                if *only_if_missing {
                    lines.push("onlyIfMissing true".to_string());
                }
                push_prefixed(&mut lines, "state", &compact_json(&Value::Object(patch.clone()))?);
                lines
            }
            PatchOperation::MethodInvocation {
                component,
                method,
                args,
            } => vec![
                format!("component {component}"),
                format!("method {method}"),
                format!("args {}", compact_json(&Value::Array(args.clone()))?),
            ],
        })
    }

    /// Serializes the operation into one wire block, blank line included.
    pub fn encode(&self, envelope: &EventEnvelope) -> Result<Bytes, PatchwireError> {
        let data = self.data_lines()?;
        Ok(Bytes::from(encode_block(envelope, self.event_type(), &data)))
    }
}

/// Writes `id`, `retry`, `event` and one `data:` line per entry, then the
/// terminating blank line. Line breaks inside the id are dropped.
pub fn encode_block(envelope: &EventEnvelope, event: &str, data: &[String]) -> String {
    let mut out = String::with_capacity(32 + data.iter().map(|l| l.len() + 7).sum::<usize>());
    if let Some(id) = &envelope.id {
        out.push_str("id: ");
        out.extend(id.chars().filter(|c| !matches!(c, '\r' | '\n')));
        out.push('\n');
    }
    if let Some(ms) = envelope.retry_ms {
        out.push_str("retry: ");
        out.push_str(&ms.to_string());
        out.push('\n');
    }
    out.push_str("event: ");
    out.push_str(event);
    out.push('\n');
    for line in data {
        out.push_str("data: ");
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');
    out
}

/// Splits on every line terminator the event-stream grammar knows:
/// `\r\n`, bare `\r` and bare `\n`. One trailing terminator is ignored.
pub(crate) fn wire_lines(payload: &str) -> Vec<&str> {
    if payload.is_empty() {
        return Vec::new();
    }
    let body = payload
        .strip_suffix("\r\n")
        .or_else(|| payload.strip_suffix('\n'))
        .or_else(|| payload.strip_suffix('\r'))
        .unwrap_or(payload);
    body.split("\r\n")
        .flat_map(|line| line.split(&['\r', '\n'][..]))
        .collect()
}

// A raw line break inside a data line would end the field early, so
// multi-line payloads become one prefixed line each.
fn push_prefixed(lines: &mut Vec<String>, prefix: &str, payload: &str) {
    for line in wire_lines(payload) {
        lines.push(format!("{prefix} {line}"));
    }
}

fn compact_json(value: &Value) -> Result<String, PatchwireError> {
    Ok(serde_json::to_string(value)?)
}
