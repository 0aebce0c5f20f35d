//! Script carriers: code shipped to the client as a self-removing `<script>`
//! appended to `body`, plus the documents used by terminal events.

use patchwire_core::render::escape_html;
use patchwire_core::{Fault, PatchwireError};
use serde::Serialize;
use serde_json::{json, Value};

use crate::element::{ElementPatch, PatchMode};
use crate::event::PatchOperation;

/// Encodes `value` as a JS string literal that is also safe inside a
/// `<script>` element.
pub fn js_string(value: &str) -> Result<String, PatchwireError> {
    js_value(&Value::String(value.to_string()))
}

pub fn js_value(value: &Value) -> Result<String, PatchwireError> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

/// Wraps `code` in a script element that removes itself once executed.
pub fn script_operation(code: &str) -> PatchOperation {
    let body = code.replace("</", "<\\/");
    PatchOperation::Elements {
        markup: format!(
            "<script data-patchwire-script>\n{body}\ndocument.currentScript && document.currentScript.remove();\n</script>"
        ),
        target: ElementPatch::at("body", PatchMode::Append),
    }
}

/// Where a dispatched custom event is fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOptions {
    /// `None` fires on `window`.
    pub selector: Option<String>,
    /// Fire on every match instead of only the first.
    pub all: bool,
    pub bubbles: bool,
    pub cancelable: bool,
    pub composed: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            selector: None,
            all: false,
            bubbles: true,
            cancelable: true,
            composed: true,
        }
    }
}

impl DispatchOptions {
    pub fn global() -> Self {
        Self::default()
    }

    pub fn first(selector: &str) -> Self {
        Self {
            selector: Some(selector.to_string()),
            ..Self::default()
        }
    }

    pub fn all(selector: &str) -> Self {
        Self {
            selector: Some(selector.to_string()),
            all: true,
            ..Self::default()
        }
    }
}

/// Builds the JS that fires a `CustomEvent` named `event` carrying `detail`.
pub fn dispatch_script(
    event: &str,
    detail: &impl Serialize,
    options: &DispatchOptions,
) -> Result<String, PatchwireError> {
    if event.trim().is_empty() {
        return Err(PatchwireError::usage("dispatch requires a non-empty event name"));
    }
    let init = json!({
        "bubbles": options.bubbles,
        "cancelable": options.cancelable,
        "composed": options.composed,
        "detail": serde_json::to_value(detail)?,
    });
    let ctor = format!("new CustomEvent({}, {})", js_string(event)?, js_value(&init)?);
    Ok(match (&options.selector, options.all) {
        (None, _) => format!("window.dispatchEvent({ctor});"),
        (Some(selector), false) => format!(
            "document.querySelector({})?.dispatchEvent({ctor});",
            js_string(selector)?
        ),
        (Some(selector), true) => format!(
            "document.querySelectorAll({}).forEach((el) => el.dispatchEvent({ctor}));",
            js_string(selector)?
        ),
    })
}

pub fn console_log_script(value: &Value) -> Result<String, PatchwireError> {
    Ok(format!("console.log({});", js_value(value)?))
}

/// Script replacing the entire rendered document with `html`.
pub fn replace_document_script(html: &str) -> Result<String, PatchwireError> {
    Ok(format!(
        "document.open();\ndocument.write({});\ndocument.close();",
        js_string(html)?
    ))
}

pub fn redirect_document(url: &str) -> Result<String, PatchwireError> {
    Ok(format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><script>window.location.href = {};</script></head><body></body></html>",
        js_string(url)?
    ))
}

pub fn dump_document(value: &Value) -> Result<String, PatchwireError> {
    let pretty = serde_json::to_string_pretty(value)?;
    Ok(format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>Dump</title></head>\
         <body><pre class=\"patchwire-dump\">{}</pre></body></html>",
        escape_html(&pretty)
    ))
}

/// Inline error page used when the host installed no exception renderer.
pub fn fault_document(fault: &Fault) -> String {
    let mut trace = String::new();
    for frame in &fault.trace {
        trace.push_str("<li>");
        trace.push_str(&escape_html(frame));
        trace.push_str("</li>");
    }
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{kind}</title></head>\
         <body><h1>{kind}</h1><p class=\"message\">{message}</p><ol class=\"trace\">{trace}</ol></body></html>",
        kind = escape_html(&fault.kind),
        message = escape_html(&fault.message),
    )
}
