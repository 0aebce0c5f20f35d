use std::collections::HashMap;

use serde_json::Value;

use crate::error::PatchwireError;

/// Renders a whole named template to markup.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, name: &str, data: &Value) -> Result<String, PatchwireError>;
}

/// Renders one named fragment of a template without the enclosing template.
///
/// Implementations must scope `data` to the fragment being rendered: values
/// passed for one fragment are never visible to a sibling.
pub trait FragmentResolver: Send + Sync {
    fn render(&self, template: &str, fragment: &str, data: &Value) -> Result<String, PatchwireError>;
}

/// A failure caught at the streaming callback boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub kind: String,
    pub message: String,
    /// Outermost first.
    pub trace: Vec<String>,
}

impl Fault {
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut trace = Vec::new();
        let mut source = err.source();
        while let Some(inner) = source {
            trace.push(inner.to_string());
            source = inner.source();
        }
        let kind = err
            .downcast_ref::<PatchwireError>()
            .map(|e| e.kind().to_string())
            .unwrap_or_else(|| "Error".to_string());
        Self {
            kind,
            message: err.to_string(),
            trace,
        }
    }

    /// Builds a fault from a `catch_unwind` payload.
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked".to_string()
        };
        Self {
            kind: "Panic".to_string(),
            message,
            trace: Vec::new(),
        }
    }
}

/// Host hook that turns a fault into a full HTML error document.
pub trait ExceptionRenderer: Send + Sync {
    fn render(&self, fault: &Fault) -> String;
}

/// In-memory templates with `{{ key }}` placeholders filled from top-level
/// data keys. Values are HTML-escaped; unknown keys render empty.
#[derive(Debug, Default, Clone)]
pub struct StaticTemplates {
    templates: HashMap<String, String>,
    fragments: HashMap<(String, String), String>,
}

impl StaticTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, name: &str, source: &str) -> Self {
        self.templates.insert(name.to_string(), source.to_string());
        self
    }

    pub fn with_fragment(mut self, template: &str, fragment: &str, source: &str) -> Self {
        self.fragments
            .insert((template.to_string(), fragment.to_string()), source.to_string());
        self
    }
}

impl TemplateRenderer for StaticTemplates {
    fn render(&self, name: &str, data: &Value) -> Result<String, PatchwireError> {
        let source = self
            .templates
            .get(name)
            .ok_or_else(|| PatchwireError::render(format!("template `{name}` not found")))?;
        Ok(interpolate(source, data))
    }
}

impl FragmentResolver for StaticTemplates {
    fn render(&self, template: &str, fragment: &str, data: &Value) -> Result<String, PatchwireError> {
        let source = self
            .fragments
            .get(&(template.to_string(), fragment.to_string()))
            .ok_or_else(|| {
                PatchwireError::render(format!("fragment `{fragment}` not found in `{template}`"))
            })?;
        Ok(interpolate(source, data))
    }
}

fn interpolate(source: &str, data: &Value) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = after[..end].trim();
        match data.get(key) {
            Some(Value::String(s)) => out.push_str(&escape_html(s)),
            Some(Value::Null) | None => {}
            Some(other) => out.push_str(&escape_html(&other.to_string())),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
