//! Client navigation intents.
//!
//! The server only validates and encodes the intent. Resolving merge /
//! only / except / replace against the live address bar is left to the
//! client, which is the only party that knows it at apply time.

use patchwire_core::{PatchwireError, RequestInfo};
use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub enum NavigateTarget {
    /// Literal URL or path.
    Url(String),
    /// Query parameters applied to the current path. `null` values are skipped.
    Query(Map<String, Value>),
}

impl From<&str> for NavigateTarget {
    fn from(url: &str) -> Self {
        NavigateTarget::Url(url.to_string())
    }
}

impl From<String> for NavigateTarget {
    fn from(url: String) -> Self {
        NavigateTarget::Url(url)
    }
}

impl From<Map<String, Value>> for NavigateTarget {
    fn from(query: Map<String, Value>) -> Self {
        NavigateTarget::Query(query)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NavigateOptions {
    /// Merge the target's query onto the live query string.
    pub merge: bool,
    /// Keep only these live query parameters.
    pub only: Vec<String>,
    /// Drop these live query parameters.
    pub except: Vec<String>,
    /// Replace the current history entry instead of pushing one.
    pub replace: bool,
}

impl NavigateOptions {
    pub fn merge_with_current() -> Self {
        Self {
            merge: true,
            ..Self::default()
        }
    }

    pub fn except_params<S: AsRef<str>>(params: &[S]) -> Self {
        Self {
            merge: true,
            except: params.iter().map(|p| p.as_ref().to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn only_params<S: AsRef<str>>(params: &[S]) -> Self {
        Self {
            merge: true,
            only: params.iter().map(|p| p.as_ref().to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn replace_history_entry() -> Self {
        Self {
            replace: true,
            ..Self::default()
        }
    }

    /// Keeps the live query but drops the pagination parameter.
    pub fn reset_pagination(param: &str) -> Self {
        Self::except_params(&[param])
    }
}

/// Detail object of the dispatched navigation event.
#[derive(Debug, Serialize)]
pub struct NavigateIntent<'a> {
    pub url: &'a str,
    pub key: &'a str,
    pub options: &'a NavigateOptions,
    pub nonce: String,
}

/// Permits exactly one navigation per response.
#[derive(Debug, Default)]
pub struct UrlLock {
    locked: bool,
}

impl UrlLock {
    pub fn ensure_unlocked(&self) -> Result<(), PatchwireError> {
        if self.locked {
            return Err(PatchwireError::usage(
                "navigate() may only be called once per response",
            ));
        }
        Ok(())
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

pub struct NavigationValidator<'a> {
    request: &'a dyn RequestInfo,
}

impl<'a> NavigationValidator<'a> {
    pub fn new(request: &'a dyn RequestInfo) -> Self {
        Self { request }
    }

    /// Turns a target into the URL the client navigates to.
    pub fn resolve(&self, target: &NavigateTarget) -> Result<String, PatchwireError> {
        match target {
            NavigateTarget::Url(url) => {
                self.check_url(url)?;
                Ok(url.clone())
            }
            NavigateTarget::Query(query) => Ok(self.path_with_query(query)),
        }
    }

    /// Relative targets always pass. Absolute and scheme-relative ones must be
    /// well-formed http(s) URLs on the current request's host.
    ///
    /// The target is classified the way a browser reads it: tabs and line
    /// breaks are removed and `\` counts as `/`, so `/\evil.example` is
    /// scheme-relative.
    pub fn check_url(&self, raw: &str) -> Result<(), PatchwireError> {
        let normalized = browser_form(raw);
        let raw = normalized.as_str();
        if raw.is_empty() {
            return Err(PatchwireError::validation("navigation target is empty"));
        }
        let absolute = if let Some(rest) = raw.strip_prefix("//") {
            Url::parse(&format!("http://{rest}"))
                .map_err(|e| PatchwireError::validation(format!("malformed URL `{raw}`: {e}")))?
        } else if raw.starts_with(&['/', '?', '#'][..]) {
            return Ok(());
        } else {
            match Url::parse(raw) {
                Ok(url) => url,
                Err(url::ParseError::RelativeUrlWithoutBase) => return Ok(()),
                Err(e) => {
                    return Err(PatchwireError::validation(format!("malformed URL `{raw}`: {e}")))
                }
            }
        };

        if !matches!(absolute.scheme(), "http" | "https") {
            return Err(PatchwireError::validation(format!(
                "unsupported navigation scheme `{}`",
                absolute.scheme()
            )));
        }
        let target_host = absolute
            .host_str()
            .ok_or_else(|| PatchwireError::validation(format!("URL `{raw}` has no host")))?;
        let current = hostname(self.request.current_host());
        if !target_host.eq_ignore_ascii_case(current) {
            tracing::warn!(
                "NavigationValidator: rejected cross-origin target {} (current host {})",
                target_host,
                current
            );
            return Err(PatchwireError::validation(format!(
                "navigation to foreign host `{target_host}` is not allowed"
            )));
        }
        Ok(())
    }

    fn path_with_query(&self, query: &Map<String, Value>) -> String {
        let mut encoder = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in query {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items {
                        encoder.append_pair(key, &query_value(item));
                    }
                }
                other => {
                    encoder.append_pair(key, &query_value(other));
                }
            }
        }
        let encoded = encoder.finish();
        let path = self.request.current_path();
        if encoded.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{encoded}")
        }
    }
}

/// Applies the WHATWG pre-processing that matters for host detection.
fn browser_form(raw: &str) -> String {
    raw.trim_matches(|c: char| c <= ' ')
        .chars()
        .filter(|c| !matches!(c, '\t' | '\n' | '\r'))
        .map(|c| if c == '\\' { '/' } else { c })
        .collect()
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Strips a `:port` suffix, leaving bracketed IPv6 literals intact.
fn hostname(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    host.split(':').next().unwrap_or(host)
}
