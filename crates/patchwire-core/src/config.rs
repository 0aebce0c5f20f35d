use serde::Deserialize;
use std::path::Path;

use crate::error::PatchwireError;

/// Engine-wide settings shared by every response an engine hands out.
///
/// Loaded once per worker, usually from a flat TOML file:
///
/// ```toml
/// always_array_keys = ["errors", "selected"]
/// default_retry_ms = 2000
/// ```
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Request header whose presence marks a protocol request.
    pub protocol_header: String,
    /// Request header carrying the navigation key of a client-side navigation.
    pub navigate_header: String,
    /// Name of the custom event the navigation script dispatches.
    pub navigate_event: String,
    /// State keys that `forget` resets to `[]` instead of deleting.
    pub always_array_keys: Vec<String>,
    /// Emit the leading `: keepalive` comment.
    pub keepalive: bool,
    /// Retry hint applied to every block unless the handler overrides it.
    pub default_retry_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            protocol_header: "x-patchwire".to_string(),
            navigate_header: "x-patchwire-navigate".to_string(),
            navigate_event: "patchwire:navigate".to_string(),
            always_array_keys: vec!["errors".to_string()],
            keepalive: true,
            default_retry_ms: None,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, PatchwireError> {
        let config: Self = toml::from_str(raw)?;
        if config.protocol_header.trim().is_empty() {
            return Err(PatchwireError::Config("protocol_header must not be empty".into()));
        }
        Ok(config)
    }

    /// Reads and parses a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PatchwireError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        tracing::debug!("EngineConfig: loaded {}", path.display());
        Self::from_toml_str(&raw)
    }

    pub fn is_always_array(&self, key: &str) -> bool {
        self.always_array_keys.iter().any(|k| k == key)
    }
}
