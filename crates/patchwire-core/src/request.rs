use crate::config::EngineConfig;

/// Read-only view of the request a response is being built for.
///
/// Hosts adapt their own request type to this trait; [`RequestContext`] is a
/// plain implementation for hosts that already hold the parts.
pub trait RequestInfo: Send + Sync {
    /// True when the client sent the protocol marker header.
    fn is_protocol_request(&self) -> bool;

    /// Path of the current request, without query string.
    fn current_path(&self) -> &str;

    /// Host of the current request, possibly with a `:port` suffix.
    fn current_host(&self) -> &str;

    /// True for a client-side navigation request. With `Some(key)` only a
    /// navigation issued under that key matches.
    fn is_navigation_request(&self, key: Option<&str>) -> bool;

    /// HTTP/1.1 connections get an explicit `Connection: keep-alive`.
    fn is_http11(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    Http10,
    Http11,
    Http2,
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    path: String,
    host: String,
    version: HttpVersion,
    /// Lower-cased header names.
    headers: Vec<(String, String)>,
    protocol_header: String,
    navigate_header: String,
}

impl RequestContext {
    pub fn new(path: &str, host: &str) -> Self {
        Self::for_config(&EngineConfig::default(), path, host)
    }

    /// Uses the header names configured on `config`.
    pub fn for_config(config: &EngineConfig, path: &str, host: &str) -> Self {
        Self {
            path: path.to_string(),
            host: host.to_string(),
            version: HttpVersion::Http11,
            headers: Vec::new(),
            protocol_header: config.protocol_header.to_ascii_lowercase(),
            navigate_header: config.navigate_header.to_ascii_lowercase(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    /// Marks the request as coming from the reactive client.
    pub fn with_protocol(self) -> Self {
        let name = self.protocol_header.clone();
        self.with_header(&name, "1")
    }

    pub fn with_navigation(self, key: &str) -> Self {
        let name = self.navigate_header.clone();
        self.with_header(&name, key)
    }

    pub fn with_version(mut self, version: HttpVersion) -> Self {
        self.version = version;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl RequestInfo for RequestContext {
    fn is_protocol_request(&self) -> bool {
        self.header(&self.protocol_header).is_some()
    }

    fn current_path(&self) -> &str {
        &self.path
    }

    fn current_host(&self) -> &str {
        &self.host
    }

    fn is_navigation_request(&self, key: Option<&str>) -> bool {
        match (self.header(&self.navigate_header), key) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(sent), Some(key)) => sent == key,
        }
    }

    fn is_http11(&self) -> bool {
        self.version == HttpVersion::Http11
    }
}
