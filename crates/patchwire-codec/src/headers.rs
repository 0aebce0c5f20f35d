/// Comment written ahead of the first block of every payload.
pub const KEEPALIVE: &str = ": keepalive\n\n";

pub const CONTENT_TYPE: &str = "text/event-stream";

/// Response header telling the client the body speaks this protocol.
pub const PROTOCOL_MARKER: &str = "X-Patchwire";

/// Fixed response header block for event-stream responses.
///
/// The base headers never change between responses; only the
/// `Connection` header depends on the negotiated HTTP version.
pub struct HeaderTemplate {
    base: &'static [(&'static str, &'static str)],
}

const EVENT_STREAM_BASE: &[(&str, &str)] = &[
    ("Content-Type", CONTENT_TYPE),
    ("Cache-Control", "no-cache"),
    ("X-Accel-Buffering", "no"),
    (PROTOCOL_MARKER, "1"),
];

impl HeaderTemplate {
    pub fn event_stream() -> Self {
        Self {
            base: EVENT_STREAM_BASE,
        }
    }

    pub fn render(&self, http11: bool) -> Vec<(String, String)> {
        let mut headers: Vec<(String, String)> = self
            .base
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        // HTTP/2 forbids connection-specific headers.
        if http11 {
            headers.push(("Connection".to_string(), "keep-alive".to_string()));
        }
        headers
    }
}
