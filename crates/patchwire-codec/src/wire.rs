//! Decoder for the event-stream wire format.
//!
//! Mirrors what a client sees: comments are counted but otherwise ignored,
//! fields accumulate until a blank line dispatches the block. A trailing
//! block that never received its blank line is dropped, as a browser would.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireEvent {
    pub id: Option<String>,
    pub retry: Option<u64>,
    pub event: String,
    pub data: Vec<String>,
}

impl WireEvent {
    /// Payloads of every data line starting with `key` followed by a space.
    pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.data.iter().filter_map(move |line| {
            line.strip_prefix(key)
                .and_then(|rest| rest.strip_prefix(' '))
        })
    }

    pub fn value<'a>(&'a self, key: &'a str) -> Option<&'a str> {
        self.values(key).next()
    }

    /// The `elements` lines joined back into markup.
    pub fn markup(&self) -> String {
        self.values("elements").collect::<Vec<_>>().join("\n")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireStream {
    pub comments: Vec<String>,
    pub events: Vec<WireEvent>,
}

pub fn parse_events(raw: &str) -> WireStream {
    let mut out = WireStream::default();
    let mut current = WireEvent::default();
    let mut dirty = false;

    for line in raw.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            if dirty {
                if current.event.is_empty() {
                    current.event = "message".to_string();
                }
                out.events.push(std::mem::take(&mut current));
                dirty = false;
            }
            continue;
        }
        if let Some(comment) = line.strip_prefix(':') {
            out.comments.push(comment.trim_start().to_string());
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        match field {
            "id" => current.id = Some(value.to_string()),
            "retry" => match value.parse() {
                Ok(ms) => current.retry = Some(ms),
                Err(_) => continue,
            },
            "event" => current.event = value.to_string(),
            "data" => current.data.push(value.to_string()),
            _ => continue,
        }
        dirty = true;
    }
    out
}
