use thiserror::Error;

/// Every failure the engine can surface to a handler.
#[derive(Debug, Error)]
pub enum PatchwireError {
    /// Logic violation by the calling handler (double navigation, empty event name, ...).
    #[error("usage error: {0}")]
    Usage(String),
    /// Malformed or cross-origin navigation target.
    #[error("validation error: {0}")]
    Validation(String),
    /// Missing template or fragment, or no renderer installed.
    #[error("render error: {0}")]
    Render(String),
    /// The peer went away or the stream channel is closed.
    #[error("transport error: {0}")]
    Transport(String),
    /// Deliberate early exit after a terminal event was written.
    #[error("stream terminated")]
    Terminated,
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
}

impl PatchwireError {
    pub fn usage(msg: impl Into<String>) -> Self {
        PatchwireError::Usage(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        PatchwireError::Validation(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        PatchwireError::Render(msg.into())
    }

    /// Short machine name of the variant, used by the inline error page.
    pub fn kind(&self) -> &'static str {
        match self {
            PatchwireError::Usage(_) => "UsageError",
            PatchwireError::Validation(_) => "ValidationError",
            PatchwireError::Render(_) => "RenderError",
            PatchwireError::Transport(_) => "TransportError",
            PatchwireError::Terminated => "Terminated",
            PatchwireError::Serialize(_) => "SerializeError",
            PatchwireError::Config(_) => "ConfigError",
        }
    }

    pub fn is_termination(&self) -> bool {
        matches!(self, PatchwireError::Terminated)
    }
}

impl From<std::io::Error> for PatchwireError {
    fn from(e: std::io::Error) -> Self {
        PatchwireError::Transport(e.to_string())
    }
}

impl From<toml::de::Error> for PatchwireError {
    fn from(e: toml::de::Error) -> Self {
        PatchwireError::Config(e.to_string())
    }
}

pub type Result<T, E = PatchwireError> = core::result::Result<T, E>;
