use thiserror::Error;

/// Invalid or unparseable server configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidVar { var: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Inbound frame that could not be turned into an input event.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame too large ({0} bytes)")]
    TooLarge(usize),

    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
}

/// Per-session transport failure. Always recovered by dropping the session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session closed")]
    Closed,

    #[error("write timed out")]
    WriteTimeout,

    #[error("transport error: {0}")]
    Transport(#[from] axum::Error),

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}
