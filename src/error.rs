//! Error types for the session layer.
//!
//! Nothing here crosses the public session contract: transport failures are
//! surfaced through the `on_failure` callback and invalid registrations
//! through `None`/`false` returns. `SessionError` covers the message decode
//! paths, where the dispatcher treats errors as silently-dropped messages.

use thiserror::Error;

/// Main error type for session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Empty recordIds in change event header")]
    EmptyRecordIds,

    #[error("Unknown change type: {0}")]
    UnknownChangeType(String),

    #[error("Invalid channel name: {0:?}")]
    InvalidChannel(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        SessionError::Deserialization(e.to_string())
    }
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
