//! Remote store error types.

use thiserror::Error;

/// Failure to establish the remote connection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InitError {
    #[error("Remote not configured: {0}")]
    NotConfigured(String),

    #[error("Failed to connect to remote store: {0}")]
    Connection(String),
}

/// Failure to enable offline persistence. Never fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistenceError {
    /// Another running instance already holds persistence.
    #[error("Persistence held by another instance")]
    FailedPrecondition,

    /// The platform does not support offline persistence.
    #[error("Persistence not supported on this platform")]
    Unimplemented,

    #[error("Persistence error: {0}")]
    Other(String),
}

/// Failure of a single remote operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    #[error("Remote store not connected")]
    NotConnected,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Remote returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Failed to decode remote response: {0}")]
    Decode(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Remote store unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RemoteError::Decode(e.to_string())
        } else {
            RemoteError::Http(e.to_string())
        }
    }
}
