//! Error types for htime-assistant

use thiserror::Error;

/// Result type alias using htime-assistant Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the assistant runtime
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the chat endpoint layer
    #[error(transparent)]
    Ai(#[from] htime_ai::Error),

    /// The message store was asked to do something its invariants forbid
    #[error("Stream error: {0}")]
    Stream(String),

    /// The state repository failed to read or write
    #[error("Storage error: {0}")]
    Storage(String),

    /// Input was rejected before anything was stored
    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Storage(e.to_string())
    }
}
