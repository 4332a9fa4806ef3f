//! Error types for htime-ai

use thiserror::Error;

/// Result type alias using htime-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the chat endpoint
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Endpoint answered with a non-success status
    #[error("API error: {message} (status: {status})")]
    Api { status: u16, message: String },

    /// Endpoint answered without a response body
    #[error("Response body missing")]
    MissingBody,

    /// Event stream could not be read
    #[error("SSE error: {0}")]
    Sse(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create an API error from a status code and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Whether the failure happened on the way to or from the endpoint.
    ///
    /// Transport failures are recovered by the chat widget with an apology
    /// message; configuration errors indicate a programming mistake.
    pub fn is_transport(&self) -> bool {
        match self {
            Error::Http(_) | Error::Api { .. } | Error::MissingBody | Error::Sse(_) => true,
            Error::Json(_) | Error::InvalidConfig(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_variants() {
        assert!(Error::MissingBody.is_transport());
        assert!(Error::Sse("connection reset".into()).is_transport());
        assert!(Error::api(502, "bad gateway").is_transport());
    }

    #[test]
    fn test_not_transport() {
        assert!(!Error::InvalidConfig("empty endpoint".into()).is_transport());
        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!Error::from(json).is_transport());
    }

    #[test]
    fn test_api_display() {
        let e = Error::api(429, "slow down");
        assert_eq!(e.to_string(), "API error: slow down (status: 429)");
    }
}
