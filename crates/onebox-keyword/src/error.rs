//! Error types for the keyword backend

use thiserror::Error;

/// Keyword backend error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeywordError {
    #[error("Invalid keyword backend endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Keyword backend returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Failed to decode keyword backend response: {0}")]
    Decode(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Keyword backend unavailable")]
    Unavailable,
}

impl From<serde_json::Error> for KeywordError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for keyword operations
pub type KeywordResult<T> = Result<T, KeywordError>;
