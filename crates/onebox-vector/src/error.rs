//! Error types for the vector service client

use thiserror::Error;

/// Vector service error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VectorError {
    #[error("Invalid vector service endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Vector service returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Vector service rejected request: {0}")]
    Rejected(String),

    #[error("Failed to decode vector service response: {0}")]
    Decode(String),

    #[error("Vector service unavailable")]
    Unavailable,
}

impl VectorError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout { .. } | Self::Unavailable | Self::Rejected(_) => true,
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            Self::InvalidEndpoint(_) | Self::InvalidRequest(_) | Self::Decode(_) => false,
        }
    }
}

/// Result type for vector operations
pub type VectorResult<T> = Result<T, VectorError>;
