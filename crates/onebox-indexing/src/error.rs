//! Error types for the indexing layer
//!
//! Backend failures during writes never surface here; they are encoded in
//! [`crate::IndexingResult`]. These errors cover caller mistakes,
//! configuration problems and read paths.

use onebox_core::DocumentError;
use onebox_keyword::KeywordError;
use onebox_vector::VectorError;
use thiserror::Error;

/// Indexing error type
#[derive(Error, Debug)]
pub enum IndexingError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("Keyword backend error: {0}")]
    Keyword(#[from] KeywordError),

    #[error("Vector backend error: {0}")]
    Vector(#[from] VectorError),

    #[error("Metrics error: {0}")]
    Metrics(String),
}

impl From<DocumentError> for IndexingError {
    fn from(err: DocumentError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<prometheus::Error> for IndexingError {
    fn from(err: prometheus::Error) -> Self {
        Self::Metrics(err.to_string())
    }
}

/// Result type for indexing operations
pub type Result<T, E = IndexingError> = std::result::Result<T, E>;
