//! Core types exchanged with the vector service

use serde::{Deserialize, Serialize};

/// Text to embed, keyed by email id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorEntry {
    /// Email identifier shared with the keyword index
    pub email_id: String,
    /// Subject and body text
    pub content: String,
}

impl VectorEntry {
    /// Create a new entry
    pub fn new(email_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            email_id: email_id.into(),
            content: content.into(),
        }
    }
}

/// Semantic search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    /// Matched email
    pub email_id: String,
    /// Indexed content
    #[serde(default)]
    pub content: String,
    /// Embedding distance; lower is closer
    #[serde(rename = "score")]
    pub distance: f32,
    /// Extra metadata stored alongside the vector
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl VectorHit {
    /// Create a hit with empty metadata
    pub fn new(email_id: impl Into<String>, content: impl Into<String>, distance: f32) -> Self {
        Self {
            email_id: email_id.into(),
            content: content.into(),
            distance,
            metadata: serde_json::Value::Null,
        }
    }

    /// Similarity derived from distance, clamped at zero
    pub fn similarity(&self) -> f32 {
        (1.0 - self.distance).max(0.0)
    }
}

/// Per-id outcome of a batch add or delete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Successfully processed ids
    pub succeeded: Vec<String>,
    /// Failed ids with errors
    pub failed: Vec<(String, String)>,
}

impl BatchOutcome {
    /// Create an empty outcome
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a success
    pub fn add_success(&mut self, id: impl Into<String>) {
        self.succeeded.push(id.into());
    }

    /// Add a failure
    pub fn add_failure(&mut self, id: impl Into<String>, error: impl Into<String>) {
        self.failed.push((id.into(), error.into()));
    }

    /// Check if all operations succeeded
    pub fn is_all_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total count of operations
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}
