//! Query and report types for the keyword backend

use onebox_core::EmailDocument;
use serde::{Deserialize, Serialize};

/// Keyword query with optional exact-match filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordQuery {
    /// Free text; empty matches every document
    pub text: String,
    /// Restrict to one mail account
    pub account_id: Option<String>,
    /// Restrict to one folder
    pub folder: Option<String>,
    /// Restrict to one classifier category
    pub category: Option<String>,
    /// Pagination offset
    pub from: usize,
    /// Page size
    pub size: usize,
}

impl KeywordQuery {
    /// Create a text query returning 10 hits
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            size: 10,
            ..Self::default()
        }
    }

    /// Query that matches everything; used for health probes
    pub fn match_all() -> Self {
        Self::new("")
    }

    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_from(mut self, from: usize) -> Self {
        self.from = from;
        self
    }

    /// Whether a document passes the exact-match filters
    pub fn filters_match(&self, doc: &EmailDocument) -> bool {
        if self.account_id.as_deref().is_some_and(|a| a != doc.account_id) {
            return false;
        }
        if self.folder.as_deref().is_some_and(|f| f != doc.folder) {
            return false;
        }
        if let Some(category) = self.category.as_deref() {
            if doc.category() != Some(category) {
                return false;
            }
        }
        true
    }
}

/// Scored keyword hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordHit {
    pub document: EmailDocument,
    /// Engine relevance score; higher is better
    pub score: f32,
}

/// Keyword search response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordSearchResponse {
    /// Total matching documents, not just this page
    pub total: u64,
    pub hits: Vec<KeywordHit>,
}

impl KeywordSearchResponse {
    pub fn documents(&self) -> impl Iterator<Item = &EmailDocument> {
        self.hits.iter().map(|h| &h.document)
    }
}

/// Outcome of a bulk delete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkDeleteReport {
    pub success_count: usize,
    pub fail_count: usize,
    /// Failed ids with the backend's reason
    pub per_id_errors: Vec<(String, String)>,
}

impl BulkDeleteReport {
    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub fn record_failure(&mut self, id: impl Into<String>, error: impl Into<String>) {
        self.fail_count += 1;
        self.per_id_errors.push((id.into(), error.into()));
    }

    pub fn is_all_success(&self) -> bool {
        self.fail_count == 0
    }
}

/// Outcome of restoring a backup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreReport {
    pub restored: usize,
    pub failed: Vec<(String, String)>,
}
