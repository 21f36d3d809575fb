//! Onebox Keyword - lexical search backend for email documents
//!
//! This crate provides:
//! - `KeywordStore` trait: index, get, delete, bulk delete, search, backup and restore
//! - `ElasticsearchStore` speaking the Elasticsearch REST API
//! - `InMemoryKeywordStore` for tests

pub mod elasticsearch;
pub mod error;
pub mod store;
pub mod types;

pub use elasticsearch::{ElasticsearchConfig, ElasticsearchStore};
pub use error::{KeywordError, KeywordResult};
pub use store::{InMemoryKeywordStore, KeywordStore};
pub use types::{BulkDeleteReport, KeywordHit, KeywordQuery, KeywordSearchResponse, RestoreReport};

/// Prelude for common imports
pub mod prelude {
    pub use crate::error::{KeywordError, KeywordResult};
    pub use crate::store::KeywordStore;
    pub use crate::types::{BulkDeleteReport, KeywordHit, KeywordQuery, KeywordSearchResponse, RestoreReport};
}
