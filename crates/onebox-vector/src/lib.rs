//! Onebox Vector - client for the semantic email indexing service
//!
//! This crate provides:
//! - `VectorStoreClient` trait naming the five calls the service exposes
//! - `HttpVectorClient`, the JSON-over-HTTP implementation with per-call timeouts
//! - `InMemoryVectorClient`, a network-free stand-in for tests

pub mod error;
pub mod http;
pub mod store;
pub mod types;

pub use error::{VectorError, VectorResult};
pub use http::{HttpVectorClient, VectorTimeouts};
pub use store::{InMemoryVectorClient, VectorStoreClient};
pub use types::{BatchOutcome, VectorEntry, VectorHit};

/// Prelude for common imports
pub mod prelude {
    pub use crate::error::{VectorError, VectorResult};
    pub use crate::store::VectorStoreClient;
    pub use crate::types::{BatchOutcome, VectorEntry, VectorHit};
}
