//! Onebox Indexing - dual keyword/semantic indexing for email
//!
//! This crate provides:
//! - `DualIndexCoordinator`: concurrent writes to both backends with retry,
//!   transaction safety and compensation
//! - `CompatibilityAdapter`: dual/keyword-only facade with per-call fallback
//! - Hybrid result fusion (weighted or reciprocal rank)
//! - Per-coordinator stats and Prometheus metrics

pub mod adapter;
pub mod compensation;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod hybrid;
pub mod result;
pub mod retry;
pub mod stats;

pub use adapter::{AdapterMode, AdapterStats, Capabilities, CompatibilityAdapter};
pub use config::IndexingConfig;
pub use coordinator::{BackendHealth, BackfillReport, DualIndexCoordinator, HealthReport, ROLLBACK_MARKER};
pub use error::{IndexingError, Result};
pub use hybrid::{fuse, FusionMethod, HybridConfig, HybridHit};
pub use result::{BatchIndexingResult, IndexingProgress, IndexingResult};
pub use retry::{with_retry, RetryConfig, RetryPolicy};
pub use stats::{IndexingContext, ServiceStats};

/// Prelude for common imports
pub mod prelude {
    pub use crate::adapter::{Capabilities, CompatibilityAdapter};
    pub use crate::config::IndexingConfig;
    pub use crate::coordinator::{DualIndexCoordinator, HealthReport};
    pub use crate::error::{IndexingError, Result};
    pub use crate::hybrid::HybridConfig;
    pub use crate::result::{BatchIndexingResult, IndexingProgress, IndexingResult};
}
