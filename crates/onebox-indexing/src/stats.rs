//! Lifetime statistics and Prometheus metrics
//!
//! Every coordinator owns an [`IndexingContext`]. Nothing is registered
//! globally, so two coordinators in one process never share counters.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{IndexingError, Result};
use crate::result::IndexingResult;

/// Cumulative counters since the context was created
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    pub total_indexed: u64,
    pub total_errors: u64,
    pub keyword_errors: u64,
    pub vector_errors: u64,
    pub rollbacks: u64,
    pub last_indexed_at: Option<DateTime<Utc>>,
}

struct IndexingMetrics {
    registry: Registry,
    indexed: IntCounter,
    failed: IntCounter,
    backend_errors: IntCounterVec,
    rollbacks: IntCounter,
    duration: Histogram,
}

impl IndexingMetrics {
    fn new(context_id: Uuid) -> Result<Self> {
        let registry = Registry::new_custom(
            Some("onebox".to_string()),
            Some(std::iter::once(("context".to_string(), context_id.to_string())).collect()),
        )?;

        let indexed = IntCounter::new("emails_indexed_total", "Emails indexed successfully")?;
        let failed = IntCounter::new("emails_failed_total", "Emails whose indexing failed")?;
        let backend_errors = IntCounterVec::new(
            Opts::new("backend_errors_total", "Failed backend writes after retries"),
            &["backend"],
        )?;
        let rollbacks = IntCounter::new("rollbacks_total", "Compensation events")?;
        let duration = Histogram::with_opts(
            HistogramOpts::new("index_duration_seconds", "Time to index one email")
                .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;

        registry.register(Box::new(indexed.clone()))?;
        registry.register(Box::new(failed.clone()))?;
        registry.register(Box::new(backend_errors.clone()))?;
        registry.register(Box::new(rollbacks.clone()))?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            registry,
            indexed,
            failed,
            backend_errors,
            rollbacks,
            duration,
        })
    }
}

/// Stats and metrics owned by one coordinator (or one adapter)
pub struct IndexingContext {
    id: Uuid,
    stats: Mutex<ServiceStats>,
    metrics: IndexingMetrics,
}

impl std::fmt::Debug for IndexingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexingContext")
            .field("id", &self.id)
            .field("stats", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl IndexingContext {
    pub fn new() -> Result<Self> {
        let id = Uuid::new_v4();
        Ok(Self {
            id,
            stats: Mutex::new(ServiceStats::default()),
            metrics: IndexingMetrics::new(id)?,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn snapshot(&self) -> ServiceStats {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Fold one finished document into the counters
    pub fn record(&self, result: &IndexingResult) {
        {
            let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
            if result.success {
                stats.total_indexed += 1;
                stats.last_indexed_at = Some(Utc::now());
            } else {
                stats.total_errors += 1;
            }
            if result.keyword_failed() {
                stats.keyword_errors += 1;
            }
            if result.vector_failed() {
                stats.vector_errors += 1;
            }
            if result.rolled_back {
                stats.rollbacks += 1;
            }
        }

        if result.success {
            self.metrics.indexed.inc();
        } else {
            self.metrics.failed.inc();
        }
        if result.keyword_failed() {
            self.metrics.backend_errors.with_label_values(&["keyword"]).inc();
        }
        if result.vector_failed() {
            self.metrics.backend_errors.with_label_values(&["vector"]).inc();
        }
        if result.rolled_back {
            self.metrics.rollbacks.inc();
        }
        self.metrics.duration.observe(result.elapsed.as_secs_f64());
    }

    /// Prometheus text exposition of this context's metrics
    pub fn render_metrics(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.metrics.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| IndexingError::Metrics(e.to_string()))
    }
}
