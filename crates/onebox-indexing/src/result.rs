//! Per-document, per-batch and progress outcome types

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of indexing one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexingResult {
    pub email_id: String,
    pub success: bool,
    pub keyword_attempted: bool,
    pub keyword_success: bool,
    pub vector_attempted: bool,
    pub vector_success: bool,
    /// Content too short for the vector backend
    pub vector_skipped: bool,
    /// In the order they happened
    pub errors: Vec<String>,
    pub rolled_back: bool,
    pub elapsed: Duration,
}

impl IndexingResult {
    pub fn new(email_id: impl Into<String>) -> Self {
        Self {
            email_id: email_id.into(),
            success: false,
            keyword_attempted: false,
            keyword_success: false,
            vector_attempted: false,
            vector_success: false,
            vector_skipped: false,
            errors: Vec::new(),
            rolled_back: false,
            elapsed: Duration::ZERO,
        }
    }

    pub fn keyword_failed(&self) -> bool {
        self.keyword_attempted && !self.keyword_success
    }

    pub fn vector_failed(&self) -> bool {
        self.vector_attempted && !self.vector_success
    }
}

/// Aggregate over a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchIndexingResult {
    pub total_processed: usize,
    pub total_successful: usize,
    pub total_failed: usize,
    pub keyword_successful: usize,
    pub vector_successful: usize,
    pub results: Vec<IndexingResult>,
    /// Per-document errors prefixed with the id, plus run-level errors
    pub errors: Vec<String>,
    pub elapsed: Duration,
}

impl BatchIndexingResult {
    pub fn absorb(&mut self, result: IndexingResult) {
        self.total_processed += 1;
        if result.success {
            self.total_successful += 1;
        } else {
            self.total_failed += 1;
        }
        if result.keyword_success {
            self.keyword_successful += 1;
        }
        if result.vector_success {
            self.vector_successful += 1;
        }
        self.errors
            .extend(result.errors.iter().map(|e| format!("{}: {e}", result.email_id)));
        self.results.push(result);
    }
}

/// Progress of a running batch; reported after every chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexingProgress {
    pub total: usize,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub estimated_remaining: Option<Duration>,
}

impl IndexingProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            processed: 0,
            successful: 0,
            failed: 0,
            started_at: Utc::now(),
            estimated_remaining: None,
        }
    }

    /// Fold in a finished chunk and re-estimate from observed throughput.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_chunk(&mut self, successful: usize, failed: usize, elapsed: Duration) {
        self.successful += successful;
        self.failed += failed;
        self.processed = self.successful + self.failed;

        let remaining = self.total.saturating_sub(self.processed);
        self.estimated_remaining = if remaining == 0 {
            Some(Duration::ZERO)
        } else if self.processed == 0 {
            None
        } else {
            let per_item = elapsed.as_secs_f64() / self.processed as f64;
            Some(Duration::from_secs_f64(per_item * remaining as f64))
        };
    }

    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.processed as f64 * 100.0 / self.total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn absorb_counts_per_backend() {
        let mut batch = BatchIndexingResult::default();

        let mut ok = IndexingResult::new("a");
        ok.success = true;
        ok.keyword_success = true;
        ok.vector_success = true;
        batch.absorb(ok);

        let mut failed = IndexingResult::new("b");
        failed.keyword_success = true;
        failed.errors.push("vector add failed: boom".to_string());
        batch.absorb(failed);

        assert_eq!(batch.total_processed, 2);
        assert_eq!(batch.total_successful, 1);
        assert_eq!(batch.total_failed, 1);
        assert_eq!(batch.keyword_successful, 2);
        assert_eq!(batch.vector_successful, 1);
        assert_eq!(batch.errors, vec!["b: vector add failed: boom".to_string()]);
    }

    #[test]
    fn estimate_uses_throughput() {
        let mut progress = IndexingProgress::new(10);
        progress.record_chunk(2, 0, Duration::from_secs(4));
        assert_eq!(progress.estimated_remaining, Some(Duration::from_secs(16)));

        progress.record_chunk(7, 1, Duration::from_secs(10));
        assert!(progress.is_complete());
        assert_eq!(progress.estimated_remaining, Some(Duration::ZERO));
        assert!((progress.percent() - 100.0).abs() < f64::EPSILON);
    }

    proptest! {
        #[test]
        fn processed_is_sum_and_monotonic(chunks in prop::collection::vec((0usize..20, 0usize..20), 1..20)) {
            let total = chunks.iter().map(|(s, f)| s + f).sum();
            let mut progress = IndexingProgress::new(total);
            let mut last = 0;
            for (i, (s, f)) in chunks.into_iter().enumerate() {
                progress.record_chunk(s, f, Duration::from_millis(10 * (i as u64 + 1)));
                prop_assert_eq!(progress.processed, progress.successful + progress.failed);
                prop_assert!(progress.processed >= last);
                last = progress.processed;
            }
            prop_assert!(progress.is_complete());
        }
    }
}
