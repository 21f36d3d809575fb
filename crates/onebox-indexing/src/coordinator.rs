//! Dual-index coordinator
//!
//! Writes each email to the keyword backend and the vector service
//! concurrently, retries each write independently, and applies the
//! transaction-safety policy. Backend failures never escape as errors:
//! every outcome is encoded in the returned [`IndexingResult`].

use std::any::Any;
use std::borrow::Cow;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use onebox_classifier::Classifier;
use onebox_core::EmailDocument;
use onebox_keyword::{KeywordQuery, KeywordSearchResponse, KeywordStore};
use onebox_vector::{VectorEntry, VectorHit, VectorStoreClient};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::compensation::{compensate_batch, compensate_one, CompensationPlan};
use crate::config::IndexingConfig;
use crate::error::{IndexingError, Result};
use crate::hybrid::{fuse, HybridConfig, HybridHit};
use crate::result::{BatchIndexingResult, IndexingProgress, IndexingResult};
use crate::retry::{with_retry, RetryConfig};
use crate::stats::{IndexingContext, ServiceStats};

/// Appended to a result's errors when its partial write was compensated
pub const ROLLBACK_MARKER: &str = "transaction rolled back";

/// Health of one backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum BackendHealth {
    Healthy,
    Unhealthy { error: String },
    Disabled,
}

impl BackendHealth {
    /// Disabled backends do not count against overall health
    pub fn is_ok(&self) -> bool {
        !matches!(self, Self::Unhealthy { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub keyword: BackendHealth,
    pub vector: BackendHealth,
    pub overall: bool,
}

impl HealthReport {
    pub fn new(keyword: BackendHealth, vector: BackendHealth) -> Self {
        let overall = keyword.is_ok() && vector.is_ok();
        Self {
            keyword,
            vector,
            overall,
        }
    }
}

/// Outcome of pushing existing documents into the vector service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub added: usize,
    pub skipped: usize,
    pub failed: Vec<(String, String)>,
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

pub(crate) async fn probe_keyword(keyword: &dyn KeywordStore) -> BackendHealth {
    match keyword.search(&KeywordQuery::match_all().with_size(1)).await {
        Ok(_) => BackendHealth::Healthy,
        Err(e) => BackendHealth::Unhealthy { error: e.to_string() },
    }
}

async fn probe_vector(vector: &dyn VectorStoreClient) -> BackendHealth {
    match vector.search("health", 1).await {
        Ok(_) => BackendHealth::Healthy,
        Err(e) => BackendHealth::Unhealthy { error: e.to_string() },
    }
}

pub struct DualIndexCoordinator {
    keyword: Arc<dyn KeywordStore>,
    vector: Arc<dyn VectorStoreClient>,
    classifier: Option<Arc<dyn Classifier>>,
    config: IndexingConfig,
    retry: RetryConfig,
    context: Arc<IndexingContext>,
}

impl std::fmt::Debug for DualIndexCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualIndexCoordinator")
            .field("keyword", &self.keyword.backend_name())
            .field("vector", &self.vector.backend_name())
            .field("classifier", &self.classifier.as_ref().map(|c| c.name()))
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DualIndexCoordinator {
    /// Create a coordinator with a fresh stats context
    pub fn new(
        keyword: Arc<dyn KeywordStore>,
        vector: Arc<dyn VectorStoreClient>,
        config: IndexingConfig,
    ) -> Result<Self> {
        Self::with_context(keyword, vector, config, Arc::new(IndexingContext::new()?))
    }

    pub fn with_context(
        keyword: Arc<dyn KeywordStore>,
        vector: Arc<dyn VectorStoreClient>,
        config: IndexingConfig,
        context: Arc<IndexingContext>,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            keyword = keyword.backend_name(),
            vector = vector.backend_name(),
            enable_keyword = config.enable_keyword,
            enable_vector = config.enable_vector,
            transaction_safety = config.transaction_safety,
            batch_size = config.batch_size,
            "Dual index coordinator created"
        );
        Ok(Self {
            keyword,
            vector,
            classifier: None,
            retry: config.retry_config(),
            config,
            context,
        })
    }

    /// Classify documents that arrive without a category
    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn config(&self) -> &IndexingConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<IndexingContext> {
        &self.context
    }

    pub fn keyword_store(&self) -> &Arc<dyn KeywordStore> {
        &self.keyword
    }

    pub fn vector_store(&self) -> &Arc<dyn VectorStoreClient> {
        &self.vector
    }

    pub fn stats(&self) -> ServiceStats {
        self.context.snapshot()
    }

    pub fn render_metrics(&self) -> Result<String> {
        self.context.render_metrics()
    }

    /// Index one email into both backends
    pub async fn index_email(&self, document: &EmailDocument) -> IndexingResult {
        let started = Instant::now();
        let (mut result, plan) = self.write_document(document).await;

        if let Some(plan) = plan {
            let mut failures = compensate_one(self.keyword.as_ref(), self.vector.as_ref(), &plan).await;
            result.errors.extend(failures.take(&plan.email_id));
        }

        result.elapsed = started.elapsed();
        self.context.record(&result);
        result
    }

    pub async fn index_emails(&self, documents: &[EmailDocument]) -> BatchIndexingResult {
        self.index_emails_with_progress(documents, |_| {}).await
    }

    /// Index in chunks of `batch_size`, reporting progress after each chunk.
    ///
    /// A panic mid-run keeps the results gathered so far and adds one error.
    pub async fn index_emails_with_progress<F>(&self, documents: &[EmailDocument], on_progress: F) -> BatchIndexingResult
    where
        F: Fn(&IndexingProgress),
    {
        let started = Instant::now();
        let mut batch = BatchIndexingResult::default();
        let mut progress = IndexingProgress::new(documents.len());
        let mut in_flight = Vec::new();

        info!(
            total = documents.len(),
            batch_size = self.config.batch_size,
            "Batch indexing started"
        );

        let run = AssertUnwindSafe(self.run_chunks(
            documents,
            started,
            &mut batch,
            &mut progress,
            &mut in_flight,
            &on_progress,
        ))
            .catch_unwind()
            .await;
        if let Err(panic) = run {
            let message = panic_message(panic.as_ref());
            // Writes for these ids may have landed without compensation
            let in_flight = in_flight.join(", ");
            error!(
                processed = batch.total_processed,
                total = documents.len(),
                panic = %message,
                in_flight = %in_flight,
                "Batch indexing interrupted"
            );
            batch
                .errors
                .push(format!("batch interrupted: {message} (in flight: {in_flight})"));
        }

        batch.elapsed = started.elapsed();
        info!(
            processed = batch.total_processed,
            successful = batch.total_successful,
            failed = batch.total_failed,
            elapsed_ms = batch.elapsed.as_millis(),
            "Batch indexing finished"
        );
        batch
    }

    async fn run_chunks<F>(
        &self,
        documents: &[EmailDocument],
        started: Instant,
        batch: &mut BatchIndexingResult,
        progress: &mut IndexingProgress,
        in_flight: &mut Vec<String>,
        on_progress: &F,
    ) where
        F: Fn(&IndexingProgress),
    {
        for (index, chunk) in documents.chunks(self.config.batch_size).enumerate() {
            if index > 0 && !self.config.chunk_pause.is_zero() {
                tokio::time::sleep(self.config.chunk_pause).await;
            }

            let chunk_started = Instant::now();
            in_flight.clear();
            in_flight.extend(chunk.iter().map(|doc| doc.id.clone()));
            let outcomes = join_all(chunk.iter().map(|doc| self.write_document(doc))).await;
            let (mut results, plans): (Vec<IndexingResult>, Vec<Option<CompensationPlan>>) =
                outcomes.into_iter().unzip();
            let plans: Vec<CompensationPlan> = plans.into_iter().flatten().collect();

            if !plans.is_empty() {
                let mut failures = compensate_batch(self.keyword.as_ref(), self.vector.as_ref(), &plans).await;
                for result in &mut results {
                    result.errors.extend(failures.take(&result.email_id));
                }
            }

            let chunk_elapsed = chunk_started.elapsed();
            let mut successful = 0;
            for mut result in results {
                if result.elapsed.is_zero() {
                    result.elapsed = chunk_elapsed;
                }
                self.context.record(&result);
                if result.success {
                    successful += 1;
                }
                batch.absorb(result);
            }
            in_flight.clear();

            progress.record_chunk(successful, chunk.len() - successful, started.elapsed());
            debug!(
                chunk = index,
                processed = progress.processed,
                total = progress.total,
                "Chunk indexed"
            );
            on_progress(progress);
        }
    }

    /// The write path shared by single and batch indexing. Returns the
    /// result and, when transaction safety demands it, what to roll back.
    async fn write_document(&self, document: &EmailDocument) -> (IndexingResult, Option<CompensationPlan>) {
        let started = Instant::now();
        let mut result = IndexingResult::new(&document.id);

        if let Err(e) = document.validate() {
            result.errors.push(format!("invalid input: {e}"));
            return (result, None);
        }

        let document = self.enrich(document).await;
        let content = document.vector_content();

        result.keyword_attempted = self.config.enable_keyword;
        if self.config.enable_vector {
            if content.chars().count() < self.config.min_vector_content_len {
                result.vector_skipped = true;
                debug!(
                    email_id = %document.id,
                    content_len = content.len(),
                    "Content too short, skipping vector write"
                );
            } else {
                result.vector_attempted = true;
            }
        }

        let keyword = self.keyword.as_ref();
        let vector = self.vector.as_ref();
        let doc: &EmailDocument = &document;
        let email_id = doc.id.as_str();
        let content = content.as_str();
        let (keyword_attempted, vector_attempted) = (result.keyword_attempted, result.vector_attempted);

        let keyword_write = async {
            if keyword_attempted {
                Some(with_retry("keyword index", move || keyword.index(doc), &self.retry).await)
            } else {
                None
            }
        };
        let vector_write = async {
            if vector_attempted {
                Some(
                    with_retry(
                        "vector add",
                        move || vector.add(VectorEntry::new(email_id, content)),
                        &self.retry,
                    )
                    .await,
                )
            } else {
                None
            }
        };
        let (keyword_outcome, vector_outcome) = tokio::join!(keyword_write, vector_write);

        if let Some(outcome) = keyword_outcome {
            match outcome {
                Ok(()) => result.keyword_success = true,
                Err(e) => {
                    warn!(email_id, error = %e, "Keyword write failed");
                    result.errors.push(format!("keyword index failed: {e}"));
                }
            }
        }
        if let Some(outcome) = vector_outcome {
            match outcome {
                Ok(()) => result.vector_success = true,
                Err(e) => {
                    warn!(email_id, error = %e, "Vector write failed");
                    result.errors.push(format!("vector add failed: {e}"));
                }
            }
        }

        let attempted = [
            (result.keyword_attempted, result.keyword_success),
            (result.vector_attempted, result.vector_success),
        ];
        let mut outcomes = attempted.iter().filter(|(tried, _)| *tried).map(|(_, ok)| *ok).peekable();
        if outcomes.peek().is_none() {
            result.errors.push("no backend write attempted".to_string());
            result.elapsed = started.elapsed();
            return (result, None);
        }

        let any_succeeded = result.keyword_success || result.vector_success;
        result.success = if self.config.transaction_safety {
            outcomes.all(|ok| ok)
        } else {
            any_succeeded
        };

        let plan = if self.config.transaction_safety && !result.success && any_succeeded {
            result.rolled_back = true;
            result.errors.push(ROLLBACK_MARKER.to_string());
            warn!(
                email_id,
                keyword = result.keyword_success,
                vector = result.vector_success,
                "Partial write, rolling back"
            );
            Some(CompensationPlan {
                email_id: email_id.to_string(),
                keyword: result.keyword_success,
                vector: result.vector_success,
            })
        } else {
            None
        };

        if result.success {
            debug!(
                email_id,
                keyword = result.keyword_success,
                vector = result.vector_success,
                "Email indexed"
            );
        }
        result.elapsed = started.elapsed();
        (result, plan)
    }

    async fn enrich<'d>(&self, document: &'d EmailDocument) -> Cow<'d, EmailDocument> {
        let Some(classifier) = &self.classifier else {
            return Cow::Borrowed(document);
        };
        if document.classification.is_some() {
            return Cow::Borrowed(document);
        }

        match classifier.classify(&document.vector_content()).await {
            Ok(classification) => {
                debug!(email_id = %document.id, category = %classification.category, "Email classified");
                let mut enriched = document.clone();
                enriched.classification = Some(classification);
                Cow::Owned(enriched)
            }
            Err(e) => {
                warn!(email_id = %document.id, classifier = classifier.name(), error = %e, "Classification unavailable");
                Cow::Borrowed(document)
            }
        }
    }

    /// Probe every enabled backend concurrently
    pub async fn health_check(&self) -> HealthReport {
        let keyword_probe = async {
            if self.config.enable_keyword {
                probe_keyword(self.keyword.as_ref()).await
            } else {
                BackendHealth::Disabled
            }
        };
        let vector_probe = async {
            if self.config.enable_vector {
                probe_vector(self.vector.as_ref()).await
            } else {
                BackendHealth::Disabled
            }
        };
        let (keyword, vector) = tokio::join!(keyword_probe, vector_probe);

        let report = HealthReport::new(keyword, vector);
        if !report.overall {
            warn!(keyword = ?report.keyword, vector = ?report.vector, "Backend health check failed");
        }
        report
    }

    pub async fn search(&self, query: &KeywordQuery) -> Result<KeywordSearchResponse> {
        Ok(self.keyword.search(query).await?)
    }

    pub async fn semantic_search(&self, query: &str, n_results: usize) -> Result<Vec<VectorHit>> {
        if !self.config.enable_vector {
            return Err(IndexingError::CapabilityUnavailable(
                "semantic search needs the vector backend".to_string(),
            ));
        }
        Ok(self.vector.search(query, n_results).await?)
    }

    /// Query both backends and fuse the results. A failing side contributes
    /// nothing; both failing returns the keyword error.
    pub async fn hybrid_search(&self, query: &KeywordQuery, config: &HybridConfig) -> Result<Vec<HybridHit>> {
        config.validate()?;
        if !(self.config.enable_vector && self.config.enable_keyword) {
            return Err(IndexingError::CapabilityUnavailable(
                "hybrid search needs both backends".to_string(),
            ));
        }

        let (keyword, semantic) = tokio::join!(
            self.keyword.search(query),
            self.vector.search(&query.text, query.size)
        );
        let (keyword_hits, semantic_hits) = match (keyword, semantic) {
            (Ok(k), Ok(s)) => (k.hits, s),
            (Ok(k), Err(e)) => {
                warn!(error = %e, "Semantic half of hybrid search failed");
                (k.hits, Vec::new())
            }
            (Err(e), Ok(s)) => {
                warn!(error = %e, "Keyword half of hybrid search failed");
                (Vec::new(), s)
            }
            (Err(keyword_error), Err(vector_error)) => {
                warn!(error = %vector_error, "Semantic half of hybrid search failed");
                return Err(keyword_error.into());
            }
        };

        Ok(fuse(&keyword_hits, &semantic_hits, config))
    }

    /// Push documents that already live in the keyword index into the vector
    /// service, using batch adds.
    pub async fn backfill_vectors(&self, documents: &[EmailDocument]) -> Result<BackfillReport> {
        if !self.config.enable_vector {
            return Err(IndexingError::CapabilityUnavailable(
                "backfill needs the vector backend".to_string(),
            ));
        }

        let mut report = BackfillReport::default();
        for (index, chunk) in documents.chunks(self.config.batch_size).enumerate() {
            if index > 0 && !self.config.chunk_pause.is_zero() {
                tokio::time::sleep(self.config.chunk_pause).await;
            }

            let mut entries = Vec::with_capacity(chunk.len());
            for doc in chunk {
                let content = doc.vector_content();
                if doc.validate().is_err() || content.chars().count() < self.config.min_vector_content_len {
                    report.skipped += 1;
                } else {
                    entries.push(VectorEntry::new(doc.id.clone(), content));
                }
            }
            if entries.is_empty() {
                continue;
            }

            let ids: Vec<String> = entries.iter().map(|e| e.email_id.clone()).collect();
            match self.vector.add_batch(entries).await {
                Ok(outcome) => {
                    report.added += outcome.succeeded.len();
                    report.failed.extend(outcome.failed);
                }
                Err(e) => {
                    warn!(chunk = index, error = %e, "Backfill chunk failed");
                    report.failed.extend(ids.into_iter().map(|id| (id, e.to_string())));
                }
            }
        }

        info!(
            added = report.added,
            skipped = report.skipped,
            failed = report.failed.len(),
            "Vector backfill finished"
        );
        Ok(report)
    }
}
