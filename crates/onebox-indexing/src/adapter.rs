//! Compatibility adapter
//!
//! One stable interface over two modes. In dual mode every call goes to a
//! [`DualIndexCoordinator`]; in keyword-only mode the plain keyword store
//! serves everything it can. A coordinator call that panics is served from
//! the keyword store instead, for that call only.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use futures::FutureExt;
use onebox_core::{env, EmailDocument};
use onebox_keyword::{KeywordQuery, KeywordSearchResponse, KeywordStore};
use onebox_vector::{HttpVectorClient, VectorHit, VectorStoreClient};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::IndexingConfig;
use crate::coordinator::{panic_message, probe_keyword, BackendHealth, DualIndexCoordinator, HealthReport};
use crate::error::{IndexingError, Result};
use crate::hybrid::{fuse, HybridConfig, HybridHit};
use crate::result::{BatchIndexingResult, IndexingProgress, IndexingResult};
use crate::stats::{IndexingContext, ServiceStats};

/// Which mode the adapter is serving from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterMode {
    Dual,
    KeywordOnly,
}

/// Features currently available, derived from the live mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub dual_indexing: bool,
    pub vector_search: bool,
    /// Chunked concurrent batches with progress reporting
    pub batch_indexing: bool,
    pub transaction_safety: bool,
    pub hybrid_search: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterStats {
    pub mode: AdapterMode,
    pub service: ServiceStats,
    /// Coordinator calls served from the keyword store after a panic
    pub fallbacks: u64,
}

#[derive(Clone)]
enum Mode {
    Dual { coordinator: Arc<DualIndexCoordinator> },
    KeywordOnly { keyword: Arc<dyn KeywordStore> },
}

impl Mode {
    fn keyword(&self) -> Arc<dyn KeywordStore> {
        match self {
            Self::Dual { coordinator } => coordinator.keyword_store().clone(),
            Self::KeywordOnly { keyword } => keyword.clone(),
        }
    }
}

pub struct CompatibilityAdapter {
    mode: RwLock<Mode>,
    context: Arc<IndexingContext>,
    fallbacks: AtomicU64,
}

impl std::fmt::Debug for CompatibilityAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompatibilityAdapter")
            .field("mode", &self.mode())
            .field("fallbacks", &self.fallbacks.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl CompatibilityAdapter {
    pub fn keyword_only(keyword: Arc<dyn KeywordStore>) -> Result<Self> {
        Ok(Self {
            mode: RwLock::new(Mode::KeywordOnly { keyword }),
            context: Arc::new(IndexingContext::new()?),
            fallbacks: AtomicU64::new(0),
        })
    }

    /// Wrap an existing coordinator; the adapter shares its stats context
    pub fn dual(coordinator: Arc<DualIndexCoordinator>) -> Self {
        Self {
            context: coordinator.context().clone(),
            mode: RwLock::new(Mode::Dual { coordinator }),
            fallbacks: AtomicU64::new(0),
        }
    }

    /// Start in dual mode when `enable` (or `ONEBOX_DUAL_INDEXING` when
    /// `None`) is set and the coordinator can be built. Otherwise start
    /// keyword-only.
    pub fn new(
        keyword: Arc<dyn KeywordStore>,
        vector: Arc<dyn VectorStoreClient>,
        config: IndexingConfig,
        enable: Option<bool>,
    ) -> Result<Self> {
        let adapter = Self::keyword_only(keyword.clone())?;
        let enable = enable.unwrap_or_else(|| env::flag("ONEBOX_DUAL_INDEXING", false));
        if !enable {
            info!("Dual indexing disabled, serving keyword-only");
            return Ok(adapter);
        }

        match DualIndexCoordinator::with_context(keyword, vector, config, adapter.context.clone()) {
            Ok(coordinator) => {
                adapter.set_mode(Mode::Dual {
                    coordinator: Arc::new(coordinator),
                });
                info!("Dual indexing enabled");
            }
            Err(e) => warn!(error = %e, "Dual indexing unavailable, serving keyword-only"),
        }
        Ok(adapter)
    }

    /// Build from `ONEBOX_*` variables with the HTTP vector client
    pub fn from_env(keyword: Arc<dyn KeywordStore>) -> Result<Self> {
        let config = IndexingConfig::from_env();
        match HttpVectorClient::new(config.vector_endpoint.clone()) {
            Ok(vector) => Self::new(keyword, Arc::new(vector), config, None),
            Err(e) => {
                warn!(endpoint = %config.vector_endpoint, error = %e, "Vector client unavailable, serving keyword-only");
                Self::keyword_only(keyword)
            }
        }
    }

    fn current(&self) -> Mode {
        self.mode.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_mode(&self, mode: Mode) {
        *self.mode.write().unwrap_or_else(PoisonError::into_inner) = mode;
    }

    pub fn mode(&self) -> AdapterMode {
        match self.current() {
            Mode::Dual { .. } => AdapterMode::Dual,
            Mode::KeywordOnly { .. } => AdapterMode::KeywordOnly,
        }
    }

    pub fn is_dual_enabled(&self) -> bool {
        self.mode() == AdapterMode::Dual
    }

    pub fn capabilities(&self) -> Capabilities {
        match self.current() {
            Mode::Dual { coordinator } => {
                let config = coordinator.config();
                Capabilities {
                    dual_indexing: true,
                    vector_search: config.enable_vector,
                    batch_indexing: true,
                    transaction_safety: config.transaction_safety,
                    hybrid_search: config.enable_vector && config.enable_keyword,
                }
            }
            Mode::KeywordOnly { .. } => Capabilities {
                dual_indexing: false,
                vector_search: false,
                batch_indexing: false,
                transaction_safety: false,
                hybrid_search: false,
            },
        }
    }

    /// Switch to keyword-only. Never fails.
    pub fn disable_dual_indexing(&self) {
        let mut mode = self.mode.write().unwrap_or_else(PoisonError::into_inner);
        if let Mode::Dual { coordinator } = &*mode {
            let keyword = coordinator.keyword_store().clone();
            *mode = Mode::KeywordOnly { keyword };
            info!("Dual indexing disabled");
        }
    }

    /// Switch to dual mode against the configured HTTP vector endpoint.
    /// Returns false and leaves the mode untouched on any failure.
    pub async fn enable_dual_indexing(&self, config: IndexingConfig) -> bool {
        match HttpVectorClient::new(config.vector_endpoint.clone()) {
            Ok(vector) => self.enable_dual_indexing_with(config, Arc::new(vector)).await,
            Err(e) => {
                warn!(endpoint = %config.vector_endpoint, error = %e, "Cannot enable dual indexing");
                false
            }
        }
    }

    pub async fn enable_dual_indexing_with(&self, config: IndexingConfig, vector: Arc<dyn VectorStoreClient>) -> bool {
        let keyword = self.current().keyword();
        let coordinator = match DualIndexCoordinator::with_context(keyword, vector, config, self.context.clone()) {
            Ok(coordinator) => coordinator,
            Err(e) => {
                warn!(error = %e, "Cannot enable dual indexing");
                return false;
            }
        };

        let health = coordinator.health_check().await;
        if !health.overall {
            warn!(keyword = ?health.keyword, vector = ?health.vector, "Dual indexing health probe failed");
            return false;
        }

        self.set_mode(Mode::Dual {
            coordinator: Arc::new(coordinator),
        });
        info!("Dual indexing enabled");
        true
    }

    /// Run a coordinator call; `None` means it panicked and the caller
    /// should serve from the keyword store.
    async fn guarded<T>(&self, operation: &'static str, call: impl Future<Output = T>) -> Option<T> {
        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(value) => Some(value),
            Err(panic) => {
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                warn!(
                    operation,
                    panic = %panic_message(panic.as_ref()),
                    "Coordinator call failed unexpectedly, serving from keyword store"
                );
                None
            }
        }
    }

    async fn index_keyword_only(&self, keyword: &dyn KeywordStore, document: &EmailDocument) -> IndexingResult {
        let started = Instant::now();
        let mut result = IndexingResult::new(&document.id);
        result.keyword_attempted = true;
        match keyword.index(document).await {
            Ok(()) => {
                result.keyword_success = true;
                result.success = true;
            }
            Err(e) => {
                warn!(email_id = %document.id, error = %e, "Keyword write failed");
                result.errors.push(format!("keyword index failed: {e}"));
            }
        }
        result.elapsed = started.elapsed();
        self.context.record(&result);
        result
    }

    pub async fn index_email(&self, document: &EmailDocument) -> Result<IndexingResult> {
        document.validate()?;
        match self.current() {
            Mode::Dual { coordinator } => {
                if let Some(result) = self.guarded("index_email", coordinator.index_email(document)).await {
                    return Ok(result);
                }
                Ok(self
                    .index_keyword_only(coordinator.keyword_store().as_ref(), document)
                    .await)
            }
            Mode::KeywordOnly { keyword } => Ok(self.index_keyword_only(keyword.as_ref(), document).await),
        }
    }

    pub async fn index_emails(&self, documents: &[EmailDocument]) -> Result<BatchIndexingResult> {
        self.index_emails_with_progress(documents, |_| {}).await
    }

    /// Every document is validated before any backend is contacted
    pub async fn index_emails_with_progress<F>(
        &self,
        documents: &[EmailDocument],
        on_progress: F,
    ) -> Result<BatchIndexingResult>
    where
        F: Fn(&IndexingProgress),
    {
        for document in documents {
            document.validate()?;
        }

        let keyword = match self.current() {
            Mode::Dual { coordinator } => {
                let run = coordinator.index_emails_with_progress(documents, &on_progress);
                if let Some(batch) = self.guarded("index_emails", run).await {
                    return Ok(batch);
                }
                coordinator.keyword_store().clone()
            }
            Mode::KeywordOnly { keyword } => keyword,
        };

        let started = Instant::now();
        let mut batch = BatchIndexingResult::default();
        let mut progress = IndexingProgress::new(documents.len());
        for document in documents {
            let result = self.index_keyword_only(keyword.as_ref(), document).await;
            let ok = usize::from(result.success);
            batch.absorb(result);
            progress.record_chunk(ok, 1 - ok, started.elapsed());
            on_progress(&progress);
        }
        batch.elapsed = started.elapsed();
        Ok(batch)
    }

    pub async fn get_email(&self, email_id: &str) -> Result<Option<EmailDocument>> {
        if email_id.trim().is_empty() {
            return Err(IndexingError::InvalidInput("email id must not be empty".to_string()));
        }
        Ok(self.current().keyword().get(email_id).await?)
    }

    pub async fn search(&self, query: &KeywordQuery) -> Result<KeywordSearchResponse> {
        require_text(&query.text)?;
        match self.current() {
            Mode::Dual { coordinator } => match self.guarded("search", coordinator.search(query)).await {
                Some(response) => response,
                None => Ok(coordinator.keyword_store().search(query).await?),
            },
            Mode::KeywordOnly { keyword } => Ok(keyword.search(query).await?),
        }
    }

    pub async fn semantic_search(&self, query: &str, n_results: usize) -> Result<Vec<VectorHit>> {
        require_text(query)?;
        let Mode::Dual { coordinator } = self.current() else {
            return Err(keyword_only("semantic search"));
        };
        self.guarded("semantic_search", coordinator.semantic_search(query, n_results))
            .await
            .unwrap_or_else(|| {
                Err(IndexingError::CapabilityUnavailable(
                    "semantic search failed unexpectedly".to_string(),
                ))
            })
    }

    /// Falls back to keyword-ranked hits if the coordinator panics
    pub async fn hybrid_search(&self, query: &KeywordQuery, config: &HybridConfig) -> Result<Vec<HybridHit>> {
        require_text(&query.text)?;
        let Mode::Dual { coordinator } = self.current() else {
            return Err(keyword_only("hybrid search"));
        };
        if let Some(hits) = self
            .guarded("hybrid_search", coordinator.hybrid_search(query, config))
            .await
        {
            return hits;
        }
        let response = coordinator.keyword_store().search(query).await?;
        Ok(fuse(&response.hits, &[], config))
    }

    pub async fn health_check(&self) -> HealthReport {
        match self.current() {
            Mode::Dual { coordinator } => {
                if let Some(report) = self.guarded("health_check", coordinator.health_check()).await {
                    return report;
                }
                HealthReport::new(
                    probe_keyword(coordinator.keyword_store().as_ref()).await,
                    BackendHealth::Unhealthy {
                        error: "coordinator health check failed unexpectedly".to_string(),
                    },
                )
            }
            Mode::KeywordOnly { keyword } => {
                HealthReport::new(probe_keyword(keyword.as_ref()).await, BackendHealth::Disabled)
            }
        }
    }

    pub fn stats(&self) -> AdapterStats {
        let (mode, service) = match self.current() {
            Mode::Dual { coordinator } => (AdapterMode::Dual, coordinator.stats()),
            Mode::KeywordOnly { .. } => (AdapterMode::KeywordOnly, self.context.snapshot()),
        };
        AdapterStats {
            mode,
            service,
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
        }
    }

    pub fn render_metrics(&self) -> Result<String> {
        match self.current() {
            Mode::Dual { coordinator } => coordinator.render_metrics(),
            Mode::KeywordOnly { .. } => self.context.render_metrics(),
        }
    }

    /// Keyword store serving the current mode
    pub fn keyword_store(&self) -> Arc<dyn KeywordStore> {
        self.current().keyword()
    }

    /// Coordinator, when in dual mode
    pub fn coordinator(&self) -> Option<Arc<DualIndexCoordinator>> {
        match self.current() {
            Mode::Dual { coordinator } => Some(coordinator),
            Mode::KeywordOnly { .. } => None,
        }
    }
}

fn require_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(IndexingError::InvalidInput("query text must not be empty".to_string()));
    }
    Ok(())
}

fn keyword_only(operation: &str) -> IndexingError {
    IndexingError::CapabilityUnavailable(format!("{operation} needs dual indexing"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use onebox_keyword::{InMemoryKeywordStore, KeywordResult};
    use onebox_vector::InMemoryVectorClient;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Keyword store whose writes succeed but whose searches panic, to
    /// exercise the per-call fallback path through the coordinator.
    #[derive(Default)]
    struct SearchPanics {
        inner: InMemoryKeywordStore,
        armed: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl KeywordStore for SearchPanics {
        async fn index(&self, document: &EmailDocument) -> KeywordResult<()> {
            self.inner.index(document).await
        }

        async fn get(&self, email_id: &str) -> KeywordResult<Option<EmailDocument>> {
            self.inner.get(email_id).await
        }

        async fn delete(&self, email_id: &str) -> KeywordResult<bool> {
            self.inner.delete(email_id).await
        }

        async fn bulk_delete(&self, email_ids: &[String]) -> KeywordResult<onebox_keyword::BulkDeleteReport> {
            self.inner.bulk_delete(email_ids).await
        }

        async fn search(&self, query: &KeywordQuery) -> KeywordResult<KeywordSearchResponse> {
            // fires once so the fallback's own search succeeds
            assert!(!self.armed.swap(false, Ordering::SeqCst), "search index corrupted");
            self.inner.search(query).await
        }

        fn backend_name(&self) -> &'static str {
            "search-panics"
        }
    }

    fn config() -> IndexingConfig {
        IndexingConfig::default()
            .with_retry_delay(Duration::from_millis(1))
            .with_chunk_pause(Duration::ZERO)
    }

    fn email(id: &str) -> EmailDocument {
        EmailDocument::new(id, format!("Meeting notes {id}"), "Agenda and action items for the week")
    }

    fn dual_adapter() -> (CompatibilityAdapter, Arc<InMemoryKeywordStore>, Arc<InMemoryVectorClient>) {
        let keyword = Arc::new(InMemoryKeywordStore::new());
        let vector = Arc::new(InMemoryVectorClient::new());
        let adapter = CompatibilityAdapter::new(keyword.clone(), vector.clone(), config(), Some(true)).unwrap();
        (adapter, keyword, vector)
    }

    #[tokio::test]
    async fn starts_dual_when_enabled() {
        let (adapter, keyword, vector) = dual_adapter();
        assert!(adapter.is_dual_enabled());

        let result = adapter.index_email(&email("e-1")).await.unwrap();

        assert!(result.success);
        assert!(keyword.get("e-1").await.unwrap().is_some());
        assert!(vector.contains("e-1").await);
        assert_eq!(adapter.stats().service.total_indexed, 1);
    }

    #[tokio::test]
    async fn invalid_config_starts_keyword_only() {
        let keyword = Arc::new(InMemoryKeywordStore::new());
        let adapter = CompatibilityAdapter::new(
            keyword,
            Arc::new(InMemoryVectorClient::new()),
            config().with_batch_size(0),
            Some(true),
        )
        .unwrap();

        assert_eq!(adapter.mode(), AdapterMode::KeywordOnly);
        assert!(!adapter.capabilities().vector_search);
    }

    #[tokio::test]
    async fn keyword_only_serves_stable_operations() {
        let keyword = Arc::new(InMemoryKeywordStore::new());
        let adapter = CompatibilityAdapter::keyword_only(keyword.clone()).unwrap();

        let result = adapter.index_email(&email("e-1")).await.unwrap();
        assert!(result.success);
        assert!(!result.vector_attempted);

        assert!(adapter.get_email("e-1").await.unwrap().is_some());
        let found = adapter.search(&KeywordQuery::new("meeting")).await.unwrap();
        assert_eq!(found.total, 1);

        let health = adapter.health_check().await;
        assert!(health.overall);
        assert_eq!(health.vector, BackendHealth::Disabled);

        assert!(matches!(
            adapter.semantic_search("meeting", 3).await,
            Err(IndexingError::CapabilityUnavailable(_))
        ));
        assert!(matches!(
            adapter
                .hybrid_search(&KeywordQuery::new("meeting"), &HybridConfig::default())
                .await,
            Err(IndexingError::CapabilityUnavailable(_))
        ));
        assert_eq!(adapter.stats().service.total_indexed, 1);
    }

    #[tokio::test]
    async fn caller_errors_never_reach_a_backend() {
        let (adapter, keyword, vector) = dual_adapter();

        let blank = EmailDocument::new("", "Subject", "Body");
        assert!(matches!(
            adapter.index_email(&blank).await,
            Err(IndexingError::InvalidInput(_))
        ));
        assert!(matches!(
            adapter.index_emails(&[email("e-1"), blank]).await,
            Err(IndexingError::InvalidInput(_))
        ));
        assert!(matches!(adapter.get_email(" ").await, Err(IndexingError::InvalidInput(_))));
        assert!(matches!(
            adapter.search(&KeywordQuery::new("  ")).await,
            Err(IndexingError::InvalidInput(_))
        ));
        assert!(matches!(
            adapter.semantic_search("", 5).await,
            Err(IndexingError::InvalidInput(_))
        ));

        assert_eq!(keyword.index_calls(), 0);
        assert_eq!(vector.add_calls(), 0);
    }

    #[tokio::test]
    async fn disable_then_enable_round_trips_capabilities() {
        let (adapter, _keyword, _vector) = dual_adapter();
        assert!(adapter.capabilities().vector_search);

        adapter.disable_dual_indexing();
        assert_eq!(
            adapter.capabilities(),
            Capabilities {
                dual_indexing: false,
                vector_search: false,
                batch_indexing: false,
                transaction_safety: false,
                hybrid_search: false,
            }
        );
        adapter.disable_dual_indexing();

        let enabled = adapter
            .enable_dual_indexing_with(config(), Arc::new(InMemoryVectorClient::new()))
            .await;
        assert!(enabled);
        assert!(adapter.capabilities().hybrid_search);
    }

    #[tokio::test]
    async fn enable_fails_when_vector_probe_fails() {
        let keyword = Arc::new(InMemoryKeywordStore::new());
        let adapter = CompatibilityAdapter::keyword_only(keyword).unwrap();
        let vector = Arc::new(InMemoryVectorClient::new());
        vector.set_offline(true);

        assert!(!adapter.enable_dual_indexing_with(config(), vector).await);
        assert_eq!(adapter.mode(), AdapterMode::KeywordOnly);
        assert!(!adapter.capabilities().vector_search);
    }

    #[tokio::test]
    async fn enable_fails_on_invalid_endpoint() {
        let adapter = CompatibilityAdapter::keyword_only(Arc::new(InMemoryKeywordStore::new())).unwrap();

        let enabled = adapter
            .enable_dual_indexing(config().with_vector_endpoint("not a url"))
            .await;

        assert!(!enabled);
        assert!(!adapter.is_dual_enabled());
    }

    #[tokio::test]
    async fn panicking_call_falls_back_for_that_call_only() {
        let keyword = Arc::new(SearchPanics::default());
        keyword.inner.index(&email("e-1")).await.unwrap();
        let adapter =
            CompatibilityAdapter::new(keyword.clone(), Arc::new(InMemoryVectorClient::new()), config(), Some(true))
                .unwrap();

        keyword.armed.store(true, Ordering::SeqCst);
        let found = adapter.search(&KeywordQuery::new("meeting")).await.unwrap();

        assert_eq!(found.total, 1);
        assert!(adapter.is_dual_enabled());
        assert_eq!(adapter.stats().fallbacks, 1);

        let again = adapter.search(&KeywordQuery::new("meeting")).await.unwrap();
        assert_eq!(again.total, 1);
        assert_eq!(adapter.stats().fallbacks, 1);
    }

    #[tokio::test]
    async fn hybrid_falls_back_to_keyword_ranking() {
        let keyword = Arc::new(SearchPanics::default());
        keyword.inner.index(&email("e-1")).await.unwrap();
        let adapter =
            CompatibilityAdapter::new(keyword.clone(), Arc::new(InMemoryVectorClient::new()), config(), Some(true))
                .unwrap();

        keyword.armed.store(true, Ordering::SeqCst);
        let hits = adapter
            .hybrid_search(&KeywordQuery::new("meeting"), &HybridConfig::default())
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].email_id, "e-1");
        assert!(hits[0].semantic_score.is_none());
    }

    #[tokio::test]
    async fn keyword_only_batch_reports_progress_per_document() {
        let adapter = CompatibilityAdapter::keyword_only(Arc::new(InMemoryKeywordStore::new())).unwrap();
        let docs: Vec<_> = (1..=3).map(|i| email(&format!("e-{i}"))).collect();
        let seen = Mutex::new(Vec::new());

        let batch = adapter
            .index_emails_with_progress(&docs, |p| seen.lock().unwrap().push(p.processed))
            .await
            .unwrap();

        assert_eq!(batch.total_successful, 3);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn stats_survive_mode_switches() {
        let (adapter, _keyword, _vector) = dual_adapter();
        adapter.index_email(&email("e-1")).await.unwrap();

        adapter.disable_dual_indexing();
        adapter.index_email(&email("e-2")).await.unwrap();

        let stats = adapter.stats();
        assert_eq!(stats.mode, AdapterMode::KeywordOnly);
        assert_eq!(stats.service.total_indexed, 2);
        assert!(adapter.render_metrics().unwrap().contains("onebox_emails_indexed_total"));
    }

    #[tokio::test]
    async fn reports_serialize_for_operators() {
        let adapter = CompatibilityAdapter::keyword_only(Arc::new(InMemoryKeywordStore::new())).unwrap();

        let stats = serde_json::to_value(adapter.stats()).unwrap();
        assert_eq!(stats["mode"], "keyword_only");
        assert_eq!(stats["fallbacks"], 0);

        let health = serde_json::to_value(adapter.health_check().await).unwrap();
        assert_eq!(health["keyword"]["status"], "healthy");
        assert_eq!(health["vector"]["status"], "disabled");
        assert_eq!(health["overall"], true);
    }
}
