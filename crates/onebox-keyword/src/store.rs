//! Keyword store trait and the in-memory implementation

use async_trait::async_trait;
use onebox_core::EmailDocument;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::{KeywordError, KeywordResult};
use crate::types::{BulkDeleteReport, KeywordHit, KeywordQuery, KeywordSearchResponse, RestoreReport};

/// Lexical search backend abstraction
#[async_trait]
pub trait KeywordStore: Send + Sync {
    /// Store a document, overwriting any previous copy with the same id
    async fn index(&self, document: &EmailDocument) -> KeywordResult<()>;

    /// Fetch a document; `None` when absent
    async fn get(&self, id: &str) -> KeywordResult<Option<EmailDocument>>;

    /// Remove a document. Returns `true` if it was deleted or already absent.
    async fn delete(&self, id: &str) -> KeywordResult<bool>;

    /// Remove many documents in a single request
    async fn bulk_delete(&self, ids: &[String]) -> KeywordResult<BulkDeleteReport>;

    /// Text search with filters
    async fn search(&self, query: &KeywordQuery) -> KeywordResult<KeywordSearchResponse>;

    /// Snapshot the current copies of `ids`. Absent ids are skipped.
    async fn backup(&self, ids: &[String]) -> KeywordResult<Vec<EmailDocument>> {
        let mut documents = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(doc) = self.get(id).await? {
                documents.push(doc);
            }
        }
        Ok(documents)
    }

    /// Re-index previously backed up documents
    async fn restore(&self, documents: &[EmailDocument]) -> KeywordResult<RestoreReport> {
        let mut report = RestoreReport::default();
        for doc in documents {
            match self.index(doc).await {
                Ok(()) => report.restored += 1,
                Err(e) => {
                    warn!(email_id = %doc.id, error = %e, "Failed to restore document");
                    report.failed.push((doc.id.clone(), e.to_string()));
                }
            }
        }
        Ok(report)
    }

    /// Short backend name used in logs and error strings
    fn backend_name(&self) -> &'static str;
}

/// In-memory keyword store for tests
#[derive(Debug, Default)]
pub struct InMemoryKeywordStore {
    documents: RwLock<HashMap<String, EmailDocument>>,
    offline: AtomicBool,
    failing_indexes: AtomicUsize,
    fail_deletes: AtomicBool,
    index_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    bulk_delete_calls: AtomicUsize,
}

impl InMemoryKeywordStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with [`KeywordError::Unavailable`]
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail the next `count` index calls with a transport error
    pub fn fail_next_indexes(&self, count: usize) {
        self.failing_indexes.store(count, Ordering::SeqCst);
    }

    /// Fail every delete (single and bulk)
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    pub fn index_calls(&self) -> usize {
        self.index_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn bulk_delete_calls(&self) -> usize {
        self.bulk_delete_calls.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> KeywordResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(KeywordError::Unavailable);
        }
        Ok(())
    }

    fn check_deletes(&self) -> KeywordResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(KeywordError::Transport("injected delete failure".to_string()));
        }
        Ok(())
    }
}

/// Term-count relevance, subject matches weighted double.
fn relevance(terms: &[String], doc: &EmailDocument) -> f32 {
    let subject = doc.subject.to_lowercase();
    let rest = format!("{} {} {}", doc.body, doc.from, doc.to.join(" ")).to_lowercase();
    let mut score = 0.0;
    for term in terms {
        if subject.contains(term.as_str()) {
            score += 2.0;
        }
        if rest.contains(term.as_str()) {
            score += 1.0;
        }
    }
    score
}

#[async_trait]
impl KeywordStore for InMemoryKeywordStore {
    async fn index(&self, document: &EmailDocument) -> KeywordResult<()> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        let injected = self
            .failing_indexes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(KeywordError::Transport("injected index failure".to_string()));
        }
        self.documents
            .write()
            .await
            .insert(document.id.clone(), document.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> KeywordResult<Option<EmailDocument>> {
        self.check_online()?;
        Ok(self.documents.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> KeywordResult<bool> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        self.check_deletes()?;
        self.documents.write().await.remove(id);
        Ok(true)
    }

    async fn bulk_delete(&self, ids: &[String]) -> KeywordResult<BulkDeleteReport> {
        self.bulk_delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        self.check_deletes()?;
        let mut documents = self.documents.write().await;
        let mut report = BulkDeleteReport::default();
        for id in ids {
            documents.remove(id);
            report.record_success();
        }
        Ok(report)
    }

    async fn search(&self, query: &KeywordQuery) -> KeywordResult<KeywordSearchResponse> {
        self.check_online()?;
        let terms: Vec<String> = query.text.split_whitespace().map(str::to_lowercase).collect();

        let documents = self.documents.read().await;
        let mut hits: Vec<KeywordHit> = documents
            .values()
            .filter(|doc| query.filters_match(doc))
            .filter_map(|doc| {
                if terms.is_empty() {
                    return Some(KeywordHit {
                        document: doc.clone(),
                        score: 1.0,
                    });
                }
                let score = relevance(&terms, doc);
                (score > 0.0).then(|| KeywordHit {
                    document: doc.clone(),
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.document.id.cmp(&b.document.id))
        });
        let total = hits.len() as u64;
        let hits = hits.into_iter().skip(query.from).take(query.size).collect();

        Ok(KeywordSearchResponse { total, hits })
    }

    fn backend_name(&self) -> &'static str {
        "in-memory-keyword"
    }
}
