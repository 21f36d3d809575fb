//! Vector service trait and the in-memory stand-in

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::error::{VectorError, VectorResult};
use crate::types::{BatchOutcome, VectorEntry, VectorHit};

/// Semantic indexing service abstraction
#[async_trait]
pub trait VectorStoreClient: Send + Sync {
    /// Index one email
    async fn add(&self, entry: VectorEntry) -> VectorResult<()>;

    /// Index many emails in one request
    async fn add_batch(&self, entries: Vec<VectorEntry>) -> VectorResult<BatchOutcome>;

    /// Semantic search; hits ordered closest first
    async fn search(&self, query: &str, n_results: usize) -> VectorResult<Vec<VectorHit>>;

    /// Remove one email. Returns `true` when it is gone afterwards.
    async fn delete(&self, email_id: &str) -> VectorResult<bool>;

    /// Remove many emails in one request
    async fn delete_batch(&self, email_ids: Vec<String>) -> VectorResult<BatchOutcome>;

    /// Short backend name used in logs and error strings
    fn backend_name(&self) -> &'static str;
}

/// In-memory vector store for tests.
///
/// Similarity is plain term overlap so results are deterministic. Failure
/// knobs let tests simulate an unhealthy service without a network.
#[derive(Debug, Default)]
pub struct InMemoryVectorClient {
    entries: RwLock<HashMap<String, String>>,
    offline: AtomicBool,
    failing_adds: AtomicUsize,
    fail_deletes: AtomicBool,
    add_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    delete_batch_calls: AtomicUsize,
}

impl InMemoryVectorClient {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with [`VectorError::Unavailable`]
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail the next `count` single adds with a transport error
    pub fn fail_next_adds(&self, count: usize) {
        self.failing_adds.store(count, Ordering::SeqCst);
    }

    /// Fail every delete (single and batch)
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub async fn contains(&self, email_id: &str) -> bool {
        self.entries.read().await.contains_key(email_id)
    }

    pub async fn content(&self, email_id: &str) -> Option<String> {
        self.entries.read().await.get(email_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn delete_batch_calls(&self) -> usize {
        self.delete_batch_calls.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> VectorResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(VectorError::Unavailable);
        }
        Ok(())
    }

    fn take_injected_add_failure(&self) -> bool {
        self.failing_adds
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn overlap_distance(query_terms: &[String], content: &str) -> Option<f32> {
    let content = content.to_lowercase();
    let matched = query_terms.iter().filter(|t| content.contains(t.as_str())).count();
    if matched == 0 {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = matched as f32 / query_terms.len() as f32;
    Some(1.0 - ratio)
}

#[async_trait]
impl VectorStoreClient for InMemoryVectorClient {
    async fn add(&self, entry: VectorEntry) -> VectorResult<()> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        if self.take_injected_add_failure() {
            return Err(VectorError::Transport("injected add failure".to_string()));
        }
        if entry.content.trim().is_empty() {
            return Err(VectorError::InvalidRequest("content must not be empty".to_string()));
        }
        self.entries.write().await.insert(entry.email_id, entry.content);
        Ok(())
    }

    async fn add_batch(&self, entries: Vec<VectorEntry>) -> VectorResult<BatchOutcome> {
        self.check_online()?;
        let mut outcome = BatchOutcome::new();
        let mut store = self.entries.write().await;
        for entry in entries {
            if entry.content.trim().is_empty() {
                outcome.add_failure(entry.email_id, "content must not be empty");
            } else {
                outcome.add_success(entry.email_id.clone());
                store.insert(entry.email_id, entry.content);
            }
        }
        Ok(outcome)
    }

    async fn search(&self, query: &str, n_results: usize) -> VectorResult<Vec<VectorHit>> {
        self.check_online()?;
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
            return Err(VectorError::InvalidRequest("query must not be empty".to_string()));
        }

        let store = self.entries.read().await;
        let mut hits: Vec<VectorHit> = store
            .iter()
            .filter_map(|(id, content)| {
                overlap_distance(&terms, content).map(|d| VectorHit::new(id.clone(), content.clone(), d))
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.email_id.cmp(&b.email_id))
        });
        hits.truncate(n_results);
        Ok(hits)
    }

    async fn delete(&self, email_id: &str) -> VectorResult<bool> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(VectorError::Transport("injected delete failure".to_string()));
        }
        self.entries.write().await.remove(email_id);
        Ok(true)
    }

    async fn delete_batch(&self, email_ids: Vec<String>) -> VectorResult<BatchOutcome> {
        self.delete_batch_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(VectorError::Transport("injected delete failure".to_string()));
        }
        let mut store = self.entries.write().await;
        let mut outcome = BatchOutcome::new();
        for id in email_ids {
            store.remove(&id);
            outcome.add_success(id);
        }
        Ok(outcome)
    }

    fn backend_name(&self) -> &'static str {
        "in-memory-vector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_search() {
        let store = InMemoryVectorClient::new();
        store.add(VectorEntry::new("e-1", "Invoice payment due")).await.unwrap();
        store.add(VectorEntry::new("e-2", "Team meeting tomorrow")).await.unwrap();
        store.add(VectorEntry::new("e-3", "Payment received")).await.unwrap();

        let hits = store.search("invoice payment", 10).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].email_id, "e-1");
        assert!(hits[0].distance < hits[1].distance);
    }

    #[tokio::test]
    async fn test_add_overwrites_same_id() {
        let store = InMemoryVectorClient::new();
        store.add(VectorEntry::new("e-1", "first version")).await.unwrap();
        store.add(VectorEntry::new("e-1", "second version")).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.content("e-1").await.as_deref(), Some("second version"));
    }

    #[tokio::test]
    async fn test_injected_failures_run_out() {
        let store = InMemoryVectorClient::new();
        store.fail_next_adds(2);

        assert!(store.add(VectorEntry::new("e-1", "hello there")).await.is_err());
        assert!(store.add(VectorEntry::new("e-1", "hello there")).await.is_err());
        assert!(store.add(VectorEntry::new("e-1", "hello there")).await.is_ok());
        assert_eq!(store.add_calls(), 3);
    }

    #[tokio::test]
    async fn test_offline_rejects_everything() {
        let store = InMemoryVectorClient::new();
        store.set_offline(true);

        assert_eq!(store.search("anything", 1).await, Err(VectorError::Unavailable));
        assert_eq!(store.delete("e-1").await, Err(VectorError::Unavailable));
    }

    #[tokio::test]
    async fn test_delete_absent_is_ok() {
        let store = InMemoryVectorClient::new();
        assert_eq!(store.delete("missing").await, Ok(true));
    }

    #[tokio::test]
    async fn test_delete_batch() {
        let store = InMemoryVectorClient::new();
        store.add(VectorEntry::new("a", "alpha content")).await.unwrap();
        store.add(VectorEntry::new("b", "beta content")).await.unwrap();

        let outcome = store
            .delete_batch(vec!["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        assert_eq!(outcome.succeeded.len(), 2);
        assert!(store.is_empty().await);
        assert_eq!(store.delete_batch_calls(), 1);
    }
}
