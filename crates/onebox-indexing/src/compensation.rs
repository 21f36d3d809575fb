//! Best-effort rollback of writes that succeeded on one backend only
//!
//! Nothing here is retried or escalated. Failures are logged and handed
//! back so they can be attached to the affected results.

use std::collections::HashMap;

use onebox_keyword::KeywordStore;
use onebox_vector::VectorStoreClient;
use tracing::{info, warn};

/// Which backends must forget a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationPlan {
    pub email_id: String,
    pub keyword: bool,
    pub vector: bool,
}

/// Rollback failures keyed by email id
#[derive(Debug, Default)]
pub struct CompensationFailures {
    by_id: HashMap<String, Vec<String>>,
}

impl CompensationFailures {
    fn record(&mut self, email_id: &str, backend: &str, error: impl std::fmt::Display) {
        warn!(email_id, backend, error = %error, "Compensating delete failed");
        self.by_id
            .entry(email_id.to_string())
            .or_default()
            .push(format!("{backend} rollback failed: {error}"));
    }

    pub fn take(&mut self, email_id: &str) -> Vec<String> {
        self.by_id.remove(email_id).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Roll back one document. Both deletes run concurrently and fail independently.
pub async fn compensate_one(
    keyword: &dyn KeywordStore,
    vector: &dyn VectorStoreClient,
    plan: &CompensationPlan,
) -> CompensationFailures {
    let mut failures = CompensationFailures::default();
    let id = plan.email_id.as_str();

    let keyword_delete = async {
        if plan.keyword {
            Some(keyword.delete(id).await)
        } else {
            None
        }
    };
    let vector_delete = async {
        if plan.vector {
            Some(vector.delete(id).await)
        } else {
            None
        }
    };
    let (keyword_outcome, vector_outcome) = tokio::join!(keyword_delete, vector_delete);

    match keyword_outcome {
        Some(Ok(true)) | None => {}
        Some(Ok(false)) => failures.record(id, "keyword", "document was not deleted"),
        Some(Err(e)) => failures.record(id, "keyword", e),
    }
    match vector_outcome {
        Some(Ok(true)) | None => {}
        Some(Ok(false)) => failures.record(id, "vector", "document was not deleted"),
        Some(Err(e)) => failures.record(id, "vector", e),
    }

    info!(
        email_id = id,
        keyword = plan.keyword,
        vector = plan.vector,
        clean = failures.is_empty(),
        "Compensation completed"
    );
    failures
}

/// Roll back a chunk: one bulk call per backend at most.
pub async fn compensate_batch(
    keyword: &dyn KeywordStore,
    vector: &dyn VectorStoreClient,
    plans: &[CompensationPlan],
) -> CompensationFailures {
    let mut failures = CompensationFailures::default();

    let keyword_ids: Vec<String> = plans.iter().filter(|p| p.keyword).map(|p| p.email_id.clone()).collect();
    let vector_ids: Vec<String> = plans.iter().filter(|p| p.vector).map(|p| p.email_id.clone()).collect();

    let keyword_delete = async {
        if keyword_ids.is_empty() {
            None
        } else {
            Some(keyword.bulk_delete(&keyword_ids).await)
        }
    };
    let vector_delete = async {
        if vector_ids.is_empty() {
            None
        } else {
            Some(vector.delete_batch(vector_ids.clone()).await)
        }
    };
    let (keyword_outcome, vector_outcome) = tokio::join!(keyword_delete, vector_delete);

    match keyword_outcome {
        None => {}
        Some(Ok(report)) => {
            for (id, error) in &report.per_id_errors {
                failures.record(id, "keyword", error);
            }
        }
        Some(Err(e)) => {
            for id in &keyword_ids {
                failures.record(id, "keyword", &e);
            }
        }
    }
    match vector_outcome {
        None => {}
        Some(Ok(outcome)) => {
            for (id, error) in &outcome.failed {
                failures.record(id, "vector", error);
            }
        }
        Some(Err(e)) => {
            for id in &vector_ids {
                failures.record(id, "vector", &e);
            }
        }
    }

    info!(
        documents = plans.len(),
        keyword_deletes = keyword_ids.len(),
        vector_deletes = vector_ids.len(),
        "Batch compensation completed"
    );
    failures
}
