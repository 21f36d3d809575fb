//! HTTP client for the semantic indexing microservice
//!
//! Every call carries its own timeout; a timeout is reported as
//! [`VectorError::Timeout`] and treated like any other failure by callers.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::{VectorError, VectorResult};
use crate::store::VectorStoreClient;
use crate::types::{BatchOutcome, VectorEntry, VectorHit};

/// Per-call timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorTimeouts {
    /// Single add, search and single delete
    pub single: Duration,
    /// Batch add
    pub add_batch: Duration,
    /// Batch delete
    pub delete_batch: Duration,
}

impl Default for VectorTimeouts {
    fn default() -> Self {
        Self {
            single: Duration::from_secs(10),
            add_batch: Duration::from_secs(30),
            delete_batch: Duration::from_secs(20),
        }
    }
}

/// JSON-over-HTTP vector service client
#[derive(Debug, Clone)]
pub struct HttpVectorClient {
    client: Client,
    base_url: String,
    timeouts: VectorTimeouts,
}

impl HttpVectorClient {
    /// Create a client for the service at `base_url`
    pub fn new(base_url: impl Into<String>) -> VectorResult<Self> {
        let base_url = base_url.into();
        let parsed = Url::parse(&base_url).map_err(|e| VectorError::InvalidEndpoint(format!("{base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(VectorError::InvalidEndpoint(format!(
                "{base_url}: unsupported scheme {}",
                parsed.scheme()
            )));
        }

        let client = Client::builder()
            .build()
            .map_err(|e| VectorError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeouts: VectorTimeouts::default(),
        })
    }

    /// Override the default timeouts
    pub fn with_timeouts(mut self, timeouts: VectorTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, timeout: Duration) -> VectorResult<T> {
        let response = request.timeout(timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                VectorError::Timeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                }
            } else {
                VectorError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read body>".to_string());
            return Err(VectorError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(|e| VectorError::Decode(e.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct AddEmailsBody<'a> {
    emails: &'a [VectorEntry],
}

#[derive(Debug, Serialize)]
struct DeleteEmailBody<'a> {
    email_id: &'a str,
}

#[derive(Debug, Serialize)]
struct DeleteEmailsBody<'a> {
    email_ids: &'a [String],
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct EmailResponseBody {
    success: bool,
    email_id: String,
    #[serde(default)]
    processing_time_ms: f64,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct BatchResponseBody {
    success: bool,
    processed: usize,
    successful: usize,
    failed: usize,
    #[serde(default)]
    results: Vec<EmailResponseBody>,
    #[serde(default)]
    errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponseBody {
    success: bool,
    #[serde(default)]
    results: Vec<VectorHit>,
}

#[derive(Debug, Deserialize)]
struct DeleteResponseBody {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// True when `id` appears in `error` as a whole word, not inside a longer id
fn names_id(error: &str, id: &str) -> bool {
    error.split_whitespace().any(|token| {
        token.trim_matches(|c: char| matches!(c, ':' | ',' | ';' | '.' | '"' | '\'' | '(' | ')' | '[' | ']')) == id
    })
}

fn delete_outcome(email_ids: &[String], body: &BatchResponseBody) -> BatchOutcome {
    let mut outcome = BatchOutcome::new();

    // A failed batch names no ids, so its first error applies to all of them
    let whole_batch_failed = !body.success
        && (body.successful == 0 || body.failed >= email_ids.len() || body.errors.is_empty());
    if whole_batch_failed {
        let reason = body
            .errors
            .first()
            .cloned()
            .unwrap_or_else(|| "batch delete failed".to_string());
        for id in email_ids {
            outcome.add_failure(id.clone(), reason.clone());
        }
        return outcome;
    }

    for id in email_ids {
        match body.errors.iter().find(|e| names_id(e, id)) {
            Some(error) => outcome.add_failure(id.clone(), error.clone()),
            None => outcome.add_success(id.clone()),
        }
    }
    if outcome.failed.len() != body.failed {
        warn!(
            reported = body.failed,
            attributed = outcome.failed.len(),
            "Batch delete failures could not all be attributed to ids"
        );
    }
    outcome
}

#[async_trait]
impl VectorStoreClient for HttpVectorClient {
    async fn add(&self, entry: VectorEntry) -> VectorResult<()> {
        let request = self.client.post(self.endpoint("/add_email")).json(&entry);
        let body: EmailResponseBody = self.send(request, self.timeouts.single).await?;

        if !body.success {
            return Err(VectorError::Rejected(
                body.error.unwrap_or_else(|| format!("add_email failed for {}", entry.email_id)),
            ));
        }
        debug!(email_id = %entry.email_id, "Email added to vector service");
        Ok(())
    }

    async fn add_batch(&self, entries: Vec<VectorEntry>) -> VectorResult<BatchOutcome> {
        if entries.is_empty() {
            return Ok(BatchOutcome::new());
        }

        let request = self
            .client
            .post(self.endpoint("/add_emails"))
            .json(&AddEmailsBody { emails: &entries });
        let body: BatchResponseBody = self.send(request, self.timeouts.add_batch).await?;

        let mut outcome = BatchOutcome::new();
        if body.results.is_empty() {
            if body.successful == entries.len() {
                entries.into_iter().for_each(|e| outcome.add_success(e.email_id));
            } else {
                let reason = body.errors.first().cloned().unwrap_or_else(|| "batch add failed".to_string());
                entries
                    .into_iter()
                    .for_each(|e| outcome.add_failure(e.email_id, reason.clone()));
            }
        } else {
            for result in body.results {
                if result.success {
                    outcome.add_success(result.email_id);
                } else {
                    let error = result.error.unwrap_or_else(|| "add failed".to_string());
                    outcome.add_failure(result.email_id, error);
                }
            }
        }

        debug!(
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "Batch added to vector service"
        );
        Ok(outcome)
    }

    async fn search(&self, query: &str, n_results: usize) -> VectorResult<Vec<VectorHit>> {
        if query.trim().is_empty() {
            return Err(VectorError::InvalidRequest("query must not be empty".to_string()));
        }

        let request = self
            .client
            .get(self.endpoint("/search"))
            .query(&[("q", query.to_string()), ("n_results", n_results.to_string())]);
        let body: SearchResponseBody = self.send(request, self.timeouts.single).await?;

        if !body.success {
            return Err(VectorError::Rejected(format!("search failed for query '{query}'")));
        }
        Ok(body.results)
    }

    async fn delete(&self, email_id: &str) -> VectorResult<bool> {
        let request = self
            .client
            .post(self.endpoint("/delete_email"))
            .json(&DeleteEmailBody { email_id });
        let body: DeleteResponseBody = self.send(request, self.timeouts.single).await?;

        match (body.success, body.error) {
            (true, _) => Ok(true),
            (false, Some(error)) => Err(VectorError::Rejected(error)),
            (false, None) => {
                debug!(email_id, "Email already absent from vector service");
                Ok(true)
            }
        }
    }

    async fn delete_batch(&self, email_ids: Vec<String>) -> VectorResult<BatchOutcome> {
        if email_ids.is_empty() {
            return Ok(BatchOutcome::new());
        }

        let request = self
            .client
            .post(self.endpoint("/delete_emails"))
            .json(&DeleteEmailsBody { email_ids: &email_ids });
        let body: BatchResponseBody = self.send(request, self.timeouts.delete_batch).await?;

        Ok(delete_outcome(&email_ids, &body))
    }

    fn backend_name(&self) -> &'static str {
        "vector-http"
    }
}
