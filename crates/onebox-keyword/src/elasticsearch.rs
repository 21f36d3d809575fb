//! Elasticsearch REST backend
//!
//! Writes use `refresh=wait_for` so a document is searchable as soon as
//! the call returns. Document ids are percent-encoded into the path.

use async_trait::async_trait;
use onebox_core::{env, EmailDocument};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::{KeywordError, KeywordResult};
use crate::store::KeywordStore;
use crate::types::{BulkDeleteReport, KeywordHit, KeywordQuery, KeywordSearchResponse};

/// Connection settings for Elasticsearch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElasticsearchConfig {
    /// Cluster URL
    pub url: String,
    /// Index holding email documents
    pub index: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            index: "emails".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ElasticsearchConfig {
    /// Read `ONEBOX_ELASTICSEARCH_URL` and `ONEBOX_ELASTICSEARCH_INDEX`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: env::string("ONEBOX_ELASTICSEARCH_URL", &defaults.url),
            index: env::string("ONEBOX_ELASTICSEARCH_INDEX", &defaults.index),
            timeout: defaults.timeout,
        }
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }
}

/// Keyword store backed by an Elasticsearch index
#[derive(Debug, Clone)]
pub struct ElasticsearchStore {
    client: Client,
    base_url: Url,
    index: String,
    timeout: Duration,
}

impl ElasticsearchStore {
    pub fn new(config: ElasticsearchConfig) -> KeywordResult<Self> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| KeywordError::InvalidEndpoint(format!("{}: {e}", config.url)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(KeywordError::InvalidEndpoint(format!(
                "{}: unsupported scheme {}",
                config.url,
                base_url.scheme()
            )));
        }
        if config.index.trim().is_empty() {
            return Err(KeywordError::InvalidEndpoint("index name must not be empty".to_string()));
        }

        let client = Client::builder()
            .build()
            .map_err(|e| KeywordError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            index: config.index,
            timeout: config.timeout,
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    /// Build `{base}/{segments...}` with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> KeywordResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| KeywordError::InvalidEndpoint(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn doc_url(&self, id: &str) -> KeywordResult<Url> {
        self.endpoint(&[self.index.as_str(), "_doc", id])
    }

    async fn execute(&self, request: RequestBuilder) -> KeywordResult<Response> {
        request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| KeywordError::Transport(e.to_string()))
    }

    async fn error_for(response: Response) -> KeywordError {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unable to read body>".to_string());
        KeywordError::HttpStatus { status, body }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> KeywordResult<T> {
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        response.json().await.map_err(|e| KeywordError::Decode(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct GetResponseBody {
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source")]
    source: Option<EmailDocument>,
}

#[derive(Debug, Deserialize)]
struct SearchResponseBody {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    total: SearchTotal,
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchTotal {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_score")]
    score: Option<f32>,
    #[serde(rename = "_source")]
    source: EmailDocument,
}

#[derive(Debug, Deserialize)]
struct BulkResponseBody {
    #[serde(default)]
    items: Vec<BulkItem>,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    delete: BulkItemResult,
}

#[derive(Debug, Deserialize)]
struct BulkItemResult {
    #[serde(rename = "_id")]
    id: String,
    status: u16,
    #[serde(default)]
    error: Option<Value>,
}

fn search_body(query: &KeywordQuery) -> Value {
    let must = if query.text.trim().is_empty() {
        json!([{ "match_all": {} }])
    } else {
        json!([{
            "multi_match": {
                "query": query.text,
                "fields": ["subject^2", "body", "from", "to"]
            }
        }])
    };

    let mut filter = Vec::new();
    if let Some(account_id) = &query.account_id {
        filter.push(json!({ "term": { "account_id.keyword": account_id } }));
    }
    if let Some(folder) = &query.folder {
        filter.push(json!({ "term": { "folder.keyword": folder } }));
    }
    if let Some(category) = &query.category {
        filter.push(json!({ "term": { "classification.category.keyword": category } }));
    }

    json!({
        "from": query.from,
        "size": query.size,
        "query": { "bool": { "must": must, "filter": filter } }
    })
}

fn bulk_delete_payload(index: &str, ids: &[String]) -> KeywordResult<String> {
    let mut payload = String::new();
    for id in ids {
        payload.push_str(&serde_json::to_string(&json!({ "delete": { "_index": index, "_id": id } }))?);
        payload.push('\n');
    }
    Ok(payload)
}

#[async_trait]
impl KeywordStore for ElasticsearchStore {
    async fn index(&self, document: &EmailDocument) -> KeywordResult<()> {
        let mut url = self.doc_url(&document.id)?;
        url.query_pairs_mut().append_pair("refresh", "wait_for");

        let response = self.execute(self.client.put(url).json(document)).await?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        debug!(email_id = %document.id, index = %self.index, "Document indexed");
        Ok(())
    }

    async fn get(&self, id: &str) -> KeywordResult<Option<EmailDocument>> {
        let response = self.execute(self.client.get(self.doc_url(id)?)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: GetResponseBody = Self::decode(response).await?;
        Ok(if body.found { body.source } else { None })
    }

    async fn delete(&self, id: &str) -> KeywordResult<bool> {
        let mut url = self.doc_url(id)?;
        url.query_pairs_mut().append_pair("refresh", "wait_for");

        let response = self.execute(self.client.delete(url)).await?;
        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(email_id = id, "Document already absent");
                Ok(true)
            }
            status if status.is_success() => Ok(true),
            _ => Err(Self::error_for(response).await),
        }
    }

    async fn bulk_delete(&self, ids: &[String]) -> KeywordResult<BulkDeleteReport> {
        if ids.is_empty() {
            return Ok(BulkDeleteReport::default());
        }

        let mut url = self.endpoint(&["_bulk"])?;
        url.query_pairs_mut().append_pair("refresh", "wait_for");
        let payload = bulk_delete_payload(&self.index, ids)?;

        let request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(payload);
        let body: BulkResponseBody = Self::decode(self.execute(request).await?).await?;

        let mut report = BulkDeleteReport::default();
        for item in body.items {
            let result = item.delete;
            if (200..300).contains(&result.status) || result.status == 404 {
                report.record_success();
            } else {
                let reason = result
                    .error
                    .map_or_else(|| format!("HTTP {}", result.status), |e| e.to_string());
                report.record_failure(result.id, reason);
            }
        }

        if !report.is_all_success() {
            warn!(
                failed = report.fail_count,
                succeeded = report.success_count,
                "Bulk delete partially failed"
            );
        }
        Ok(report)
    }

    async fn search(&self, query: &KeywordQuery) -> KeywordResult<KeywordSearchResponse> {
        if query.size == 0 {
            return Err(KeywordError::InvalidQuery("size must be positive".to_string()));
        }

        let url = self.endpoint(&[self.index.as_str(), "_search"])?;
        let request = self.client.post(url).json(&search_body(query));
        let body: SearchResponseBody = Self::decode(self.execute(request).await?).await?;

        let hits = body
            .hits
            .hits
            .into_iter()
            .map(|hit| KeywordHit {
                document: hit.source,
                score: hit.score.unwrap_or(0.0),
            })
            .collect();

        Ok(KeywordSearchResponse {
            total: body.hits.total.value,
            hits,
        })
    }

    fn backend_name(&self) -> &'static str {
        "elasticsearch"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn store(server: &MockServer) -> ElasticsearchStore {
        ElasticsearchStore::new(ElasticsearchConfig {
            url: server.base_url(),
            ..ElasticsearchConfig::default()
        })
        .unwrap()
    }

    fn source(id: &str) -> Value {
        serde_json::to_value(EmailDocument::new(id, "Invoice", "Please pay").with_account("acct-1")).unwrap()
    }

    #[test]
    fn rejects_bad_configuration() {
        assert!(matches!(
            ElasticsearchStore::new(ElasticsearchConfig {
                url: "nope".to_string(),
                ..ElasticsearchConfig::default()
            }),
            Err(KeywordError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            ElasticsearchStore::new(ElasticsearchConfig::default().with_index(" ")),
            Err(KeywordError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn document_ids_are_path_encoded() {
        let store = ElasticsearchStore::new(ElasticsearchConfig::default()).unwrap();
        let url = store.doc_url("<abc@mail/1>").unwrap();
        assert_eq!(url.path(), "/emails/_doc/%3Cabc@mail%2F1%3E");
    }

    #[test]
    fn search_body_applies_filters() {
        let body = search_body(&KeywordQuery::new("invoice").with_account("acct-1").with_category("Spam"));
        let filter = &body["query"]["bool"]["filter"];
        assert_eq!(filter[0]["term"]["account_id.keyword"], "acct-1");
        assert_eq!(filter[1]["term"]["classification.category.keyword"], "Spam");
        assert_eq!(body["size"], 10);
    }

    #[test]
    fn empty_text_searches_everything() {
        let body = search_body(&KeywordQuery::match_all());
        assert!(body["query"]["bool"]["must"][0].get("match_all").is_some());
    }

    #[tokio::test]
    async fn index_puts_document_with_refresh() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/emails/_doc/e-1")
                    .query_param("refresh", "wait_for");
                then.status(201).json_body(json!({"result": "created"}));
            })
            .await;

        store(&server)
            .index(&EmailDocument::new("e-1", "Invoice", "Please pay"))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn index_surfaces_http_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/emails/_doc/e-1");
                then.status(429).body("too many requests");
            })
            .await;

        let err = store(&server)
            .index(&EmailDocument::new("e-1", "Invoice", "Please pay"))
            .await
            .unwrap_err();

        assert!(matches!(err, KeywordError::HttpStatus { status: 429, .. }));
    }

    #[tokio::test]
    async fn get_returns_none_on_404() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/emails/_doc/missing");
                then.status(404).json_body(json!({"found": false}));
            })
            .await;

        assert_eq!(store(&server).get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_parses_source() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/emails/_doc/e-1");
                then.status(200).json_body(json!({
                    "_index": "emails",
                    "_id": "e-1",
                    "found": true,
                    "_source": source("e-1")
                }));
            })
            .await;

        let doc = store(&server).get("e-1").await.unwrap().unwrap();
        assert_eq!(doc.subject, "Invoice");
        assert_eq!(doc.account_id, "acct-1");
    }

    #[tokio::test]
    async fn delete_treats_404_as_deleted() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/emails/_doc/gone");
                then.status(404).json_body(json!({"result": "not_found"}));
            })
            .await;

        assert_eq!(store(&server).delete("gone").await, Ok(true));
    }

    #[test]
    fn bulk_payload_is_one_action_per_line() {
        let payload = bulk_delete_payload("emails", &["a".to_string(), "b".to_string()]).unwrap();
        let lines: Vec<Value> = payload
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert!(payload.ends_with('\n'));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["delete"]["_id"], "b");
        assert_eq!(lines[1]["delete"]["_index"], "emails");
    }

    #[tokio::test]
    async fn bulk_delete_sends_ndjson_and_reads_items() {
        let ids = ["a".to_string(), "b".to_string(), "c".to_string()];
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/_bulk")
                    .header("content-type", "application/x-ndjson")
                    .body(bulk_delete_payload("emails", &ids).unwrap());
                then.status(200).json_body(json!({
                    "errors": true,
                    "items": [
                        {"delete": {"_id": "a", "status": 200}},
                        {"delete": {"_id": "b", "status": 404}},
                        {"delete": {"_id": "c", "status": 409, "error": {"type": "version_conflict_engine_exception"}}}
                    ]
                }));
            })
            .await;

        let report = store(&server).bulk_delete(&ids).await.unwrap();

        mock.assert_async().await;
        assert_eq!(report.success_count, 2);
        assert_eq!(report.fail_count, 1);
        assert_eq!(report.per_id_errors[0].0, "c");
        assert!(report.per_id_errors[0].1.contains("version_conflict"));
    }

    #[tokio::test]
    async fn search_reads_total_and_hits() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/emails/_search");
                then.status(200).json_body(json!({
                    "hits": {
                        "total": {"value": 42, "relation": "eq"},
                        "hits": [
                            {"_id": "e-1", "_score": 3.5, "_source": source("e-1")},
                            {"_id": "e-2", "_score": null, "_source": source("e-2")}
                        ]
                    }
                }));
            })
            .await;

        let response = store(&server).search(&KeywordQuery::new("invoice")).await.unwrap();

        assert_eq!(response.total, 42);
        assert_eq!(response.hits.len(), 2);
        assert!((response.hits[0].score - 3.5).abs() < f32::EPSILON);
        assert_eq!(response.hits[1].score, 0.0);
    }

    #[tokio::test]
    async fn search_rejects_zero_size() {
        let store = ElasticsearchStore::new(ElasticsearchConfig::default()).unwrap();
        let err = store
            .search(&KeywordQuery::new("x").with_size(0))
            .await
            .unwrap_err();
        assert!(matches!(err, KeywordError::InvalidQuery(_)));
    }
}
