//! End-to-end tests for the compatibility adapter over HTTP backends

use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use onebox_core::EmailDocument;
use onebox_indexing::prelude::*;
use onebox_indexing::{AdapterMode, ROLLBACK_MARKER};
use onebox_keyword::{ElasticsearchConfig, ElasticsearchStore, InMemoryKeywordStore, KeywordStore};
use onebox_vector::{HttpVectorClient, InMemoryVectorClient};
use serde_json::json;

fn config() -> IndexingConfig {
    IndexingConfig::default()
        .with_retry_delay(Duration::from_millis(1))
        .with_chunk_pause(Duration::ZERO)
}

fn invoice() -> EmailDocument {
    EmailDocument::new("e-1", "Invoice 2041", "Please find the March invoice attached")
        .with_account("acct-1")
        .with_folder("INBOX")
}

fn elasticsearch(server: &MockServer) -> Arc<dyn KeywordStore> {
    let store = ElasticsearchStore::new(ElasticsearchConfig {
        url: server.base_url(),
        ..ElasticsearchConfig::default()
    })
    .unwrap();
    Arc::new(store)
}

#[tokio::test]
async fn enabling_against_healthy_service_turns_on_vector_search() {
    let vector_service = MockServer::start_async().await;
    let probe = vector_service
        .mock_async(|when, then| {
            when.method(GET).path("/search").query_param("n_results", "1");
            then.status(200).json_body(json!({"success": true, "results": []}));
        })
        .await;

    let adapter = CompatibilityAdapter::new(
        Arc::new(InMemoryKeywordStore::new()),
        Arc::new(InMemoryVectorClient::new()),
        config(),
        Some(false),
    )
    .unwrap();
    assert!(!adapter.capabilities().vector_search);

    let enabled = adapter
        .enable_dual_indexing(config().with_vector_endpoint(vector_service.base_url()))
        .await;

    assert!(enabled);
    assert!(adapter.capabilities().vector_search);
    assert_eq!(adapter.mode(), AdapterMode::Dual);
    probe.assert_async().await;
}

#[tokio::test]
async fn enabling_against_unreachable_service_changes_nothing() {
    let adapter = CompatibilityAdapter::keyword_only(Arc::new(InMemoryKeywordStore::new())).unwrap();
    let before = adapter.capabilities();

    let enabled = adapter
        .enable_dual_indexing(config().with_vector_endpoint("http://127.0.0.1:1"))
        .await;

    assert!(!enabled);
    assert_eq!(adapter.capabilities(), before);
    assert!(!adapter.capabilities().vector_search);
}

#[tokio::test]
async fn writes_reach_both_services() {
    let es = MockServer::start_async().await;
    let vector_service = MockServer::start_async().await;
    let put = es
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/emails/_doc/e-1")
                .query_param("refresh", "wait_for");
            then.status(201).json_body(json!({"result": "created"}));
        })
        .await;
    let add = vector_service
        .mock_async(|when, then| {
            when.method(POST)
                .path("/add_email")
                .json_body(json!({
                    "email_id": "e-1",
                    "content": "Invoice 2041\n\nPlease find the March invoice attached"
                }));
            then.status(200).json_body(json!({"success": true, "email_id": "e-1"}));
        })
        .await;

    let adapter = CompatibilityAdapter::new(
        elasticsearch(&es),
        Arc::new(HttpVectorClient::new(vector_service.base_url()).unwrap()),
        config(),
        Some(true),
    )
    .unwrap();

    let result = adapter.index_email(&invoice()).await.unwrap();

    assert!(result.success, "{:?}", result.errors);
    put.assert_async().await;
    add.assert_async().await;
    assert_eq!(adapter.stats().service.total_indexed, 1);
}

#[tokio::test]
async fn rejected_vector_write_is_retried_then_rolled_back() {
    let es = MockServer::start_async().await;
    let vector_service = MockServer::start_async().await;
    es.mock_async(|when, then| {
        when.method(PUT).path("/emails/_doc/e-1");
        then.status(201).json_body(json!({"result": "created"}));
    })
    .await;
    let rollback = es
        .mock_async(|when, then| {
            when.method(DELETE).path("/emails/_doc/e-1");
            then.status(200).json_body(json!({"result": "deleted"}));
        })
        .await;
    let add = vector_service
        .mock_async(|when, then| {
            when.method(POST).path("/add_email");
            then.status(200).json_body(json!({
                "success": false,
                "email_id": "e-1",
                "error": "embedding model unavailable"
            }));
        })
        .await;

    let adapter = CompatibilityAdapter::new(
        elasticsearch(&es),
        Arc::new(HttpVectorClient::new(vector_service.base_url()).unwrap()),
        config().with_max_retries(3),
        Some(true),
    )
    .unwrap();

    let result = adapter.index_email(&invoice()).await.unwrap();

    assert!(!result.success);
    assert!(result.rolled_back);
    assert!(result
        .errors
        .iter()
        .any(|e| e.starts_with("vector add failed") && e.contains("embedding model unavailable")));
    assert!(result.errors.iter().any(|e| e == ROLLBACK_MARKER));
    add.assert_hits_async(3).await;
    rollback.assert_async().await;

    let stats = adapter.stats().service;
    assert_eq!(stats.rollbacks, 1);
    assert_eq!(stats.vector_errors, 1);
}

#[tokio::test]
async fn semantic_search_goes_through_the_service() {
    let vector_service = MockServer::start_async().await;
    vector_service
        .mock_async(|when, then| {
            when.method(GET)
                .path("/search")
                .query_param("q", "march invoice")
                .query_param("n_results", "5");
            then.status(200).json_body(json!({
                "success": true,
                "results": [
                    {"email_id": "e-1", "content": "Invoice 2041", "score": 0.12},
                    {"email_id": "e-7", "content": "Invoice reminder", "score": 0.4}
                ]
            }));
        })
        .await;

    let adapter = CompatibilityAdapter::new(
        Arc::new(InMemoryKeywordStore::new()),
        Arc::new(HttpVectorClient::new(vector_service.base_url()).unwrap()),
        config(),
        Some(true),
    )
    .unwrap();

    let hits = adapter.semantic_search("march invoice", 5).await.unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].email_id, "e-1");
    assert!(hits[0].similarity() > hits[1].similarity());
}

#[tokio::test]
async fn disabling_keeps_keyword_reads_working() {
    let keyword = Arc::new(InMemoryKeywordStore::new());
    let adapter = CompatibilityAdapter::new(
        keyword.clone(),
        Arc::new(InMemoryVectorClient::new()),
        config(),
        Some(true),
    )
    .unwrap();
    adapter.index_email(&invoice()).await.unwrap();

    adapter.disable_dual_indexing();

    assert_eq!(adapter.get_email("e-1").await.unwrap(), Some(invoice()));
    let health = adapter.health_check().await;
    assert!(health.overall);
    assert!(!adapter.capabilities().hybrid_search);
}
