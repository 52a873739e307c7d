//! HTTP-level tests for the query API.

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use std::future::IntoFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ragquery::{
    build_router, ApiConfig, AppState, Candidate, Embedder, Embedding, Error, FlatIndex,
    IndexEntry, MemoryStore, QueryLimits, QueryService, Record, RecordId, RecordStore, Result,
    Retriever, VectorIndex,
};

/// Returns the query vector registered for a prompt, or the origin.
struct LookupEmbedder {
    calls: AtomicUsize,
}

#[async_trait]
impl Embedder for LookupEmbedder {
    fn dimension(&self) -> usize {
        2
    }

    async fn encode(&self, text: &str) -> Result<Embedding> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match text {
            "find red shoes" => Ok(vec![0.0, 0.0]),
            "fail embedding" => Err(Error::Embedding("onnx runtime crashed at 0xdeadbeef".into())),
            _ => Ok(vec![10.0, 10.0]),
        }
    }
}

/// Counts lookups and delegates to an in-memory store.
struct CountingStore {
    inner: MemoryStore,
    calls: AtomicUsize,
    requested: AtomicUsize,
}

#[async_trait]
impl RecordStore for CountingStore {
    async fn fetch_many(&self, ids: &[RecordId]) -> Result<Vec<Record>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.fetch_add(ids.len(), Ordering::SeqCst);
        let mut records = self.inner.fetch_many(ids).await?;
        // The store makes no ordering promise.
        records.reverse();
        Ok(records)
    }
}

/// Always unavailable.
struct DownIndex;

#[async_trait]
impl VectorIndex for DownIndex {
    fn dimension(&self) -> usize {
        2
    }

    async fn search(&self, _vector: &[f32], _k: usize) -> Result<Vec<Candidate>> {
        Err(Error::IndexQuery("connection reset by 10.0.0.12:6334".into()))
    }
}

struct Harness {
    server: TestServer,
    embedder: Arc<LookupEmbedder>,
    store: Arc<CountingStore>,
}

fn corpus_index() -> FlatIndex {
    let entry = |id: u64, x: f32, y: f32| IndexEntry {
        id: RecordId::from(id),
        vector: vec![x, y],
    };
    FlatIndex::new(
        2,
        vec![
            entry(7, 0.2, 0.2),
            entry(42, 0.1, 0.1),
            entry(99, 3.0, 3.0),
            entry(5, 9.0, 9.0),
        ],
    )
    .unwrap()
}

fn corpus_store() -> MemoryStore {
    MemoryStore::from_records(vec![
        Record::from_json(json!({ "id": 42, "description": "Red running shoes", "price": 80 }))
            .unwrap(),
        Record::from_json(json!({ "id": 7, "description": "Red sandals", "price": 25 })).unwrap(),
        Record::from_json(json!({ "id": 99, "description": "Green boots", "price": 120 }))
            .unwrap(),
        // 5 is indexed but has no record.
    ])
}

fn harness_with_index(index: Arc<dyn VectorIndex>) -> Harness {
    let embedder = Arc::new(LookupEmbedder {
        calls: AtomicUsize::new(0),
    });
    let store = Arc::new(CountingStore {
        inner: corpus_store(),
        calls: AtomicUsize::new(0),
        requested: AtomicUsize::new(0),
    });
    let retriever = Retriever::new(embedder.clone(), index, store.clone());
    let service = QueryService::new(retriever, QueryLimits::default());
    let router = build_router(AppState::new(service), &ApiConfig::default());

    Harness {
        server: TestServer::new(router).unwrap(),
        embedder,
        store,
    }
}

fn harness() -> Harness {
    harness_with_index(Arc::new(corpus_index()))
}

#[tokio::test]
async fn test_query_returns_ranked_records() {
    let h = harness();

    let response = h
        .server
        .post("/query")
        .json(&json!({ "prompt": "find red shoes", "top_k": 2 }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["query"], "find red shoes");
    assert_eq!(
        body["retrieved"],
        json!([
            { "id": 42, "description": "Red running shoes", "price": 80 },
            { "id": 7, "description": "Red sandals", "price": 25 }
        ])
    );
    assert_eq!(
        body["response"],
        "Query: find red shoes\n\nRetrieved Information:\nRed running shoes\nRed sandals\n\n\
         Summary: Based on the retrieved data, here are the relevant insights."
    );
    assert_eq!(h.store.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_default_top_k_and_missing_records() {
    let h = harness();

    let response = h
        .server
        .post("/query")
        .json(&json!({ "prompt": "find red shoes" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let ids: Vec<i64> = body["retrieved"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    // Four indexed vectors, record 5 unresolved.
    assert_eq!(ids, vec![42, 7, 99]);
    assert_eq!(h.store.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.requested.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_missing_prompt_is_bad_request() {
    let h = harness();

    for body in [json!({}), json!({ "prompt": "" }), json!({ "prompt": "  " })] {
        let response = h.server.post("/query").json(&body).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "Prompt is required");
    }

    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_top_k_is_bad_request() {
    let h = harness();

    let response = h
        .server
        .post("/query")
        .json(&json!({ "prompt": "find red shoes", "top_k": -1 }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("top_k"));
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let h = harness();

    let response = h.server.post("/query").text("{\"prompt\": ").await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_collaborator_failures_are_generic() {
    let h = harness();
    let response = h
        .server
        .post("/query")
        .json(&json!({ "prompt": "fail embedding" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["kind"], "embedding_error");
    assert!(!body.to_string().contains("deadbeef"));

    let h = harness_with_index(Arc::new(DownIndex));
    let response = h
        .server
        .post("/query")
        .json(&json!({ "prompt": "find red shoes" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["kind"], "index_query_error");
    assert!(!body.to_string().contains("10.0.0.12"));
    assert_eq!(h.store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_identical_requests_are_byte_identical() {
    let h = harness();
    let request = json!({ "prompt": "find red shoes", "top_k": 3 });

    let first = h.server.post("/query").json(&request).await.text();
    let second = h.server.post("/query").json(&request).await.text();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_concurrent_requests_are_independent() {
    let h = harness();

    let requests = (0..8).map(|i| {
        let prompt = if i % 2 == 0 { "find red shoes" } else { "" };
        h.server
            .post("/query")
            .json(&json!({ "prompt": prompt, "top_k": 2 }))
            .into_future()
    });
    let responses = futures::future::join_all(requests).await;

    for (i, response) in responses.iter().enumerate() {
        let expected = if i % 2 == 0 {
            StatusCode::OK
        } else {
            StatusCode::BAD_REQUEST
        };
        assert_eq!(response.status_code(), expected);
    }
    assert_eq!(h.store.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_health_endpoint() {
    let h = harness();

    let response = h.server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_metrics_absent_without_recorder() {
    let h = harness();
    let response = h.server.get("/metrics").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
