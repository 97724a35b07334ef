//! HTTP tests for the reference endpoints.
//!
//! Requests go through the full router (middleware included) with
//! `tower::ServiceExt::oneshot`, backed by the in-memory stores.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use refshelf_api::{router, AppState};
use refshelf_db::{MemoryBlobStore, MemoryStore};
use refshelf_ingest::{
    BlobStore, CollectionDirectory, IngestConfig, IngestStores, NewOrphan, OrphanLog, OrphanReason,
    ReferenceAssembler, StaticRenderer,
};

const PNG: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13, b'I', b'H', b'D', b'R', 0, 0, 0,
    1, 0, 0, 0, 1, 8, 2, 0, 0, 0, 0x90, 0x77, 0x53, 0xDE,
];

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

struct TestApp {
    app: Router,
    store: MemoryStore,
    blobs: MemoryBlobStore,
}

async fn test_app() -> TestApp {
    let store = MemoryStore::new();
    let blobs = MemoryBlobStore::new();
    store
        .insert("Papers", Uuid::new_v4())
        .await
        .expect("Failed to create collection");

    let stores = IngestStores::in_memory(
        store.clone(),
        blobs.clone(),
        Arc::new(StaticRenderer::new(b"preview".to_vec())),
    );
    let assembler = ReferenceAssembler::new(stores, IngestConfig::default());
    TestApp {
        app: router(AppState::new(assembler)),
        store,
        blobs,
    }
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn survey_body() -> Value {
    json!({
        "collectionName": "Papers",
        "title": "Survey",
        "memo": "read later",
        "keywords": "nlp transformers",
        "files": [
            { "fileType": "link", "originalName": "https://arxiv.org/abs/1" },
            { "fileType": "image", "imageList": [STANDARD.encode(PNG)] }
        ]
    })
}

async fn create_survey(app: &Router) -> String {
    let (status, body) = send(app, Method::POST, "/references", Some(survey_body())).await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", body);
    body["reference"]["id"].as_str().unwrap().to_string()
}

// ============================================================================
// CREATE
// ============================================================================

#[tokio::test]
async fn test_create_returns_201_with_reference() {
    let t = test_app().await;
    let (status, body) = send(&t.app, Method::POST, "/references", Some(survey_body())).await;

    assert_eq!(status, StatusCode::CREATED);
    let reference = &body["reference"];
    assert_eq!(reference["title"], "Survey");
    assert_eq!(reference["collectionName"], "Papers");
    assert_eq!(reference["keywords"], json!(["nlp", "transformers"]));

    let attachments = reference["attachments"].as_array().unwrap();
    assert_eq!(attachments.len(), 2);
    assert_eq!(attachments[0]["fileType"], "link");
    assert_eq!(attachments[0]["url"], "https://arxiv.org/abs/1");
    assert_eq!(attachments[1]["fileType"], "image");
    assert_eq!(attachments[1]["storedPath"], "Papers/Survey");
    assert_eq!(attachments[1]["sourceImages"], json!(["Papers/Survey/0.png"]));
    assert!(t.blobs.get("Papers/Survey/0.png").is_some());
}

#[tokio::test]
async fn test_create_rejects_ftp_link_with_400() {
    let t = test_app().await;
    let (status, body) = send(
        &t.app,
        Method::POST,
        "/references",
        Some(json!({
            "collectionName": "Papers",
            "title": "Bad",
            "files": [{ "fileType": "link", "originalName": "ftp://example.com/x" }]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["stage"], "validating");
    assert!(body["error"].as_str().unwrap().contains("invalid link format"));
    assert_eq!(t.store.reference_count(), 0);
}

#[tokio::test]
async fn test_create_missing_title_is_400() {
    let t = test_app().await;
    let (status, body) = send(
        &t.app,
        Method::POST,
        "/references",
        Some(json!({
            "collectionName": "Papers",
            "files": [{ "fileType": "link", "originalName": "https://example.com" }]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("title"));
}

#[tokio::test]
async fn test_create_unknown_collection_is_404() {
    let t = test_app().await;
    let mut body = survey_body();
    body["collectionName"] = json!("Nowhere");
    let (status, body) = send(&t.app, Method::POST, "/references", Some(body)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["stage"], "collection_resolved");
    assert_eq!(t.store.reference_count(), 0);
}

#[tokio::test]
async fn test_create_write_failure_is_500_without_paths() {
    let t = test_app().await;
    t.blobs.fail_puts_containing("Papers/Survey");
    let (status, body) = send(&t.app, Method::POST, "/references", Some(survey_body())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
    assert_eq!(body["stage"], "attachments_processing");
    assert_eq!(t.store.reference_count(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let t = test_app().await;
    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/references")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_response_carries_request_id() {
    let t = test_app().await;
    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let id = response
        .headers()
        .get("x-request-id")
        .expect("request id header")
        .to_str()
        .unwrap();
    assert!(Uuid::parse_str(id).is_ok());
}

// ============================================================================
// READ / UPDATE / DELETE
// ============================================================================

#[tokio::test]
async fn test_repeated_get_is_identical() {
    let t = test_app().await;
    let id = create_survey(&t.app).await;

    let uri = format!("/references/{}", id);
    let (first_status, first) = send(&t.app, Method::GET, &uri, None).await;
    let (_, second) = send(&t.app, Method::GET, &uri, None).await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(first, second);
    assert_eq!(first["keywords"], json!(["nlp", "transformers"]));
}

#[tokio::test]
async fn test_get_unknown_reference_is_404() {
    let t = test_app().await;
    let (status, _) = send(
        &t.app,
        Method::GET,
        &format!("/references/{}", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_with_malformed_id_is_400() {
    let t = test_app().await;
    let (status, _) = send(&t.app, Method::GET, "/references/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patch_updates_only_given_fields() {
    let t = test_app().await;
    let id = create_survey(&t.app).await;

    let (status, body) = send(
        &t.app,
        Method::PATCH,
        &format!("/references/{}", id),
        Some(json!({ "title": "Survey, revised" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let reference = &body["reference"];
    assert_eq!(reference["title"], "Survey, revised");
    assert_eq!(reference["memo"], "read later");
    assert_eq!(reference["attachments"].as_array().unwrap().len(), 2);
    assert_eq!(reference["keywords"], json!(["nlp", "transformers"]));
}

#[tokio::test]
async fn test_patch_unknown_reference_is_404() {
    let t = test_app().await;
    let (status, _) = send(
        &t.app,
        Method::PATCH,
        &format!("/references/{}", Uuid::new_v4()),
        Some(json!({ "title": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_returns_204_then_404() {
    let t = test_app().await;
    let id = create_survey(&t.app).await;
    let uri = format!("/references/{}", id);

    let (status, _) = send(&t.app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(t.blobs.paths().is_empty());

    let (status, _) = send(&t.app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&t.app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// KEYWORDS / MAINTENANCE / HEALTH
// ============================================================================

#[tokio::test]
async fn test_keywords_are_listed_by_text() {
    let t = test_app().await;
    create_survey(&t.app).await;

    let (status, body) = send(&t.app, Method::GET, "/keywords", None).await;
    assert_eq!(status, StatusCode::OK);
    let texts: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|k| k["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["nlp", "transformers"]);
}

#[tokio::test]
async fn test_sweep_deletes_logged_orphans() {
    let t = test_app().await;
    t.blobs.put("Papers/files/old.pdf", b"%PDF").await.unwrap();
    t.store
        .record(vec![NewOrphan {
            path: "Papers/files/old.pdf".to_string(),
            reason: OrphanReason::ReplacedOnUpdate,
            reference_id: None,
        }])
        .await
        .unwrap();

    let (status, body) = send(&t.app, Method::POST, "/maintenance/orphans/sweep", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "swept": 1, "failed": 0 }));
    assert!(t.blobs.get("Papers/files/old.pdf").is_none());

    let (_, body) = send(&t.app, Method::POST, "/maintenance/orphans/sweep", None).await;
    assert_eq!(body, json!({ "swept": 0, "failed": 0 }));
}

#[tokio::test]
async fn test_sweep_rejects_bad_limit() {
    let t = test_app().await;
    let (status, _) = send(
        &t.app,
        Method::POST,
        "/maintenance/orphans/sweep?limit=0",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health() {
    let t = test_app().await;
    let (status, body) = send(&t.app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}
