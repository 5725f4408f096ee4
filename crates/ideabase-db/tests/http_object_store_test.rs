//! HTTP object store against a mock storage service.

use ideabase_db::{Error, HttpObjectStore, HttpStoreConfig, StorageBackend};
use wiremock::matchers::{body_bytes, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "3f1e0c9a-0000-4000-8000-000000000000/5d2b.pdf";
const OBJECT_PATH: &str =
    "/storage/v1/object/attachments/3f1e0c9a-0000-4000-8000-000000000000/5d2b.pdf";

fn store(server: &MockServer) -> HttpObjectStore {
    HttpObjectStore::new(HttpStoreConfig::new(
        server.uri(),
        "service-key",
        "attachments",
    ))
    .expect("Failed to create store")
}

#[tokio::test]
async fn test_put_sends_credentials_and_no_upsert() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(OBJECT_PATH))
        .and(header("authorization", "Bearer service-key"))
        .and(header("apikey", "service-key"))
        .and(header("content-type", "application/pdf"))
        .and(header("x-upsert", "false"))
        .and(body_bytes(b"%PDF-1.7".to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Key": format!("attachments/{}", KEY)
        })))
        .expect(1)
        .mount(&server)
        .await;

    store(&server)
        .put(KEY, b"%PDF-1.7", "application/pdf", false)
        .await
        .expect("put should succeed");
}

#[tokio::test]
async fn test_put_conflict_maps_to_object_exists() {
    let server = MockServer::start().await;

    // The store reports duplicates as 400 with an embedded 409.
    Mock::given(method("POST"))
        .and(path(OBJECT_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "statusCode": "409",
            "error": "Duplicate",
            "message": "The resource already exists"
        })))
        .mount(&server)
        .await;

    let err = store(&server)
        .put(KEY, b"x", "application/pdf", false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ObjectExists(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_put_server_error_maps_to_storage_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(OBJECT_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("bucket offline"))
        .mount(&server)
        .await;

    let err = store(&server)
        .put(KEY, b"x", "application/pdf", false)
        .await
        .unwrap_err();
    match err {
        Error::Storage(msg) => assert!(msg.contains("bucket offline")),
        other => panic!("expected storage error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_returns_bytes_and_maps_missing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(OBJECT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/storage/v1/object/attachments/u1/missing.pdf"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "statusCode": "404",
            "error": "not_found"
        })))
        .mount(&server)
        .await;

    let store = store(&server);
    assert_eq!(store.get(KEY).await.unwrap(), b"%PDF-1.7");
    assert!(matches!(
        store.get("u1/missing.pdf").await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_tolerates_missing_object() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(OBJECT_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    store(&server).delete(KEY).await.expect("missing is fine");
}

#[tokio::test]
async fn test_exists_uses_head() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path(OBJECT_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let store = store(&server);
    assert!(store.exists(KEY).await.unwrap());
    assert!(!store.exists("u1/other.pdf").await.unwrap());
}

#[tokio::test]
async fn test_traversal_keys_never_reach_the_network() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = store(&server)
        .put("../escape.pdf", b"x", "application/pdf", false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}
