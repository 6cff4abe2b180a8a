//! HTTP surface tests
//!
//! Serves the gateway router on an ephemeral port over in-process nodes and
//! drives it with reqwest.
//! Run with: cargo test --test http_api_tests -p ecstore-gateway

use ecstore_core::placement::FragmentId;
use ecstore_core::EcStoreError;
use ecstore_gateway::{http_api, AppState, FragmentNode, GatewayConfig, LocalNode, NodeRegistry};
use ecstore_storage::MemoryChunkStore;
use futures::future::BoxFuture;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Node that rejects every call
struct DownNode(String);

impl FragmentNode for DownNode {
    fn address(&self) -> &str {
        &self.0
    }

    fn store(&self, _id: FragmentId, _data: bytes::Bytes) -> BoxFuture<'_, ecstore_core::Result<()>> {
        Box::pin(async move { Err(EcStoreError::Unreachable(self.0.clone())) })
    }

    fn fetch(&self, _id: FragmentId) -> BoxFuture<'_, ecstore_core::Result<Option<bytes::Bytes>>> {
        Box::pin(async move { Err(EcStoreError::Unreachable(self.0.clone())) })
    }
}

fn memory_registry(labels: &[&str]) -> NodeRegistry {
    NodeRegistry::new(
        labels
            .iter()
            .map(|label| {
                Arc::new(LocalNode::new(*label, Arc::new(MemoryChunkStore::new())))
                    as Arc<dyn FragmentNode>
            })
            .collect(),
    )
}

/// Serve the gateway and return its base URL
async fn spawn_gateway(registry: NodeRegistry) -> String {
    let config = GatewayConfig::default().with_rpc_timeout(Duration::from_millis(200));
    let state = Arc::new(AppState::with_registry(config, registry).unwrap());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, http_api::app(state)).await.unwrap();
    });

    format!("http://{}", addr)
}

fn file_form(name: &str, data: &'static [u8]) -> Form {
    Form::new().part("file", Part::bytes(data).file_name(name.to_string()))
}

#[tokio::test]
async fn test_upload_then_download() {
    let base = spawn_gateway(memory_registry(&["n1", "n2", "n3"])).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/upload", base))
        .multipart(file_form("hello.txt", b"hello world!"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "File uploaded successfully");
    assert_eq!(body["filename"], "hello.txt");
    assert_eq!(body["size"], 12);
    assert_eq!(body["fragments_stored"], 6);
    assert_eq!(body["fragments_failed"], 0);
    assert_eq!(body["degraded"], false);

    let resp = client
        .get(format!("{}/download/hello.txt", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()["content-disposition"],
        "attachment; filename=hello.txt"
    );
    assert_eq!(resp.headers()["content-type"], "application/octet-stream");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"hello world!");

    let objects: Value = client
        .get(format!("{}/objects", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(objects[0]["name"], "hello.txt");
    assert_eq!(objects[0]["size"], 12);
    assert_eq!(objects[0]["node_count"], 3);
}

#[tokio::test]
async fn test_download_unknown_file() {
    let base = spawn_gateway(memory_registry(&["n1", "n2", "n3"])).await;

    let resp = reqwest::get(format!("{}/download/nope.bin", base)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "File not found in metadata");
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let base = spawn_gateway(memory_registry(&["n1"])).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/upload", base))
        .multipart(Form::new().text("comment", "no file here"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "No file provided");
}

#[tokio::test]
async fn test_upload_empty_file() {
    let base = spawn_gateway(memory_registry(&["n1"])).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/upload", base))
        .multipart(file_form("empty.txt", b""))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_all_nodes_down() {
    let registry = NodeRegistry::new(
        (1..=3)
            .map(|i| Arc::new(DownNode(format!("localhost:900{}", i))) as Arc<dyn FragmentNode>)
            .collect(),
    );
    let base = spawn_gateway(registry).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/upload", base))
        .multipart(file_form("lost.txt", b"hello world!"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["fragments_stored"], 0);
    assert_eq!(body["fragments_failed"], 6);
    assert_eq!(body["degraded"], true);

    let resp = client
        .get(format!("{}/download/lost.txt", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "File corrupted. Too many nodes down.");
    assert!(body["details"].as_str().unwrap().contains("6 fragments missing"));
}

#[tokio::test]
async fn test_status_probes_nodes() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let alive = listener.local_addr().unwrap().to_string();
    let base = spawn_gateway(memory_registry(&[alive.as_str(), "127.0.0.1:1"])).await;

    let statuses: Value = reqwest::get(format!("{}/status", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(statuses[0]["id"], 1);
    assert_eq!(statuses[0]["name"], "Storage-1");
    assert_eq!(statuses[0]["status"], "alive");
    assert_eq!(statuses[1]["name"], "Storage-2");
    assert_eq!(statuses[1]["status"], "dead");
}

#[tokio::test]
async fn test_health_and_version() {
    let base = spawn_gateway(memory_registry(&["n1"])).await;

    let health = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(health.text().await.unwrap(), "OK");

    let version = reqwest::get(format!("{}/version", base)).await.unwrap();
    assert!(version.text().await.unwrap().starts_with("ecstore-gateway/"));
}
