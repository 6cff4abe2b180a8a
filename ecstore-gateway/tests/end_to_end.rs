//! End-to-end tests over real gRPC storage nodes
//!
//! file → encode → store on nodes → node loss → fetch → reconstruct → file
//!
//! Run with: cargo test --test end_to_end -p ecstore-gateway

use bytes::Bytes;
use ecstore_core::EcStoreError;
use ecstore_gateway::{AppState, GatewayConfig};
use ecstore_network::{start_server_with_shutdown, GrpcServerConfig};
use ecstore_storage::{ChunkStore, MemoryChunkStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;

struct TestNode {
    store: Arc<MemoryChunkStore>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestNode {
    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = tokio::time::timeout(Duration::from_secs(5), self.handle).await;
    }
}

async fn start_node(port: u16) -> TestNode {
    let store = Arc::new(MemoryChunkStore::new());
    let served: Arc<dyn ChunkStore> = store.clone();
    let addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let shutdown = async {
            let _ = rx.await;
        };
        if let Err(e) = start_server_with_shutdown(
            GrpcServerConfig::new(addr),
            served,
            format!("e2e-node-{}", port),
            shutdown,
        )
        .await
        {
            eprintln!("Server error: {}", e);
        }
    });

    TestNode {
        store,
        shutdown: Some(tx),
        handle,
    }
}

async fn start_cluster(ports: &[u16]) -> (Vec<TestNode>, AppState) {
    let mut nodes = Vec::new();
    for port in ports {
        nodes.push(start_node(*port).await);
    }
    sleep(Duration::from_millis(200)).await;

    let config = GatewayConfig::default()
        .with_nodes(ports.iter().map(|p| format!("127.0.0.1:{}", p)).collect::<Vec<_>>())
        .with_rpc_timeout(Duration::from_secs(2));
    let state = AppState::new(config).unwrap();
    (nodes, state)
}

fn sample_file(size: usize) -> Bytes {
    (0..size).map(|i| (i * 31 % 251) as u8).collect::<Vec<_>>().into()
}

#[tokio::test]
async fn test_round_trip_over_grpc() {
    let (nodes, state) = start_cluster(&[50400, 50401, 50402]).await;
    let payload = sample_file(64 * 1024 + 7);

    let report = state.uploads().upload("data.bin", payload.clone()).await.unwrap();
    assert_eq!(report.stored, 6);
    assert!(!report.is_degraded());

    // fragment i lands on node i % 3
    assert_eq!(nodes[0].store.stats().unwrap().fragment_count, 2);
    assert_eq!(nodes[1].store.stats().unwrap().fragment_count, 2);
    assert_eq!(nodes[2].store.stats().unwrap().fragment_count, 2);

    let mut out = Vec::new();
    let download = state.downloads().download("data.bin", &mut out).await.unwrap();
    assert_eq!(out, payload.to_vec());
    assert!(download.missing.is_empty());
    assert!(!download.reconstructed);

    for node in nodes {
        node.stop().await;
    }
}

#[tokio::test]
async fn test_survives_one_node_loss() {
    let (mut nodes, state) = start_cluster(&[50410, 50411, 50412]).await;
    let payload = sample_file(10_000);

    state.uploads().upload("survivor.bin", payload.clone()).await.unwrap();

    nodes.remove(1).stop().await;

    let mut out = Vec::new();
    let download = state
        .downloads()
        .download("survivor.bin", &mut out)
        .await
        .unwrap();
    assert_eq!(out, payload.to_vec());
    assert_eq!(download.missing, vec![1, 4]);
    assert!(download.reconstructed);

    for node in nodes {
        node.stop().await;
    }
}

#[tokio::test]
async fn test_two_node_loss_is_unrecoverable() {
    let (mut nodes, state) = start_cluster(&[50420, 50421, 50422]).await;

    state
        .uploads()
        .upload("doomed.bin", sample_file(4096))
        .await
        .unwrap();

    nodes.remove(2).stop().await;
    nodes.remove(0).stop().await;

    let mut out = Vec::new();
    let err = state
        .downloads()
        .download("doomed.bin", &mut out)
        .await
        .unwrap_err();
    assert!(matches!(err, EcStoreError::Unrecoverable { .. }), "got {:?}", err);
    assert!(out.is_empty());

    for node in nodes {
        node.stop().await;
    }
}
