//! Upload/download orchestration tests
//!
//! Uses in-process nodes (memory-backed, unreachable, slow) so partial
//! failures and timeouts can be exercised without a network.
//! Run with: cargo test --test orchestration_tests -p ecstore-gateway

use bytes::Bytes;
use ecstore_core::placement::FragmentId;
use ecstore_core::{EcStoreError, ErasureConfig, ErasureEncoder};
use ecstore_gateway::{
    DownloadOrchestrator, FragmentNode, LocalNode, NodeRegistry, ObjectMetadataTable,
    UploadOrchestrator,
};
use ecstore_storage::{ChunkStore, MemoryChunkStore};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const RPC_TIMEOUT: Duration = Duration::from_millis(150);

// ============================================================================
// Test nodes
// ============================================================================

/// Memory-backed node that counts calls
struct CountingNode {
    inner: LocalNode,
    fetches: AtomicUsize,
}

impl CountingNode {
    fn new(label: &str, store: Arc<MemoryChunkStore>) -> Self {
        Self {
            inner: LocalNode::new(label, store),
            fetches: AtomicUsize::new(0),
        }
    }
}

impl FragmentNode for CountingNode {
    fn address(&self) -> &str {
        self.inner.address()
    }

    fn store(&self, id: FragmentId, data: Bytes) -> BoxFuture<'_, ecstore_core::Result<()>> {
        self.inner.store(id, data)
    }

    fn fetch(&self, id: FragmentId) -> BoxFuture<'_, ecstore_core::Result<Option<Bytes>>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(id)
    }
}

/// Node whose every call fails as if the host were down
struct DownNode {
    address: String,
}

impl FragmentNode for DownNode {
    fn address(&self) -> &str {
        &self.address
    }

    fn store(&self, _id: FragmentId, _data: Bytes) -> BoxFuture<'_, ecstore_core::Result<()>> {
        Box::pin(async move { Err(EcStoreError::Unreachable(self.address.clone())) })
    }

    fn fetch(&self, _id: FragmentId) -> BoxFuture<'_, ecstore_core::Result<Option<Bytes>>> {
        Box::pin(async move { Err(EcStoreError::Unreachable(self.address.clone())) })
    }
}

/// Node that never answers within any reasonable deadline
struct SlowNode;

impl FragmentNode for SlowNode {
    fn address(&self) -> &str {
        "slow"
    }

    fn store(&self, _id: FragmentId, _data: Bytes) -> BoxFuture<'_, ecstore_core::Result<()>> {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        })
    }

    fn fetch(&self, _id: FragmentId) -> BoxFuture<'_, ecstore_core::Result<Option<Bytes>>> {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(None)
        })
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Cluster {
    uploads: UploadOrchestrator,
    downloads: DownloadOrchestrator,
    metadata: ObjectMetadataTable,
}

fn cluster(nodes: Vec<Arc<dyn FragmentNode>>) -> Cluster {
    cluster_with(nodes, ErasureConfig::default())
}

fn cluster_with(nodes: Vec<Arc<dyn FragmentNode>>, config: ErasureConfig) -> Cluster {
    let encoder = ErasureEncoder::with_config(config).unwrap();
    let registry = Arc::new(NodeRegistry::new(nodes));
    let metadata = ObjectMetadataTable::new();
    Cluster {
        uploads: UploadOrchestrator::new(
            encoder.clone(),
            registry.clone(),
            metadata.clone(),
            RPC_TIMEOUT,
        ),
        downloads: DownloadOrchestrator::new(encoder, registry, metadata.clone(), RPC_TIMEOUT),
        metadata,
    }
}

/// `n` memory-backed nodes plus handles to their stores
fn memory_nodes(n: usize) -> (Vec<Arc<CountingNode>>, Vec<Arc<MemoryChunkStore>>) {
    let stores: Vec<Arc<MemoryChunkStore>> =
        (0..n).map(|_| Arc::new(MemoryChunkStore::new())).collect();
    let nodes = stores
        .iter()
        .enumerate()
        .map(|(i, s)| Arc::new(CountingNode::new(&format!("mem-{}", i), s.clone())))
        .collect();
    (nodes, stores)
}

fn as_dyn(nodes: &[Arc<CountingNode>]) -> Vec<Arc<dyn FragmentNode>> {
    nodes
        .iter()
        .map(|n| n.clone() as Arc<dyn FragmentNode>)
        .collect()
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_round_trip_across_three_nodes() {
    let (nodes, stores) = memory_nodes(3);
    let cluster = cluster(as_dyn(&nodes));

    let report = cluster
        .uploads
        .upload("hello.txt", Bytes::from_static(b"hello world!"))
        .await
        .unwrap();
    assert_eq!(report.stored, 6);
    assert!(report.failed.is_empty());
    assert!(cluster.uploads.policy().is_recoverable(&report));

    // Fragment i lives on node i % 3
    assert!(stores[0]
        .exists(&FragmentId::derive("hello.txt", 0))
        .unwrap());
    assert!(stores[0]
        .exists(&FragmentId::derive("hello.txt", 3))
        .unwrap());
    assert!(stores[2]
        .exists(&FragmentId::derive("hello.txt", 5))
        .unwrap());
    assert_eq!(stores[1].stats().unwrap().fragment_count, 2);

    let mut out = Vec::new();
    let download = cluster.downloads.download("hello.txt", &mut out).await.unwrap();
    assert_eq!(out, b"hello world!");
    assert_eq!(download.size, 12);
    assert_eq!(download.fetched, 6);
    assert!(download.missing.is_empty());
    assert!(!download.reconstructed);

    let meta = cluster.metadata.get("hello.txt").unwrap();
    assert_eq!(meta.node_count, 3);
    assert_eq!(meta.fragment_len(), 3);
}

#[tokio::test]
async fn test_custom_geometry() {
    let (nodes, _stores) = memory_nodes(3);
    let cluster = cluster_with(as_dyn(&nodes), ErasureConfig::new(2, 1).unwrap());

    let payload = Bytes::from((0..=255u8).cycle().take(1001).collect::<Vec<u8>>());
    let report = cluster.uploads.upload("blob", payload.clone()).await.unwrap();
    assert_eq!(report.stored, 3);

    let mut out = Vec::new();
    cluster.downloads.download("blob", &mut out).await.unwrap();
    assert_eq!(Bytes::from(out), payload);
}

#[tokio::test]
async fn test_reupload_overwrites() {
    let (nodes, _stores) = memory_nodes(3);
    let cluster = cluster(as_dyn(&nodes));

    cluster
        .uploads
        .upload("notes.txt", Bytes::from_static(b"first version"))
        .await
        .unwrap();
    cluster
        .uploads
        .upload("notes.txt", Bytes::from_static(b"second, much longer version"))
        .await
        .unwrap();
    assert_eq!(cluster.metadata.len(), 1);

    let mut out = Vec::new();
    cluster.downloads.download("notes.txt", &mut out).await.unwrap();
    assert_eq!(out, b"second, much longer version");
}

// ============================================================================
// Rejected requests
// ============================================================================

#[tokio::test]
async fn test_unknown_object_fetches_nothing() {
    let (nodes, _stores) = memory_nodes(3);
    let cluster = cluster(as_dyn(&nodes));

    let mut out = Vec::new();
    let result = cluster.downloads.download("ghost.bin", &mut out).await;
    assert!(matches!(result, Err(EcStoreError::NotFound(_))));
    assert!(out.is_empty());

    let fetches: usize = nodes.iter().map(|n| n.fetches.load(Ordering::SeqCst)).sum();
    assert_eq!(fetches, 0);
}

#[tokio::test]
async fn test_empty_payload_rejected() {
    let (nodes, _stores) = memory_nodes(3);
    let cluster = cluster(as_dyn(&nodes));

    let result = cluster.uploads.upload("empty", Bytes::new()).await;
    assert!(matches!(result, Err(EcStoreError::InvalidInput(_))));
    assert!(!cluster.metadata.contains("empty"));
}

#[tokio::test]
async fn test_empty_registry_rejected() {
    let cluster = cluster(Vec::new());
    let result = cluster
        .uploads
        .upload("a", Bytes::from_static(b"data"))
        .await;
    assert!(matches!(result, Err(EcStoreError::Configuration(_))));
}

#[tokio::test]
async fn test_placement_change_detected() {
    let (nodes, _stores) = memory_nodes(4);
    let encoder = ErasureEncoder::new().unwrap();
    let metadata = ObjectMetadataTable::new();

    let three = Arc::new(NodeRegistry::new(as_dyn(&nodes[..3])));
    let uploads = UploadOrchestrator::new(encoder.clone(), three, metadata.clone(), RPC_TIMEOUT);
    uploads
        .upload("moved", Bytes::from_static(b"some bytes"))
        .await
        .unwrap();

    let four = Arc::new(NodeRegistry::new(as_dyn(&nodes)));
    let downloads = DownloadOrchestrator::new(encoder, four, metadata, RPC_TIMEOUT);

    let mut out = Vec::new();
    let result = downloads.download("moved", &mut out).await;
    assert!(matches!(
        result,
        Err(EcStoreError::PlacementChanged {
            recorded: 3,
            current: 4
        })
    ));
    let fetches: usize = nodes.iter().map(|n| n.fetches.load(Ordering::SeqCst)).sum();
    assert_eq!(fetches, 0);
}

// ============================================================================
// Partial failure
// ============================================================================

#[tokio::test]
async fn test_all_nodes_down() {
    let nodes: Vec<Arc<dyn FragmentNode>> = (1..=3)
        .map(|i| {
            Arc::new(DownNode {
                address: format!("localhost:900{}", i),
            }) as Arc<dyn FragmentNode>
        })
        .collect();
    let cluster = cluster(nodes);

    let report = cluster
        .uploads
        .upload("doomed.txt", Bytes::from_static(b"hello world!"))
        .await
        .unwrap();
    assert_eq!(report.stored, 0);
    assert_eq!(report.failed.len(), 6);
    assert!(!cluster.uploads.policy().is_recoverable(&report));
    assert_eq!(report.failed[4].node, 1);
    assert_eq!(report.failed[4].address, "localhost:9002");

    // Metadata is recorded even though nothing was stored
    assert!(cluster.metadata.contains("doomed.txt"));

    let mut out = Vec::new();
    let result = cluster.downloads.download("doomed.txt", &mut out).await;
    assert!(matches!(
        result,
        Err(EcStoreError::Unrecoverable {
            missing: 6,
            tolerated: 2
        })
    ));
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_one_node_lost_is_rebuilt() {
    let (nodes, stores) = memory_nodes(3);
    let cluster = cluster(as_dyn(&nodes));

    let payload = Bytes::from_static(b"The quick brown fox jumps over the lazy dog");
    cluster.uploads.upload("fox.txt", payload.clone()).await.unwrap();

    stores[1].clear();

    let mut out = Vec::new();
    let report = cluster.downloads.download("fox.txt", &mut out).await.unwrap();
    assert_eq!(Bytes::from(out), payload);
    assert_eq!(report.missing, vec![1, 4]);
    assert_eq!(report.fetched, 4);
    assert!(report.reconstructed);
}

#[tokio::test]
async fn test_two_nodes_lost_is_unrecoverable() {
    let (nodes, stores) = memory_nodes(3);
    let cluster = cluster(as_dyn(&nodes));

    cluster
        .uploads
        .upload("fox.txt", Bytes::from_static(b"The quick brown fox"))
        .await
        .unwrap();

    stores[0].clear();
    stores[2].clear();

    let mut out = Vec::new();
    let result = cluster.downloads.download("fox.txt", &mut out).await;
    assert!(matches!(
        result,
        Err(EcStoreError::Unrecoverable {
            missing: 4,
            tolerated: 2
        })
    ));
}

#[tokio::test]
async fn test_partial_upload_failure_still_downloads() {
    let (nodes, _stores) = memory_nodes(2);
    let mut all = as_dyn(&nodes);
    all.push(Arc::new(DownNode {
        address: "down:9003".to_string(),
    }));
    let cluster = cluster(all);

    let payload = Bytes::from_static(b"partially stored payload");
    let report = cluster.uploads.upload("partial", payload.clone()).await.unwrap();
    assert_eq!(report.stored, 4);
    let failed: Vec<usize> = report.failed.iter().map(|f| f.index).collect();
    assert_eq!(failed, vec![2, 5]);
    assert!(report.is_degraded());
    assert!(cluster.uploads.policy().is_recoverable(&report));

    let mut out = Vec::new();
    let download = cluster.downloads.download("partial", &mut out).await.unwrap();
    assert_eq!(Bytes::from(out), payload);
    assert_eq!(download.missing, vec![2, 5]);
}

#[tokio::test]
async fn test_slow_node_times_out() {
    let (nodes, _stores) = memory_nodes(2);
    let mut all = as_dyn(&nodes);
    all.push(Arc::new(SlowNode));
    let cluster = cluster(all);

    let payload = Bytes::from_static(b"deadline bound payload");
    let started = Instant::now();
    let report = cluster.uploads.upload("slow", payload.clone()).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(report.stored, 4);
    assert!(report
        .failed
        .iter()
        .all(|f| f.address == "slow" && f.error.contains("Timed out")));

    let started = Instant::now();
    let mut out = Vec::new();
    let download = cluster.downloads.download("slow", &mut out).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(Bytes::from(out), payload);
    assert_eq!(download.missing, vec![2, 5]);
}

// ============================================================================
// Integrity
// ============================================================================

#[tokio::test]
async fn test_wrong_length_fragment_treated_as_absent() {
    let (nodes, stores) = memory_nodes(3);
    let cluster = cluster(as_dyn(&nodes));

    let payload = Bytes::from_static(b"length checked payload");
    cluster.uploads.upload("len", payload.clone()).await.unwrap();

    stores[0]
        .put(&FragmentId::derive("len", 0), Bytes::from_static(b"x"))
        .unwrap();

    let mut out = Vec::new();
    let report = cluster.downloads.download("len", &mut out).await.unwrap();
    assert_eq!(Bytes::from(out), payload);
    assert_eq!(report.missing, vec![0]);
}

#[tokio::test]
async fn test_silent_corruption_is_repaired() {
    let (nodes, stores) = memory_nodes(6);
    let cluster = cluster(as_dyn(&nodes));

    let payload = Bytes::from_static(b"hello world!");
    cluster.uploads.upload("bits", payload.clone()).await.unwrap();

    // Same length, different bytes
    stores[1]
        .put(&FragmentId::derive("bits", 1), Bytes::from_static(b"zzz"))
        .unwrap();

    let mut out = Vec::new();
    let report = cluster.downloads.download("bits", &mut out).await.unwrap();
    assert_eq!(Bytes::from(out), payload);
    assert!(report.missing.is_empty());
    assert_eq!(report.discarded, vec![1]);
    assert!(report.reconstructed);
}

#[tokio::test]
async fn test_corruption_and_loss_within_parity_budget() {
    let (nodes, stores) = memory_nodes(6);
    let cluster = cluster(as_dyn(&nodes));

    let payload = Bytes::from_static(b"hello world!");
    cluster.uploads.upload("mixed", payload.clone()).await.unwrap();

    stores[3].clear();
    stores[0]
        .put(&FragmentId::derive("mixed", 0), Bytes::from_static(b"zzz"))
        .unwrap();

    let mut out = Vec::new();
    let report = cluster.downloads.download("mixed", &mut out).await.unwrap();
    assert_eq!(Bytes::from(out), payload);
    assert_eq!(report.missing, vec![3]);
    assert_eq!(report.discarded, vec![0]);
}

#[tokio::test]
async fn test_corruption_beyond_parity_detected() {
    let (nodes, stores) = memory_nodes(3);
    let cluster = cluster(as_dyn(&nodes));

    cluster
        .uploads
        .upload("bits", Bytes::from_static(b"abcdefgh"))
        .await
        .unwrap();

    // Three same-length corrupt fragments, one more than m
    for index in 0..3 {
        stores[index]
            .put(&FragmentId::derive("bits", index), Bytes::from_static(b"zz"))
            .unwrap();
    }

    let mut out = Vec::new();
    let result = cluster.downloads.download("bits", &mut out).await;
    assert!(matches!(result, Err(EcStoreError::IntegrityMismatch)));
    assert!(out.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_large_payload_repaired_off_runtime() {
    let (nodes, stores) = memory_nodes(3);
    let cluster = cluster(as_dyn(&nodes));

    let payload: Bytes = (0..(1024 * 1024 + 3))
        .map(|i| (i % 251) as u8)
        .collect::<Vec<u8>>()
        .into();
    cluster.uploads.upload("big", payload.clone()).await.unwrap();

    let id = FragmentId::derive("big", 3);
    let original = stores[0].get(&id).unwrap().unwrap();
    let flipped: Vec<u8> = original.iter().map(|b| b ^ 0x5A).collect();
    stores[0].put(&id, Bytes::from(flipped)).unwrap();

    let mut out = Vec::new();
    let report = cluster.downloads.download("big", &mut out).await.unwrap();
    assert_eq!(out.len(), payload.len());
    assert!(out == payload.as_ref());
    assert_eq!(report.discarded, vec![3]);
}
