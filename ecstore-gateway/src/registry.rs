//! Storage node registry
//!
//! A fixed, ordered list of storage nodes. Fragment `i` of every object goes
//! to node `i % len`, so the order here is part of the placement.

use bytes::Bytes;
use ecstore_core::error::Result;
use ecstore_core::placement::{node_for, FragmentId};
use ecstore_network::{FragmentClient, FragmentClientConfig};
use ecstore_storage::ChunkStore;
use futures::future::BoxFuture;
use std::sync::Arc;

/// A node that can hold fragments
pub trait FragmentNode: Send + Sync {
    /// Endpoint used for logging and health probes
    fn address(&self) -> &str;

    /// Store `data` under `id`, replacing any previous bytes
    fn store(&self, id: FragmentId, data: Bytes) -> BoxFuture<'_, Result<()>>;

    /// Fetch the bytes stored under `id`; `Ok(None)` if the node has none
    fn fetch(&self, id: FragmentId) -> BoxFuture<'_, Result<Option<Bytes>>>;
}

/// Storage node reached over gRPC
pub struct RemoteNode {
    address: String,
    client: Arc<FragmentClient>,
}

impl RemoteNode {
    pub fn new(address: impl Into<String>, client: Arc<FragmentClient>) -> Self {
        Self {
            address: address.into(),
            client,
        }
    }
}

impl FragmentNode for RemoteNode {
    fn address(&self) -> &str {
        &self.address
    }

    fn store(&self, id: FragmentId, data: Bytes) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.client.store_fragment(&self.address, &id, data).await })
    }

    fn fetch(&self, id: FragmentId) -> BoxFuture<'_, Result<Option<Bytes>>> {
        Box::pin(async move { self.client.fetch_fragment(&self.address, &id).await })
    }
}

/// Chunk store living in the gateway process
pub struct LocalNode {
    label: String,
    store: Arc<dyn ChunkStore>,
}

impl LocalNode {
    pub fn new(label: impl Into<String>, store: Arc<dyn ChunkStore>) -> Self {
        Self {
            label: label.into(),
            store,
        }
    }

    pub fn store_handle(&self) -> Arc<dyn ChunkStore> {
        self.store.clone()
    }
}

impl FragmentNode for LocalNode {
    fn address(&self) -> &str {
        &self.label
    }

    fn store(&self, id: FragmentId, data: Bytes) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.store.put(&id, data) })
    }

    fn fetch(&self, id: FragmentId) -> BoxFuture<'_, Result<Option<Bytes>>> {
        Box::pin(async move { self.store.get(&id) })
    }
}

/// Ordered set of storage nodes
#[derive(Clone, Default)]
pub struct NodeRegistry {
    nodes: Vec<Arc<dyn FragmentNode>>,
}

impl NodeRegistry {
    pub fn new(nodes: Vec<Arc<dyn FragmentNode>>) -> Self {
        Self { nodes }
    }

    /// Registry of gRPC nodes sharing one connection pool
    ///
    /// Connections are opened lazily on first use, so unreachable nodes do
    /// not prevent startup.
    pub fn connect(addresses: &[String], client_config: FragmentClientConfig) -> Self {
        let client = Arc::new(FragmentClient::with_config(client_config));
        let nodes = addresses
            .iter()
            .map(|addr| Arc::new(RemoteNode::new(addr.clone(), client.clone())) as Arc<dyn FragmentNode>)
            .collect();
        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: usize) -> Option<Arc<dyn FragmentNode>> {
        self.nodes.get(index).cloned()
    }

    /// Node holding fragment `fragment_index`, with its position
    pub fn node_for_fragment(&self, fragment_index: usize) -> Result<(usize, Arc<dyn FragmentNode>)> {
        let position = node_for(fragment_index, self.nodes.len())?;
        Ok((position, self.nodes[position].clone()))
    }

    pub fn addresses(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.address().to_string()).collect()
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("nodes", &self.addresses())
            .finish()
    }
}
