//! ecstore Storage Node Library
//!
//! Provides the pieces of a storage node daemon:
//! - Configuration management
//! - Opening the configured chunk store
//! - Serving the FragmentService until shutdown

pub mod config;

pub use config::{ConfigError, NetworkSettings, NodeConfig, NodeIdentity, StorageSettings};

use ecstore_core::EcStoreError;
use ecstore_storage::{open_store, ChunkStore};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Errors that stop a storage node
#[derive(Error, Debug)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] EcStoreError),

    #[error("gRPC server error: {0}")]
    Server(String),
}

/// A storage node: one chunk store behind one gRPC endpoint
pub struct StorageNode {
    config: NodeConfig,
    store: Arc<dyn ChunkStore>,
}

impl StorageNode {
    /// Validate the configuration and open the chunk store
    pub fn open(config: NodeConfig) -> Result<Self, NodeError> {
        config.validate()?;
        let store = open_store(&config.storage_config())?;

        let stats = store.stats()?;
        info!(
            node_id = %config.node.id,
            backend = ?config.storage.backend,
            data_dir = ?config.data_dir(),
            fragments = stats.fragment_count,
            bytes_used = stats.bytes_used,
            "Chunk store ready"
        );

        Ok(Self { config, store })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Handle to the local chunk store
    pub fn store(&self) -> Arc<dyn ChunkStore> {
        self.store.clone()
    }

    /// Serve fragments until `shutdown` resolves, then flush the store
    pub async fn serve<F>(self, shutdown: F) -> Result<(), NodeError>
    where
        F: Future<Output = ()> + Send,
    {
        let grpc = self.config.grpc_config()?;
        info!(
            node_id = %self.config.node.id,
            name = %self.config.node.name,
            addr = %grpc.listen_addr,
            "Storage node listening"
        );

        let served = ecstore_network::start_server_with_shutdown(
            grpc,
            self.store.clone(),
            self.config.node.id.clone(),
            shutdown,
        )
        .await
        .map_err(|e| NodeError::Server(e.to_string()));

        if let Err(e) = self.store.flush() {
            warn!(error = %e, "Failed to flush chunk store on shutdown");
        }
        if let Ok(stats) = self.store.stats() {
            info!(
                fragments = stats.fragment_count,
                bytes_used = stats.bytes_used,
                "Storage node stopped"
            );
        }

        served
    }
}
