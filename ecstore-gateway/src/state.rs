//! Application State
//!
//! Shared state for all gateway handlers: the node registry, the metadata
//! table, and the two orchestrators built over them.

use ecstore_core::error::Result;
use ecstore_core::ErasureEncoder;
use ecstore_network::FragmentClientConfig;
use std::sync::Arc;
use tracing::info;

use crate::config::GatewayConfig;
use crate::download::DownloadOrchestrator;
use crate::metadata::ObjectMetadataTable;
use crate::registry::NodeRegistry;
use crate::upload::UploadOrchestrator;

pub struct AppState {
    config: GatewayConfig,
    registry: Arc<NodeRegistry>,
    metadata: ObjectMetadataTable,
    uploads: UploadOrchestrator,
    downloads: DownloadOrchestrator,
}

impl AppState {
    /// Build state talking to the configured storage nodes over gRPC
    pub fn new(config: GatewayConfig) -> Result<Self> {
        config.validate()?;
        let client_config = FragmentClientConfig {
            max_message_size: config.max_message_bytes(),
            ..FragmentClientConfig::with_timeout(config.rpc_timeout())
        };
        let registry = NodeRegistry::connect(&config.storage_nodes(), client_config);
        Self::with_registry(config, registry)
    }

    /// Build state over an existing registry
    pub fn with_registry(config: GatewayConfig, registry: NodeRegistry) -> Result<Self> {
        let encoder = ErasureEncoder::with_config(config.erasure_config()?)?;
        let registry = Arc::new(registry);
        let metadata = ObjectMetadataTable::new();

        info!(
            nodes = ?registry.addresses(),
            data_fragments = config.data_fragments,
            parity_fragments = config.parity_fragments,
            rpc_timeout_ms = config.rpc_timeout_ms,
            "Gateway state initialized"
        );

        let uploads = UploadOrchestrator::new(
            encoder.clone(),
            registry.clone(),
            metadata.clone(),
            config.rpc_timeout(),
        );
        let downloads = DownloadOrchestrator::new(
            encoder,
            registry.clone(),
            metadata.clone(),
            config.rpc_timeout(),
        );

        Ok(Self {
            config,
            registry,
            metadata,
            uploads,
            downloads,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn metadata(&self) -> &ObjectMetadataTable {
        &self.metadata
    }

    pub fn uploads(&self) -> &UploadOrchestrator {
        &self.uploads
    }

    pub fn downloads(&self) -> &DownloadOrchestrator {
        &self.downloads
    }
}
