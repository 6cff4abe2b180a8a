//! Gateway configuration
//!
//! Parsed from the command line with environment fallbacks. When no node
//! list is given, the per-node `STORAGE_NODE_1..3` variables of older
//! deployments are honoured.

use clap::Parser;
use ecstore_core::error::{EcStoreError, Result};
use ecstore_core::{ErasureConfig, DATA_FRAGMENTS, PARITY_FRAGMENTS};
use std::net::SocketAddr;
use std::time::Duration;

/// Default storage nodes when nothing is configured
const DEFAULT_NODES: [&str; 3] = ["localhost:9001", "localhost:9002", "localhost:9003"];

/// Room left in each StoreFragment message for the id and protobuf framing
const FRAGMENT_MESSAGE_OVERHEAD: usize = 64 * 1024;

/// Gateway configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "ecstore-gateway")]
#[command(about = "ecstore HTTP gateway")]
#[command(version)]
pub struct GatewayConfig {
    /// HTTP listen address
    #[arg(long, env = "ECSTORE_HTTP_ADDR", default_value = "0.0.0.0:8080")]
    pub http_addr: SocketAddr,

    /// Storage node endpoints (host:port, comma-separated)
    #[arg(long, env = "ECSTORE_STORAGE_NODES", value_delimiter = ',')]
    pub nodes: Vec<String>,

    /// Data fragments per object (k)
    #[arg(long, env = "ECSTORE_DATA_FRAGMENTS", default_value_t = DATA_FRAGMENTS)]
    pub data_fragments: usize,

    /// Parity fragments per object (m)
    #[arg(long, env = "ECSTORE_PARITY_FRAGMENTS", default_value_t = PARITY_FRAGMENTS)]
    pub parity_fragments: usize,

    /// Per-call timeout for fragment RPCs in milliseconds
    #[arg(long, env = "ECSTORE_RPC_TIMEOUT_MS", default_value_t = 5000)]
    pub rpc_timeout_ms: u64,

    /// TCP probe timeout for /status in milliseconds
    #[arg(long, env = "ECSTORE_PROBE_TIMEOUT_MS", default_value_t = 200)]
    pub probe_timeout_ms: u64,

    /// Largest accepted upload in MB
    #[arg(long, env = "ECSTORE_MAX_UPLOAD_MB", default_value_t = 240)]
    pub max_upload_mb: usize,

    /// Largest gRPC message exchanged with storage nodes in MB
    #[arg(long, env = "ECSTORE_MAX_MESSAGE_MB", default_value_t = 64)]
    pub max_message_mb: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            nodes: Vec::new(),
            data_fragments: DATA_FRAGMENTS,
            parity_fragments: PARITY_FRAGMENTS,
            rpc_timeout_ms: 5000,
            probe_timeout_ms: 200,
            max_upload_mb: 240,
            max_message_mb: 64,
            verbose: false,
        }
    }
}

impl GatewayConfig {
    /// Set the storage node list
    pub fn with_nodes<I, S>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nodes = nodes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the erasure geometry
    pub fn with_geometry(mut self, data_fragments: usize, parity_fragments: usize) -> Self {
        self.data_fragments = data_fragments;
        self.parity_fragments = parity_fragments;
        self
    }

    /// Set the upload and gRPC message limits, both in MB
    pub fn with_limits(mut self, max_upload_mb: usize, max_message_mb: usize) -> Self {
        self.max_upload_mb = max_upload_mb;
        self.max_message_mb = max_message_mb;
        self
    }

    /// Set the per-call RPC timeout
    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Storage node endpoints in placement order
    pub fn storage_nodes(&self) -> Vec<String> {
        let explicit: Vec<String> = self
            .nodes
            .iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        if !explicit.is_empty() {
            return explicit;
        }
        legacy_nodes(|key| std::env::var(key).ok())
    }

    /// Erasure geometry every new object is encoded with
    pub fn erasure_config(&self) -> Result<ErasureConfig> {
        ErasureConfig::new(self.data_fragments, self.parity_fragments)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }

    pub fn max_message_bytes(&self) -> usize {
        self.max_message_mb * 1024 * 1024
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage_nodes().is_empty() {
            return Err(EcStoreError::Configuration(
                "at least one storage node is required".to_string(),
            ));
        }
        let erasure = self.erasure_config()?;
        if self.rpc_timeout_ms == 0 {
            return Err(EcStoreError::Configuration(
                "rpc timeout cannot be 0".to_string(),
            ));
        }
        if self.max_upload_mb == 0 {
            return Err(EcStoreError::Configuration(
                "max upload size cannot be 0".to_string(),
            ));
        }
        let largest_store = erasure
            .fragment_len(self.max_upload_bytes())
            .saturating_add(FRAGMENT_MESSAGE_OVERHEAD);
        if largest_store > self.max_message_bytes() {
            return Err(EcStoreError::Configuration(format!(
                "a {} MB upload yields {} byte fragments, above the {} MB gRPC message limit",
                self.max_upload_mb,
                erasure.fragment_len(self.max_upload_bytes()),
                self.max_message_mb
            )));
        }
        Ok(())
    }
}

/// Resolve `STORAGE_NODE_1..3`, falling back to the local defaults
fn legacy_nodes(lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
    DEFAULT_NODES
        .iter()
        .enumerate()
        .map(|(i, default)| {
            lookup(&format!("STORAGE_NODE_{}", i + 1))
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        })
        .collect()
}
