//! gRPC client for talking to storage nodes
//!
//! Provides connection pooling and per-call deadlines. Calls are never
//! retried: a failed store or fetch is reported to the caller as-is.

use bytes::Bytes;
use ecstore_core::error::{EcStoreError, Result};
use ecstore_core::placement::FragmentId;
use ecstore_protocol::fragment::{
    fragment_service_client::FragmentServiceClient, FetchFragmentRequest, StoreFragmentRequest,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tonic::transport::Channel;
use tonic::Code;
use tracing::{debug, info, instrument};

/// Configuration for the gRPC client
#[derive(Debug, Clone)]
pub struct FragmentClientConfig {
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Request timeout
    pub request_timeout: Duration,
    /// Maximum message size in bytes
    pub max_message_size: usize,
}

impl Default for FragmentClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
            max_message_size: 64 * 1024 * 1024, // 64 MB
        }
    }
}

impl FragmentClientConfig {
    /// Use the same bound for connecting and for each request
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            connect_timeout: timeout,
            request_timeout: timeout,
            ..Default::default()
        }
    }
}

/// Direction of a fragment transfer, used to classify failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Store,
    Fetch,
}

/// Client for storage nodes' FragmentService
pub struct FragmentClient {
    /// Connection pool: address -> client
    clients: Arc<RwLock<HashMap<String, FragmentServiceClient<Channel>>>>,
    /// Configuration
    config: FragmentClientConfig,
}

impl FragmentClient {
    /// Create a new FragmentClient with default configuration
    pub fn new() -> Self {
        Self::with_config(FragmentClientConfig::default())
    }

    /// Create a new FragmentClient with custom configuration
    pub fn with_config(config: FragmentClientConfig) -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Get or create a client for the given address
    async fn get_client(&self, addr: &str) -> Result<FragmentServiceClient<Channel>> {
        {
            let clients = self.clients.read();
            if let Some(client) = clients.get(addr) {
                return Ok(client.clone());
            }
        }

        debug!(addr = %addr, "Creating new gRPC connection");

        let channel = Channel::from_shared(format!("http://{}", addr))
            .map_err(|e| EcStoreError::Configuration(format!("Invalid endpoint {}: {}", addr, e)))?
            .connect_timeout(self.config.connect_timeout)
            .timeout(self.config.request_timeout)
            .connect()
            .await
            .map_err(|e| EcStoreError::Unreachable(format!("{}: {}", addr, e)))?;

        let client = FragmentServiceClient::new(channel)
            .max_decoding_message_size(self.config.max_message_size)
            .max_encoding_message_size(self.config.max_message_size);

        {
            let mut clients = self.clients.write();
            clients.insert(addr.to_string(), client.clone());
        }

        info!(addr = %addr, "gRPC connection established");
        Ok(client)
    }

    /// Drop a cached connection after a transport failure
    fn remove_client(&self, addr: &str) {
        let mut clients = self.clients.write();
        clients.remove(addr);
        debug!(addr = %addr, "Removed gRPC connection from cache");
    }

    /// Classify a failed RPC
    fn map_status(&self, addr: &str, status: tonic::Status, direction: Direction) -> EcStoreError {
        match status.code() {
            Code::DeadlineExceeded | Code::Cancelled => EcStoreError::Timeout {
                addr: addr.to_string(),
                millis: self.config.request_timeout.as_millis() as u64,
            },
            Code::Unavailable | Code::Unknown => {
                self.remove_client(addr);
                EcStoreError::Unreachable(format!("{}: {}", addr, status.message()))
            }
            _ => {
                let detail = format!("{}: {}", addr, status.message());
                match direction {
                    Direction::Store => EcStoreError::WriteFailure(detail),
                    Direction::Fetch => EcStoreError::ReadFailure(detail),
                }
            }
        }
    }

    /// Store a fragment on a remote node
    #[instrument(skip(self, data), fields(addr = %addr, id = %id))]
    pub async fn store_fragment(&self, addr: &str, id: &FragmentId, data: Bytes) -> Result<()> {
        debug!(size = data.len(), "Storing fragment on remote node");

        let mut client = self.get_client(addr).await?;
        let request = tonic::Request::new(StoreFragmentRequest {
            id: id.as_str().to_string(),
            data: data.to_vec(),
        });

        let response = client
            .store_fragment(request)
            .await
            .map_err(|status| self.map_status(addr, status, Direction::Store))?
            .into_inner();

        if response.success {
            Ok(())
        } else {
            Err(EcStoreError::WriteFailure(format!(
                "{}: {}",
                addr, response.message
            )))
        }
    }

    /// Fetch a fragment from a remote node
    ///
    /// `Ok(None)` means the node answered but does not hold the fragment.
    #[instrument(skip(self), fields(addr = %addr, id = %id))]
    pub async fn fetch_fragment(&self, addr: &str, id: &FragmentId) -> Result<Option<Bytes>> {
        debug!("Fetching fragment from remote node");

        let mut client = self.get_client(addr).await?;
        let request = tonic::Request::new(FetchFragmentRequest {
            id: id.as_str().to_string(),
        });

        let response = client
            .fetch_fragment(request)
            .await
            .map_err(|status| self.map_status(addr, status, Direction::Fetch))?
            .into_inner();

        if response.found {
            Ok(Some(Bytes::from(response.data)))
        } else {
            Ok(None)
        }
    }

    /// Check if a node is reachable by attempting to connect
    pub async fn is_reachable(&self, addr: &str) -> bool {
        match self.get_client(addr).await {
            Ok(_) => true,
            Err(e) => {
                debug!(addr = %addr, error = %e, "Node not reachable");
                false
            }
        }
    }

    /// Clear all cached connections
    pub fn clear_connections(&self) {
        let mut clients = self.clients.write();
        let count = clients.len();
        clients.clear();
        info!(count = count, "Cleared all cached connections");
    }

    /// Get the number of cached connections
    pub fn connection_count(&self) -> usize {
        self.clients.read().len()
    }

    pub fn config(&self) -> &FragmentClientConfig {
        &self.config
    }
}

impl Default for FragmentClient {
    fn default() -> Self {
        Self::new()
    }
}
