//! gRPC FragmentService implementation
//!
//! Server side of the storage node: stores and serves fragments out of the
//! node's local chunk store.

use bytes::Bytes;
use ecstore_core::placement::FragmentId;
use ecstore_protocol::fragment::{
    fragment_service_server::{FragmentService, FragmentServiceServer},
    FetchFragmentRequest, FetchFragmentResponse, StoreFragmentRequest, StoreFragmentResponse,
};
use ecstore_storage::ChunkStore;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, error, info, instrument};

/// Configuration for the gRPC server
#[derive(Debug, Clone)]
pub struct GrpcServerConfig {
    /// Address to listen on
    pub listen_addr: SocketAddr,
    /// Maximum message size in bytes (default 64 MB for large fragments)
    pub max_message_size: usize,
}

impl Default for GrpcServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9001)),
            max_message_size: 64 * 1024 * 1024, // 64 MB
        }
    }
}

impl GrpcServerConfig {
    /// Create a new config with the specified address
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            listen_addr: addr,
            ..Default::default()
        }
    }

    /// Set the listen address
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    /// Set the maximum message size
    pub fn with_max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }
}

/// FragmentService backed by a local chunk store
pub struct FragmentServiceImpl {
    /// Local fragment storage
    store: Arc<dyn ChunkStore>,
    /// Node ID for logging
    node_id: String,
}

impl FragmentServiceImpl {
    /// Create a new FragmentService over the given store
    pub fn new(store: Arc<dyn ChunkStore>, node_id: String) -> Self {
        Self { store, node_id }
    }

    fn parse_id(raw: String) -> Result<FragmentId, Status> {
        if raw.is_empty() {
            return Err(Status::invalid_argument("Fragment id cannot be empty"));
        }
        Ok(FragmentId::from_raw(raw))
    }
}

#[tonic::async_trait]
impl FragmentService for FragmentServiceImpl {
    /// Store a fragment
    #[instrument(skip(self, request), fields(node_id = %self.node_id))]
    async fn store_fragment(
        &self,
        request: Request<StoreFragmentRequest>,
    ) -> Result<Response<StoreFragmentResponse>, Status> {
        let req = request.into_inner();
        let id = Self::parse_id(req.id)?;
        let size = req.data.len();

        debug!(id = %id, size, "Storing fragment");

        match self.store.put(&id, Bytes::from(req.data)) {
            Ok(()) => {
                info!(id = %id, size, "Fragment stored");
                Ok(Response::new(StoreFragmentResponse {
                    success: true,
                    message: String::new(),
                }))
            }
            Err(e) => {
                error!(id = %id, error = %e, "Failed to store fragment");
                Ok(Response::new(StoreFragmentResponse {
                    success: false,
                    message: e.to_string(),
                }))
            }
        }
    }

    /// Fetch a fragment
    #[instrument(skip(self, request), fields(node_id = %self.node_id))]
    async fn fetch_fragment(
        &self,
        request: Request<FetchFragmentRequest>,
    ) -> Result<Response<FetchFragmentResponse>, Status> {
        let id = Self::parse_id(request.into_inner().id)?;

        match self.store.get(&id) {
            Ok(Some(data)) => {
                debug!(id = %id, size = data.len(), "Fragment found");
                Ok(Response::new(FetchFragmentResponse {
                    found: true,
                    data: data.to_vec(),
                }))
            }
            Ok(None) => {
                debug!(id = %id, "Fragment not found");
                Ok(Response::new(FetchFragmentResponse {
                    found: false,
                    data: Vec::new(),
                }))
            }
            Err(e) => {
                error!(id = %id, error = %e, "Failed to read fragment");
                Err(Status::internal(format!("Storage error: {}", e)))
            }
        }
    }
}

/// Start the gRPC server
pub async fn start_server(
    config: GrpcServerConfig,
    store: Arc<dyn ChunkStore>,
    node_id: String,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    start_server_with_shutdown(config, store, node_id, std::future::pending()).await
}

/// Start the gRPC server, stopping once `shutdown` resolves
pub async fn start_server_with_shutdown<F>(
    config: GrpcServerConfig,
    store: Arc<dyn ChunkStore>,
    node_id: String,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send,
{
    let service = FragmentServiceImpl::new(store, node_id.clone());
    let server = FragmentServiceServer::new(service)
        .max_decoding_message_size(config.max_message_size)
        .max_encoding_message_size(config.max_message_size);

    info!(addr = %config.listen_addr, node_id = %node_id, "Starting gRPC server");

    tonic::transport::Server::builder()
        .add_service(server)
        .serve_with_shutdown(config.listen_addr, shutdown)
        .await?;

    info!(node_id = %node_id, "gRPC server stopped");
    Ok(())
}
