//! ecstore Network Layer
//!
//! gRPC transport between the gateway and the storage nodes:
//! - **Server** (`FragmentServiceImpl`): runs on each storage node over its chunk store
//! - **Client** (`FragmentClient`): used by the gateway, one pooled channel per node
//!
//! # Usage
//!
//! ```ignore
//! use ecstore_network::{start_server, GrpcServerConfig};
//! use ecstore_storage::MemoryChunkStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryChunkStore::new());
//! start_server(GrpcServerConfig::default(), store, "node-1".to_string()).await?;
//! ```

pub mod grpc_client;
pub mod grpc_server;

// Re-exports
pub use grpc_client::{FragmentClient, FragmentClientConfig};
pub use grpc_server::{
    start_server, start_server_with_shutdown, FragmentServiceImpl, GrpcServerConfig,
};
