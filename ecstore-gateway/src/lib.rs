//! ecstore Gateway library
//!
//! Splits uploaded files into erasure-coded fragments, spreads them over the
//! storage nodes, and rebuilds them on download.

pub mod config;
pub mod download;
pub mod error;
pub mod health;
pub mod http_api;
pub mod metadata;
pub mod metrics;
pub mod registry;
pub mod state;
pub mod upload;

pub use config::GatewayConfig;
pub use download::{DownloadOrchestrator, DownloadReport};
pub use error::{GatewayError, GatewayResult};
pub use health::{NodeState, NodeStatus};
pub use metadata::{ObjectMeta, ObjectMetadataTable};
pub use registry::{FragmentNode, LocalNode, NodeRegistry, RemoteNode};
pub use state::AppState;
pub use upload::{DistributionPolicy, FragmentFailure, UploadOrchestrator, UploadReport};

/// Payloads at least this large are encoded and decoded on the blocking pool
pub(crate) const BLOCKING_CODEC_THRESHOLD: usize = 1024 * 1024;
