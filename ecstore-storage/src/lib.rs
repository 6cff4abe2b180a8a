//! ecstore Storage Backend
//!
//! Provides the fragment stores a storage node serves from:
//! - `ChunkStore` trait for pluggable storage
//! - `SledChunkStore` for persistent fragment storage
//! - `MemoryChunkStore` for testing and volatile nodes

pub mod backend;
pub mod memory;
pub mod sled_backend;

pub use backend::{ChunkStore, StorageStats};
pub use memory::MemoryChunkStore;
pub use sled_backend::SledChunkStore;

use ecstore_core::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which store implementation a node runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sled,
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Path to storage directory
    pub path: std::path::PathBuf,

    /// Maximum storage capacity in bytes (0 = unlimited)
    pub max_capacity: u64,

    /// Store implementation
    pub backend: BackendKind,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: std::path::PathBuf::from("./ecstore_data"),
            max_capacity: 0, // Unlimited
            backend: BackendKind::Sled,
        }
    }
}

impl StorageConfig {
    /// Create a new storage config with the given path
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set maximum capacity
    pub fn with_max_capacity(mut self, bytes: u64) -> Self {
        self.max_capacity = bytes;
        self
    }

    /// Select the store implementation
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }
}

/// Open the store described by `config`
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn ChunkStore>> {
    match config.backend {
        BackendKind::Sled => Ok(Arc::new(SledChunkStore::open(config)?)),
        BackendKind::Memory => Ok(Arc::new(MemoryChunkStore::with_capacity(
            config.max_capacity,
        ))),
    }
}
