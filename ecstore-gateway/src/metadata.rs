//! Object metadata table
//!
//! Process-wide map from object name to its size and fragment layout. The
//! table lives only in memory and is lost when the gateway restarts.
//!
//! Concurrency: readers never block each other, and a write replaces one
//! entry atomically without touching others. No lock is held across any
//! fragment operation.

use chrono::{DateTime, Utc};
use ecstore_core::error::Result;
use ecstore_core::ErasureConfig;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// What the gateway remembers about one uploaded object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectMeta {
    pub name: String,
    /// Original payload length in bytes
    pub size: u64,
    pub data_fragments: usize,
    pub parity_fragments: usize,
    /// Registry size at upload time
    pub node_count: usize,
    /// BLAKE3 of the payload, hex encoded
    pub content_hash: String,
    pub uploaded_at: DateTime<Utc>,
}

impl ObjectMeta {
    /// Geometry the object was encoded with
    pub fn erasure_config(&self) -> Result<ErasureConfig> {
        ErasureConfig::new(self.data_fragments, self.parity_fragments)
    }

    pub fn total_fragments(&self) -> usize {
        self.data_fragments + self.parity_fragments
    }

    /// Length every fragment of this object must have
    pub fn fragment_len(&self) -> usize {
        (self.size as usize).div_ceil(self.data_fragments.max(1))
    }
}

/// Shared, guarded name -> metadata map
#[derive(Debug, Clone, Default)]
pub struct ObjectMetadataTable {
    entries: Arc<RwLock<HashMap<String, ObjectMeta>>>,
}

impl ObjectMetadataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry, returning the previous one
    pub fn insert(&self, meta: ObjectMeta) -> Option<ObjectMeta> {
        self.entries.write().insert(meta.name.clone(), meta)
    }

    pub fn get(&self, name: &str) -> Option<ObjectMeta> {
        self.entries.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    pub fn remove(&self, name: &str) -> Option<ObjectMeta> {
        self.entries.write().remove(name)
    }

    /// All entries, sorted by name
    pub fn list(&self) -> Vec<ObjectMeta> {
        let mut all: Vec<ObjectMeta> = self.entries.read().values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
