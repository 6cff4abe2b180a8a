//! Sled-based chunk store
//!
//! Persistent fragment storage for storage nodes. Fragments live in a
//! single sled tree keyed by the fragment id string. Sled is pure Rust and
//! needs no external services.

use crate::backend::{ChunkStore, StorageStats};
use crate::StorageConfig;
use bytes::Bytes;
use ecstore_core::error::{EcStoreError, Result};
use ecstore_core::placement::FragmentId;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Tree holding fragment bytes
const FRAGMENTS_TREE: &str = "fragments";

/// Sled-based chunk store
pub struct SledChunkStore {
    db: sled::Db,
    fragments: sled::Tree,

    /// Maximum capacity (0 = unlimited)
    max_capacity: u64,

    bytes_used: AtomicU64,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl SledChunkStore {
    /// Open or create a store in `config.path`
    pub fn open(config: &StorageConfig) -> Result<Self> {
        info!(path = ?config.path, "Opening sled chunk store");

        std::fs::create_dir_all(&config.path)?;
        let db = sled::open(&config.path).map_err(|e| {
            EcStoreError::Internal(format!("Failed to open sled at {:?}: {}", config.path, e))
        })?;

        Self::from_db(db, config.max_capacity)
    }

    /// Open a throwaway store (for testing)
    pub fn open_temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| EcStoreError::Internal(format!("Failed to open sled: {}", e)))?;
        Self::from_db(db, 0)
    }

    fn from_db(db: sled::Db, max_capacity: u64) -> Result<Self> {
        let fragments = db
            .open_tree(FRAGMENTS_TREE)
            .map_err(|e| EcStoreError::Internal(e.to_string()))?;

        let mut bytes_used = 0u64;
        for item in fragments.iter() {
            let (_, value) = item.map_err(|e| EcStoreError::ReadFailure(e.to_string()))?;
            bytes_used += value.len() as u64;
        }

        info!(
            fragments = fragments.len(),
            bytes_used, "Sled chunk store opened"
        );

        Ok(Self {
            db,
            fragments,
            max_capacity,
            bytes_used: AtomicU64::new(bytes_used),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        })
    }

    /// Get database size estimate
    pub fn size_on_disk(&self) -> u64 {
        self.db.size_on_disk().unwrap_or(0)
    }
}

impl ChunkStore for SledChunkStore {
    fn put(&self, id: &FragmentId, data: Bytes) -> Result<()> {
        let data_len = data.len() as u64;

        if self.max_capacity > 0 {
            let replaced = self
                .fragments
                .get(id.as_str())
                .map_err(|e| EcStoreError::WriteFailure(e.to_string()))?
                .map(|old| old.len() as u64)
                .unwrap_or(0);
            let current = self.bytes_used.load(Ordering::SeqCst);
            if !fits_capacity(current, replaced, data_len, self.max_capacity) {
                return Err(EcStoreError::WriteFailure(format!(
                    "storage full: {} of {} bytes used, {} more requested",
                    current, self.max_capacity, data_len
                )));
            }
        }

        let previous = self
            .fragments
            .insert(id.as_str(), &data[..])
            .map_err(|e| EcStoreError::WriteFailure(e.to_string()))?;

        // Add before subtracting so racing overwrites never wrap the counter.
        self.bytes_used.fetch_add(data_len, Ordering::SeqCst);
        if let Some(old) = previous {
            self.bytes_used.fetch_sub(old.len() as u64, Ordering::SeqCst);
        }
        self.writes.fetch_add(1, Ordering::Relaxed);

        debug!(id = %id, size = data_len, "Stored fragment");
        Ok(())
    }

    fn get(&self, id: &FragmentId) -> Result<Option<Bytes>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let value = self
            .fragments
            .get(id.as_str())
            .map_err(|e| EcStoreError::ReadFailure(e.to_string()))?;
        Ok(value.map(|v| Bytes::copy_from_slice(&v)))
    }

    fn exists(&self, id: &FragmentId) -> Result<bool> {
        self.fragments
            .contains_key(id.as_str())
            .map_err(|e| EcStoreError::ReadFailure(e.to_string()))
    }

    fn stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            fragment_count: self.fragments.len() as u64,
            bytes_used: self.bytes_used.load(Ordering::SeqCst),
            bytes_capacity: self.max_capacity,
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        })
    }

    fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| EcStoreError::WriteFailure(e.to_string()))?;
        Ok(())
    }
}

/// Whether replacing `replaced` bytes with `data_len` stays within `max`
///
/// `current` is read without a lock, so a racing overwrite can leave it
/// below `replaced`.
fn fits_capacity(current: u64, replaced: u64, data_len: u64, max: u64) -> bool {
    current.saturating_sub(replaced).saturating_add(data_len) <= max
}
