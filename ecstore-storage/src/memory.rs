//! In-memory chunk store
//!
//! Used for testing and for nodes started with `--memory`. Not persistent.

use crate::backend::{ChunkStore, StorageStats};
use bytes::Bytes;
use ecstore_core::error::{EcStoreError, Result};
use ecstore_core::placement::FragmentId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory chunk store
pub struct MemoryChunkStore {
    /// Fragment storage
    fragments: RwLock<HashMap<FragmentId, Bytes>>,

    /// Maximum capacity (0 = unlimited)
    max_capacity: u64,

    /// Current bytes used
    bytes_used: AtomicU64,

    /// Operation counters
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemoryChunkStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create with a maximum capacity
    pub fn with_capacity(max_bytes: u64) -> Self {
        Self {
            fragments: RwLock::new(HashMap::new()),
            max_capacity: max_bytes,
            bytes_used: AtomicU64::new(0),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Clear all stored fragments
    pub fn clear(&self) {
        let mut fragments = self.fragments.write();
        fragments.clear();
        self.bytes_used.store(0, Ordering::SeqCst);
    }
}

impl Default for MemoryChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkStore for MemoryChunkStore {
    fn put(&self, id: &FragmentId, data: Bytes) -> Result<()> {
        let data_len = data.len() as u64;
        let mut fragments = self.fragments.write();

        // Overwrites only need room for the size difference.
        let replaced = fragments.get(id).map(|old| old.len() as u64).unwrap_or(0);
        if self.max_capacity > 0 {
            let current = self.bytes_used.load(Ordering::SeqCst);
            if current - replaced + data_len > self.max_capacity {
                return Err(EcStoreError::WriteFailure(format!(
                    "storage full: {} of {} bytes used, {} more requested",
                    current, self.max_capacity, data_len
                )));
            }
        }

        fragments.insert(id.clone(), data);
        self.bytes_used.fetch_sub(replaced, Ordering::SeqCst);
        self.bytes_used.fetch_add(data_len, Ordering::SeqCst);
        self.writes.fetch_add(1, Ordering::Relaxed);

        Ok(())
    }

    fn get(&self, id: &FragmentId) -> Result<Option<Bytes>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let fragments = self.fragments.read();
        Ok(fragments.get(id).cloned())
    }

    fn exists(&self, id: &FragmentId) -> Result<bool> {
        let fragments = self.fragments.read();
        Ok(fragments.contains_key(id))
    }

    fn stats(&self) -> Result<StorageStats> {
        let fragments = self.fragments.read();
        Ok(StorageStats {
            fragment_count: fragments.len() as u64,
            bytes_used: self.bytes_used.load(Ordering::SeqCst),
            bytes_capacity: self.max_capacity,
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        })
    }

    fn flush(&self) -> Result<()> {
        // No-op for in-memory storage
        Ok(())
    }
}
