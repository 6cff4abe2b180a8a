//! Chunk store trait
//!
//! Defines the interface every fragment store on a storage node follows.

use bytes::Bytes;
use ecstore_core::error::Result;
use ecstore_core::placement::FragmentId;

/// Storage statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageStats {
    /// Total number of fragments stored
    pub fragment_count: u64,

    /// Total bytes used by fragments
    pub bytes_used: u64,

    /// Total storage capacity (0 = unlimited)
    pub bytes_capacity: u64,

    /// Number of read operations
    pub reads: u64,

    /// Number of write operations
    pub writes: u64,
}

impl StorageStats {
    /// Calculate usage percentage
    pub fn usage_percent(&self) -> f64 {
        if self.bytes_capacity == 0 {
            0.0
        } else {
            (self.bytes_used as f64 / self.bytes_capacity as f64) * 100.0
        }
    }

    /// Check if storage is full
    pub fn is_full(&self) -> bool {
        self.bytes_capacity > 0 && self.bytes_used >= self.bytes_capacity
    }

    /// Available space in bytes
    pub fn bytes_available(&self) -> u64 {
        if self.bytes_capacity == 0 {
            u64::MAX
        } else {
            self.bytes_capacity.saturating_sub(self.bytes_used)
        }
    }
}

/// Byte store keyed by fragment id
///
/// Implementations must be Send + Sync so one store can back every RPC
/// handler of a node.
pub trait ChunkStore: Send + Sync {
    /// Store a fragment, replacing whatever was stored under the same id
    fn put(&self, id: &FragmentId, data: Bytes) -> Result<()>;

    /// Retrieve a fragment. Unknown ids yield `Ok(None)`.
    fn get(&self, id: &FragmentId) -> Result<Option<Bytes>>;

    /// Check if a fragment exists
    fn exists(&self, id: &FragmentId) -> Result<bool>;

    /// Get storage statistics
    fn stats(&self) -> Result<StorageStats>;

    /// Flush any pending writes
    fn flush(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_helpers() {
        let unlimited = StorageStats {
            bytes_used: 500,
            ..Default::default()
        };
        assert_eq!(unlimited.usage_percent(), 0.0);
        assert!(!unlimited.is_full());
        assert_eq!(unlimited.bytes_available(), u64::MAX);

        let bounded = StorageStats {
            bytes_used: 250,
            bytes_capacity: 1000,
            ..Default::default()
        };
        assert_eq!(bounded.usage_percent(), 25.0);
        assert_eq!(bounded.bytes_available(), 750);

        let full = StorageStats {
            bytes_used: 1000,
            bytes_capacity: 1000,
            ..Default::default()
        };
        assert!(full.is_full());
        assert_eq!(full.bytes_available(), 0);
    }
}
