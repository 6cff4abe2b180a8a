//! ecstore Core Library
//!
//! Core abstractions for the ecstore erasure-coded object store.
//! This crate provides:
//! - Reed-Solomon erasure coding over GF(2^8) (4 data + 2 parity fragments by default)
//! - Fragment naming and round-robin node placement
//! - Common error handling

pub mod erasure;
pub mod error;
pub mod galois;
pub mod matrix;
pub mod placement;

pub use erasure::{CheckedDecode, ErasureConfig, ErasureEncoder};
pub use error::{EcStoreError, Result};
pub use placement::{node_for, FragmentId, FragmentRole};

/// Default erasure coding configuration
/// - 4 data fragments: minimum required to reconstruct
/// - 2 parity fragments: can tolerate 2 missing fragments
/// - 6 total fragments spread over the storage nodes
pub const DATA_FRAGMENTS: usize = 4;
pub const PARITY_FRAGMENTS: usize = 2;
pub const TOTAL_FRAGMENTS: usize = DATA_FRAGMENTS + PARITY_FRAGMENTS;

/// Largest k+m a GF(2^8) Vandermonde generator supports.
pub const MAX_TOTAL_FRAGMENTS: usize = 256;
