//! Error types for ecstore
//!
//! Provides a unified error type for coding, placement and storage operations.

use thiserror::Error;

/// Result type alias for ecstore operations
pub type Result<T> = std::result::Result<T, EcStoreError>;

/// Unified error type for ecstore
#[derive(Error, Debug)]
pub enum EcStoreError {
    // ===== Coding Errors =====
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Unrecoverable: {missing} fragments missing, at most {tolerated} can be rebuilt")]
    Unrecoverable { missing: usize, tolerated: usize },

    #[error("Incomplete input: data fragment {index} is missing")]
    IncompleteInput { index: usize },

    #[error("Matrix is singular")]
    SingularMatrix,

    // ===== Storage Errors =====
    #[error("Write failure: {0}")]
    WriteFailure(String),

    #[error("Read failure: {0}")]
    ReadFailure(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // ===== Transport Errors =====
    #[error("Node unreachable: {0}")]
    Unreachable(String),

    #[error("Timed out after {millis}ms talking to {addr}")]
    Timeout { addr: String, millis: u64 },

    // ===== Placement / Integrity Errors =====
    #[error("Placement changed: object stored across {recorded} nodes, registry now has {current}")]
    PlacementChanged { recorded: usize, current: usize },

    #[error("Integrity check failed: content hash does not match recorded hash")]
    IntegrityMismatch,

    // ===== I/O Errors =====
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ===== Serialization Errors =====
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ===== Configuration Errors =====
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ===== Generic Errors =====
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EcStoreError {
    /// Whether a failed fragment fetch should simply mark the fragment absent.
    pub fn is_absent_marker(&self) -> bool {
        matches!(
            self,
            EcStoreError::NotFound(_)
                | EcStoreError::Unreachable(_)
                | EcStoreError::Timeout { .. }
                | EcStoreError::ReadFailure(_)
        )
    }
}
