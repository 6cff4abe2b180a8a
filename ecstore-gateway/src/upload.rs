//! Upload orchestration
//!
//! Encodes a payload, records its metadata, then pushes every fragment to
//! its node concurrently. Individual store failures are reported, never
//! retried, and never abort the other stores.

use bytes::Bytes;
use chrono::Utc;
use ecstore_core::error::{EcStoreError, Result};
use ecstore_core::placement::{FragmentId, FragmentRole};
use ecstore_core::ErasureEncoder;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::metadata::{ObjectMeta, ObjectMetadataTable};
use crate::metrics;
use crate::registry::NodeRegistry;
use crate::BLOCKING_CODEC_THRESHOLD;

/// How an upload's fragment stores are judged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributionPolicy {
    /// Retries per failed store (always 0: stores are attempted once)
    pub max_retries: u32,
    /// Stores needed for the object to stay reconstructible
    pub min_successful_stores: usize,
}

impl DistributionPolicy {
    /// Policy for objects with `data_fragments` data fragments
    pub fn new(data_fragments: usize) -> Self {
        Self {
            max_retries: 0,
            min_successful_stores: data_fragments,
        }
    }

    pub fn is_recoverable(&self, report: &UploadReport) -> bool {
        report.stored >= self.min_successful_stores
    }
}

/// One fragment that could not be stored
#[derive(Debug, Clone, Serialize)]
pub struct FragmentFailure {
    pub index: usize,
    pub role: FragmentRole,
    /// Position of the target node in the registry
    pub node: usize,
    pub address: String,
    pub error: String,
}

/// Aggregate outcome of an upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub name: String,
    pub size: u64,
    pub stored: usize,
    pub failed: Vec<FragmentFailure>,
}

impl UploadReport {
    /// Whether any fragment failed to store
    pub fn is_degraded(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Drives the upload of one object at a time; cheap to share
pub struct UploadOrchestrator {
    encoder: ErasureEncoder,
    registry: Arc<NodeRegistry>,
    metadata: ObjectMetadataTable,
    rpc_timeout: Duration,
    policy: DistributionPolicy,
}

impl UploadOrchestrator {
    pub fn new(
        encoder: ErasureEncoder,
        registry: Arc<NodeRegistry>,
        metadata: ObjectMetadataTable,
        rpc_timeout: Duration,
    ) -> Self {
        let policy = DistributionPolicy::new(encoder.config().data_fragments);
        Self {
            encoder,
            registry,
            metadata,
            rpc_timeout,
            policy,
        }
    }

    pub fn policy(&self) -> &DistributionPolicy {
        &self.policy
    }

    /// Encode and distribute `payload` under `name`
    ///
    /// Metadata is recorded before any fragment is confirmed stored.
    /// Re-uploading a name rewrites every fragment at the same ids.
    #[instrument(skip(self, payload), fields(name = %name, size = payload.len()))]
    pub async fn upload(&self, name: &str, payload: Bytes) -> Result<UploadReport> {
        if self.registry.is_empty() {
            return Err(EcStoreError::Configuration(
                "no storage nodes configured".to_string(),
            ));
        }
        if name.is_empty() {
            return Err(EcStoreError::InvalidInput(
                "object name cannot be empty".to_string(),
            ));
        }

        let fragments = self.encode(payload.clone()).await?;
        let config = self.encoder.config();

        let previous = self.metadata.insert(ObjectMeta {
            name: name.to_string(),
            size: payload.len() as u64,
            data_fragments: config.data_fragments,
            parity_fragments: config.parity_fragments,
            node_count: self.registry.len(),
            content_hash: blake3::hash(&payload).to_hex().to_string(),
            uploaded_at: Utc::now(),
        });
        if previous.is_some() {
            debug!("Replacing existing object");
        }

        let mut tasks = Vec::with_capacity(fragments.len());
        for (index, fragment) in fragments.into_iter().enumerate() {
            let (position, node) = self.registry.node_for_fragment(index)?;
            let id = FragmentId::derive(name, index);
            let address = node.address().to_string();
            let timeout = self.rpc_timeout;

            let handle = tokio::spawn(async move {
                match tokio::time::timeout(timeout, node.store(id, Bytes::from(fragment))).await {
                    Ok(result) => result,
                    Err(_) => Err(EcStoreError::Timeout {
                        addr: node.address().to_string(),
                        millis: timeout.as_millis() as u64,
                    }),
                }
            });
            tasks.push((index, position, address, handle));
        }

        let mut stored = 0;
        let mut failed = Vec::new();
        for (index, position, address, handle) in tasks {
            let outcome = handle
                .await
                .unwrap_or_else(|e| Err(EcStoreError::Internal(format!("store task failed: {}", e))));
            match outcome {
                Ok(()) => {
                    debug!(index, node = position, addr = %address, "Fragment stored");
                    stored += 1;
                }
                Err(e) => {
                    warn!(index, node = position, addr = %address, error = %e, "Failed to store fragment");
                    metrics::record_store_failure();
                    failed.push(FragmentFailure {
                        index,
                        role: FragmentRole::of(index, config.data_fragments),
                        node: position,
                        address,
                        error: e.to_string(),
                    });
                }
            }
        }

        let report = UploadReport {
            name: name.to_string(),
            size: payload.len() as u64,
            stored,
            failed,
        };

        metrics::record_upload(report.size);
        if self.policy.is_recoverable(&report) {
            info!(stored, failed = report.failed.len(), "Upload complete");
        } else {
            warn!(
                stored,
                failed = report.failed.len(),
                needed = self.policy.min_successful_stores,
                "Upload stored too few fragments to be recoverable"
            );
        }
        Ok(report)
    }

    async fn encode(&self, payload: Bytes) -> Result<Vec<Vec<u8>>> {
        let result = if payload.len() >= BLOCKING_CODEC_THRESHOLD {
            let encoder = self.encoder.clone();
            tokio::task::spawn_blocking(move || encoder.encode_parallel(&payload))
                .await
                .map_err(|e| EcStoreError::Internal(format!("encode task failed: {}", e)))?
        } else {
            self.encoder.encode(&payload)
        };

        result.map_err(|e| match e {
            EcStoreError::InvalidInput(_) => e,
            other => EcStoreError::EncodingFailed(other.to_string()),
        })
    }
}
