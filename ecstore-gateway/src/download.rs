//! Download orchestration
//!
//! Fetches every fragment of an object concurrently, each under its own
//! deadline, then rebuilds what is missing or corrupt and writes the
//! original bytes.

use ecstore_core::error::{EcStoreError, Result};
use ecstore_core::placement::FragmentId;
use ecstore_core::{CheckedDecode, ErasureEncoder};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, instrument, warn};

use crate::metadata::{ObjectMeta, ObjectMetadataTable};
use crate::metrics;
use crate::registry::NodeRegistry;
use crate::BLOCKING_CODEC_THRESHOLD;

/// Outcome of a successful download
#[derive(Debug, Clone, Serialize)]
pub struct DownloadReport {
    pub name: String,
    pub size: u64,
    /// Fragments that arrived intact
    pub fetched: usize,
    /// Indices that had to be rebuilt
    pub missing: Vec<usize>,
    /// Indices fetched intact-looking but thrown away as corrupt
    pub discarded: Vec<usize>,
    pub reconstructed: bool,
}

pub struct DownloadOrchestrator {
    encoder: ErasureEncoder,
    registry: Arc<NodeRegistry>,
    metadata: ObjectMetadataTable,
    rpc_timeout: Duration,
}

impl DownloadOrchestrator {
    pub fn new(
        encoder: ErasureEncoder,
        registry: Arc<NodeRegistry>,
        metadata: ObjectMetadataTable,
        rpc_timeout: Duration,
    ) -> Self {
        Self {
            encoder,
            registry,
            metadata,
            rpc_timeout,
        }
    }

    /// Download `name` into `sink`
    ///
    /// Nothing is written to `sink` unless the object was rebuilt and its
    /// content hash matches the one recorded at upload. Up to m fragments
    /// may be absent or corrupt in total.
    #[instrument(skip(self, sink), fields(name = %name))]
    pub async fn download<W>(&self, name: &str, sink: &mut W) -> Result<DownloadReport>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let started = Instant::now();
        let result = self.download_inner(name, sink).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(EcStoreError::NotFound(_)) => "not_found",
            Err(_) => "failed",
        };
        metrics::record_download(outcome, started.elapsed().as_secs_f64());
        result
    }

    async fn download_inner<W>(&self, name: &str, sink: &mut W) -> Result<DownloadReport>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let meta = self
            .metadata
            .get(name)
            .ok_or_else(|| EcStoreError::NotFound(name.to_string()))?;

        if self.registry.len() != meta.node_count {
            return Err(EcStoreError::PlacementChanged {
                recorded: meta.node_count,
                current: self.registry.len(),
            });
        }

        let encoder = self.encoder_for(&meta)?;
        let fragments = self.fetch_all(&meta).await?;

        let missing: Vec<usize> = fragments
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_none())
            .map(|(i, _)| i)
            .collect();
        let fetched = fragments.len() - missing.len();
        debug!(fetched, missing = ?missing, "Fragments collected");

        let size = meta.size as usize;
        let decoded = if size >= BLOCKING_CODEC_THRESHOLD {
            let expected = meta.content_hash.clone();
            tokio::task::spawn_blocking(move || {
                encoder.decode_checked(fragments, size, |p| matches_hash(p, &expected))
            })
            .await
            .map_err(|e| EcStoreError::Internal(format!("decode task failed: {}", e)))?
        } else {
            encoder.decode_checked(fragments, size, |p| matches_hash(p, &meta.content_hash))
        };
        let CheckedDecode { payload, discarded } = decoded.inspect_err(|e| {
            if matches!(e, EcStoreError::IntegrityMismatch) {
                warn!("No fragment combination matches the recorded hash");
            }
        })?;

        if !discarded.is_empty() {
            warn!(corrupt = ?discarded, "Discarded fragments that failed the content hash");
        }
        let reconstructed = !missing.is_empty() || !discarded.is_empty();
        if reconstructed {
            metrics::record_reconstruction();
            info!(rebuilt = ?missing, corrupt = ?discarded, "Rebuilt missing fragments");
        }

        sink.write_all(&payload).await?;
        sink.flush().await?;
        metrics::record_bytes_downloaded(meta.size);

        info!(size = meta.size, fetched, reconstructed, "Download complete");
        Ok(DownloadReport {
            name: name.to_string(),
            size: meta.size,
            fetched,
            missing,
            discarded,
            reconstructed,
        })
    }

    /// Encoder for the geometry the object was written with
    fn encoder_for(&self, meta: &ObjectMeta) -> Result<ErasureEncoder> {
        let recorded = meta.erasure_config()?;
        if recorded == *self.encoder.config() {
            Ok(self.encoder.clone())
        } else {
            ErasureEncoder::with_config(recorded)
        }
    }

    /// Fetch every fragment concurrently; failures become `None`
    async fn fetch_all(&self, meta: &ObjectMeta) -> Result<Vec<Option<Vec<u8>>>> {
        let expected_len = meta.fragment_len();
        let mut tasks = Vec::with_capacity(meta.total_fragments());

        for index in 0..meta.total_fragments() {
            let (position, node) = self.registry.node_for_fragment(index)?;
            let id = FragmentId::derive(&meta.name, index);
            let timeout = self.rpc_timeout;

            let handle = tokio::spawn(async move {
                match tokio::time::timeout(timeout, node.fetch(id)).await {
                    Ok(result) => result,
                    Err(_) => Err(EcStoreError::Timeout {
                        addr: node.address().to_string(),
                        millis: timeout.as_millis() as u64,
                    }),
                }
            });
            tasks.push((index, position, handle));
        }

        let mut fragments = Vec::with_capacity(tasks.len());
        for (index, position, handle) in tasks {
            let outcome = handle
                .await
                .unwrap_or_else(|e| Err(EcStoreError::Internal(format!("fetch task failed: {}", e))));

            let fragment = match outcome {
                Ok(Some(bytes)) if bytes.len() == expected_len => {
                    debug!(index, node = position, "Fragment fetched");
                    Some(bytes.to_vec())
                }
                Ok(Some(bytes)) => {
                    warn!(
                        index,
                        node = position,
                        len = bytes.len(),
                        expected = expected_len,
                        "Discarding fragment with wrong length"
                    );
                    metrics::record_fetch_failure();
                    None
                }
                Ok(None) => {
                    warn!(index, node = position, "Fragment missing on node");
                    metrics::record_fetch_failure();
                    None
                }
                Err(e) if e.is_absent_marker() => {
                    warn!(index, node = position, error = %e, "Failed to fetch fragment");
                    metrics::record_fetch_failure();
                    None
                }
                Err(e) => {
                    error!(index, node = position, error = %e, "Unexpected fetch error");
                    metrics::record_fetch_failure();
                    None
                }
            };
            fragments.push(fragment);
        }

        Ok(fragments)
    }
}

fn matches_hash(payload: &[u8], expected_hex: &str) -> bool {
    blake3::hash(payload).to_hex().as_str() == expected_hex
}
