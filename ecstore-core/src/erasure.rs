//! Reed-Solomon Erasure Coding
//!
//! Systematic (k, m) coding over GF(2^8) where:
//! - k data fragments carry the zero-padded payload verbatim
//! - m parity fragments are linear combinations of the data fragments
//! - Any k of the k+m fragments are enough to rebuild the rest
//!
//! The generator matrix is `V * inverse(V_top)`, `V` being the (k+m) x k
//! Vandermonde matrix. Its top k rows are the identity, and every k-row
//! subset stays invertible.

use crate::error::{EcStoreError, Result};
use crate::galois;
use crate::matrix::Matrix;
use crate::{DATA_FRAGMENTS, MAX_TOTAL_FRAGMENTS, PARITY_FRAGMENTS};
use bytes::Bytes;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Erasure coding geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErasureConfig {
    /// Number of data fragments (k)
    pub data_fragments: usize,
    /// Number of parity fragments (m)
    pub parity_fragments: usize,
}

impl Default for ErasureConfig {
    fn default() -> Self {
        Self {
            data_fragments: DATA_FRAGMENTS,
            parity_fragments: PARITY_FRAGMENTS,
        }
    }
}

impl ErasureConfig {
    /// Create a new erasure config
    pub fn new(data_fragments: usize, parity_fragments: usize) -> Result<Self> {
        if data_fragments == 0 {
            return Err(EcStoreError::Configuration(
                "data_fragments must be > 0".to_string(),
            ));
        }
        if parity_fragments == 0 {
            return Err(EcStoreError::Configuration(
                "parity_fragments must be > 0".to_string(),
            ));
        }
        if data_fragments + parity_fragments > MAX_TOTAL_FRAGMENTS {
            return Err(EcStoreError::Configuration(format!(
                "data_fragments + parity_fragments must be <= {}, got {}",
                MAX_TOTAL_FRAGMENTS,
                data_fragments + parity_fragments
            )));
        }
        Ok(Self {
            data_fragments,
            parity_fragments,
        })
    }

    /// Total number of fragments
    pub fn total_fragments(&self) -> usize {
        self.data_fragments + self.parity_fragments
    }

    /// Storage overhead ratio (parity/data)
    pub fn overhead_ratio(&self) -> f64 {
        self.parity_fragments as f64 / self.data_fragments as f64
    }

    /// Maximum number of missing fragments that can be rebuilt
    pub fn max_failures(&self) -> usize {
        self.parity_fragments
    }

    /// Length of every fragment for a payload of `payload_len` bytes
    pub fn fragment_len(&self, payload_len: usize) -> usize {
        payload_len.div_ceil(self.data_fragments)
    }
}

/// Payload accepted by [`ErasureEncoder::decode_checked`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedDecode {
    pub payload: Vec<u8>,
    /// Present fragments that had to be thrown away as corrupt
    pub discarded: Vec<usize>,
}

/// Reed-Solomon encoder/decoder
///
/// Holds only the immutable generator matrix, so one instance can be
/// shared freely between threads.
#[derive(Debug, Clone)]
pub struct ErasureEncoder {
    config: ErasureConfig,
    matrix: Matrix,
}

impl ErasureEncoder {
    /// Create a new encoder with default configuration (4, 2)
    pub fn new() -> Result<Self> {
        Self::with_config(ErasureConfig::default())
    }

    /// Create a new encoder with custom configuration
    pub fn with_config(config: ErasureConfig) -> Result<Self> {
        let config = ErasureConfig::new(config.data_fragments, config.parity_fragments)?;
        let k = config.data_fragments;
        let vandermonde = Matrix::vandermonde(config.total_fragments(), k);
        let top = vandermonde.sub_matrix(0, 0, k, k);
        let matrix = vandermonde.multiply(&top.invert()?)?;
        Ok(Self { config, matrix })
    }

    /// Get the erasure configuration
    pub fn config(&self) -> &ErasureConfig {
        &self.config
    }

    /// Encode a payload into k data and m parity fragments
    pub fn encode(&self, payload: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut fragments = self.split(payload)?;
        let parity: Vec<Vec<u8>> = (self.config.data_fragments..self.config.total_fragments())
            .map(|row| self.code_row(row, &fragments))
            .collect();
        fragments.extend(parity);
        Ok(fragments)
    }

    /// Encode computing parity rows in parallel
    ///
    /// Produces exactly the same fragments as [`encode`](Self::encode).
    pub fn encode_parallel(&self, payload: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut fragments = self.split(payload)?;
        let parity: Vec<Vec<u8>> = (self.config.data_fragments..self.config.total_fragments())
            .into_par_iter()
            .map(|row| self.code_row(row, &fragments))
            .collect();
        fragments.extend(parity);
        Ok(fragments)
    }

    /// Check that every fragment is present, all have the same length and
    /// the parity fragments match the data fragments.
    pub fn verify(&self, fragments: &[Option<Vec<u8>>]) -> bool {
        if fragments.len() != self.config.total_fragments() {
            return false;
        }
        let present: Option<Vec<&Vec<u8>>> = fragments.iter().map(|f| f.as_ref()).collect();
        let Some(present) = present else {
            return false;
        };
        let len = present[0].len();
        if present.iter().any(|f| f.len() != len) {
            return false;
        }

        let data: Vec<&[u8]> = present[..self.config.data_fragments]
            .iter()
            .map(|f| f.as_slice())
            .collect();
        (self.config.data_fragments..self.config.total_fragments())
            .all(|row| self.code_row(row, &data) == *present[row])
    }

    /// Rebuild absent fragments in place
    ///
    /// Missing entries are `None`. With nothing missing this is a no-op.
    /// Fails with [`EcStoreError::Unrecoverable`] when more than m entries
    /// are absent.
    pub fn reconstruct(&self, fragments: &mut [Option<Vec<u8>>]) -> Result<()> {
        let k = self.config.data_fragments;
        let total = self.config.total_fragments();

        if fragments.len() != total {
            return Err(EcStoreError::InvalidInput(format!(
                "expected {} fragments, got {}",
                total,
                fragments.len()
            )));
        }

        let present: Vec<usize> = (0..total).filter(|&i| fragments[i].is_some()).collect();
        let missing = total - present.len();
        if missing == 0 {
            return Ok(());
        }
        if missing > self.config.max_failures() {
            return Err(EcStoreError::Unrecoverable {
                missing,
                tolerated: self.config.max_failures(),
            });
        }

        let fragment_len = fragment_size(fragments)?;

        // Any k surviving rows of the generator determine the data fragments.
        let rows = &present[..k];
        let decode = self.matrix.select_rows(rows).invert()?;

        let recovered: Vec<(usize, Vec<u8>)> = {
            let sources: Vec<&[u8]> = rows
                .iter()
                .filter_map(|&r| fragments[r].as_deref())
                .collect();
            (0..k)
                .filter(|&d| fragments[d].is_none())
                .map(|d| {
                    let mut out = vec![0u8; fragment_len];
                    for (j, src) in sources.iter().enumerate() {
                        galois::mul_slice_add(decode.get(d, j), src, &mut out);
                    }
                    (d, out)
                })
                .collect()
        };
        for (index, data) in recovered {
            fragments[index] = Some(data);
        }

        let parity: Vec<(usize, Vec<u8>)> = {
            let data: Vec<&[u8]> = fragments[..k]
                .iter()
                .filter_map(|f| f.as_deref())
                .collect();
            (k..total)
                .filter(|&p| fragments[p].is_none())
                .map(|p| (p, self.code_row(p, &data)))
                .collect()
        };
        for (index, data) in parity {
            fragments[index] = Some(data);
        }

        Ok(())
    }

    /// Write the first `original_len` bytes of the data region to `out`
    pub fn join<W: Write>(
        &self,
        out: &mut W,
        fragments: &[Option<Vec<u8>>],
        original_len: usize,
    ) -> Result<()> {
        let k = self.config.data_fragments;
        if fragments.len() < k {
            return Err(EcStoreError::InvalidInput(format!(
                "expected at least {} fragments, got {}",
                k,
                fragments.len()
            )));
        }

        let mut data = Vec::with_capacity(k);
        for (index, fragment) in fragments[..k].iter().enumerate() {
            match fragment {
                Some(bytes) => data.push(bytes.as_slice()),
                None => return Err(EcStoreError::IncompleteInput { index }),
            }
        }

        let region: usize = data.iter().map(|f| f.len()).sum();
        if original_len > region {
            return Err(EcStoreError::InvalidInput(format!(
                "original length {} exceeds data region of {} bytes",
                original_len, region
            )));
        }

        let mut remaining = original_len;
        for fragment in data {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(fragment.len());
            out.write_all(&fragment[..take])?;
            remaining -= take;
        }
        Ok(())
    }

    /// Reconstruct then join into a fresh buffer
    pub fn decode(&self, fragments: &mut [Option<Vec<u8>>], original_len: usize) -> Result<Bytes> {
        self.reconstruct(fragments)?;
        let mut out = Vec::with_capacity(original_len);
        self.join(&mut out, fragments, original_len)?;
        Ok(Bytes::from(out))
    }

    /// Reconstruct and join, accepting only a payload that passes `accept`
    ///
    /// Present fragments may hold wrong bytes of the right length. When the
    /// straight decode is rejected, every set of up to m minus absent
    /// fragments is discarded in turn, smallest sets first, and the decode
    /// retried. Fails with [`EcStoreError::IntegrityMismatch`] when no set
    /// yields an accepted payload.
    pub fn decode_checked<F>(
        &self,
        mut fragments: Vec<Option<Vec<u8>>>,
        original_len: usize,
        accept: F,
    ) -> Result<CheckedDecode>
    where
        F: Fn(&[u8]) -> bool,
    {
        let absent: Vec<usize> = (0..fragments.len())
            .filter(|&i| fragments[i].is_none())
            .collect();
        let present: Vec<usize> = (0..fragments.len())
            .filter(|&i| fragments[i].is_some())
            .collect();
        let budget = self.config.max_failures().saturating_sub(absent.len());

        // Kept aside so discarded sets can be retried against the fetched bytes.
        let fetched = if budget > 0 {
            Some(fragments.clone())
        } else {
            None
        };

        if let Some(payload) = self.try_decode(&mut fragments, original_len, &accept)? {
            return Ok(CheckedDecode {
                payload,
                discarded: Vec::new(),
            });
        }

        if let Some(fetched) = fetched {
            for size in 1..=budget {
                for discard in combinations(&present, size) {
                    let mut attempt = fetched.clone();
                    for &index in &discard {
                        attempt[index] = None;
                    }
                    if let Some(payload) = self.try_decode(&mut attempt, original_len, &accept)? {
                        return Ok(CheckedDecode {
                            payload,
                            discarded: discard,
                        });
                    }
                }
            }
        }

        Err(EcStoreError::IntegrityMismatch)
    }

    /// One decode attempt; `Ok(None)` when the result is rejected
    fn try_decode<F>(
        &self,
        fragments: &mut [Option<Vec<u8>>],
        original_len: usize,
        accept: &F,
    ) -> Result<Option<Vec<u8>>>
    where
        F: Fn(&[u8]) -> bool,
    {
        self.reconstruct(fragments)?;
        let mut out = Vec::with_capacity(original_len);
        self.join(&mut out, fragments, original_len)?;
        Ok(accept(&out).then_some(out))
    }

    /// Split the payload into k zero-padded data fragments
    fn split(&self, payload: &[u8]) -> Result<Vec<Vec<u8>>> {
        if payload.is_empty() {
            return Err(EcStoreError::InvalidInput(
                "cannot encode an empty payload".to_string(),
            ));
        }
        let fragment_len = self.config.fragment_len(payload.len());
        let mut fragments = Vec::with_capacity(self.config.total_fragments());
        for i in 0..self.config.data_fragments {
            let start = (i * fragment_len).min(payload.len());
            let end = ((i + 1) * fragment_len).min(payload.len());
            let mut fragment = payload[start..end].to_vec();
            fragment.resize(fragment_len, 0);
            fragments.push(fragment);
        }
        Ok(fragments)
    }

    /// Linear combination of the data fragments for one generator row
    fn code_row<D: AsRef<[u8]>>(&self, row: usize, data: &[D]) -> Vec<u8> {
        let len = data.first().map(|d| d.as_ref().len()).unwrap_or(0);
        let mut out = vec![0u8; len];
        for (j, fragment) in data.iter().enumerate() {
            galois::mul_slice_add(self.matrix.get(row, j), fragment.as_ref(), &mut out);
        }
        out
    }
}

/// Every `size`-element subset of `items`, in lexicographic order
fn combinations(items: &[usize], size: usize) -> Vec<Vec<usize>> {
    if size == 0 {
        return vec![Vec::new()];
    }
    if items.len() < size {
        return Vec::new();
    }
    let mut out = Vec::new();
    for (i, &first) in items.iter().enumerate() {
        for mut rest in combinations(&items[i + 1..], size - 1) {
            rest.insert(0, first);
            out.push(rest);
        }
    }
    out
}

/// Common length of the present fragments
fn fragment_size(fragments: &[Option<Vec<u8>>]) -> Result<usize> {
    let mut sizes = fragments.iter().flatten().map(|f| f.len());
    let first = sizes
        .next()
        .ok_or_else(|| EcStoreError::InvalidInput("no fragments present".to_string()))?;
    if first == 0 {
        return Err(EcStoreError::InvalidInput("fragments are empty".to_string()));
    }
    if sizes.any(|len| len != first) {
        return Err(EcStoreError::InvalidInput(
            "present fragments differ in length".to_string(),
        ));
    }
    Ok(first)
}

/// Convenience function to encode data with default configuration
pub fn encode(payload: &[u8]) -> Result<Vec<Vec<u8>>> {
    ErasureEncoder::new()?.encode(payload)
}

/// Convenience function to decode fragments with default configuration
pub fn decode(fragments: &mut [Option<Vec<u8>>], original_len: usize) -> Result<Bytes> {
    ErasureEncoder::new()?.decode(fragments, original_len)
}
