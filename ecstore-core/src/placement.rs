//! Fragment naming and node placement
//!
//! Placement is a pure function of the fragment index and the node count
//! recorded for the object. Nothing here looks at node load or capacity.

use crate::error::{EcStoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier a storage node files a fragment under
///
/// Format: `{object name}_shard_{index}`
/// Example: `report.pdf_shard_3`
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FragmentId(String);

impl FragmentId {
    /// Derive the id of fragment `index` of object `name`
    pub fn derive(name: &str, index: usize) -> Self {
        Self(format!("{}_shard_{}", name, index))
    }

    /// Wrap an id received over the wire
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FragmentId({})", self.0)
    }
}

impl AsRef<str> for FragmentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Whether a fragment carries payload bytes or parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentRole {
    Data,
    Parity,
}

impl FragmentRole {
    /// Role of fragment `index` under `data_fragments` data fragments
    pub fn of(index: usize, data_fragments: usize) -> Self {
        if index < data_fragments {
            FragmentRole::Data
        } else {
            FragmentRole::Parity
        }
    }
}

impl fmt::Display for FragmentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentRole::Data => f.write_str("data"),
            FragmentRole::Parity => f.write_str("parity"),
        }
    }
}

/// Node that holds fragment `index` when the object is spread over
/// `node_count` nodes.
pub fn node_for(index: usize, node_count: usize) -> Result<usize> {
    if node_count == 0 {
        return Err(EcStoreError::Configuration(
            "no storage nodes to place fragments on".to_string(),
        ));
    }
    Ok(index % node_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_fragment_id_format() {
        assert_eq!(FragmentId::derive("photo.jpg", 0).as_str(), "photo.jpg_shard_0");
        assert_eq!(FragmentId::derive("a", 5).to_string(), "a_shard_5");
        assert_eq!(FragmentId::derive("a", 5), FragmentId::from_raw("a_shard_5"));
    }

    #[test]
    fn test_fragment_ids_unique_per_pair() {
        let names = ["a", "b", "report.pdf", "x_y", "a_shard_1"];
        let mut seen = HashSet::new();
        for name in names {
            for index in 0..6 {
                assert!(seen.insert(FragmentId::derive(name, index)));
            }
        }
        assert_eq!(seen.len(), names.len() * 6);
    }

    #[test]
    fn test_fragment_role() {
        assert_eq!(FragmentRole::of(0, 4), FragmentRole::Data);
        assert_eq!(FragmentRole::of(3, 4), FragmentRole::Data);
        assert_eq!(FragmentRole::of(4, 4), FragmentRole::Parity);
        assert_eq!(FragmentRole::of(5, 4).to_string(), "parity");
    }

    #[test]
    fn test_node_for_round_robin() {
        let nodes: Vec<usize> = (0..6).map(|i| node_for(i, 3).unwrap()).collect();
        assert_eq!(nodes, vec![0, 1, 2, 0, 1, 2]);

        for i in 0..6 {
            assert_eq!(node_for(i, 3).unwrap(), node_for(i, 3).unwrap());
            assert_eq!(node_for(i, 1).unwrap(), 0);
        }
    }

    #[test]
    fn test_node_for_without_nodes() {
        assert!(matches!(
            node_for(0, 0),
            Err(EcStoreError::Configuration(_))
        ));
    }
}
