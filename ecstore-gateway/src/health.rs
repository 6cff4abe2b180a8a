//! Storage node liveness probe
//!
//! A node is "alive" if a TCP connection to its endpoint succeeds within the
//! probe timeout. Results are never cached and nothing else consults them.

use futures::future::join_all;
use serde::Serialize;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Alive,
    Dead,
}

/// Probe result for one configured node
#[derive(Debug, Clone, Serialize)]
pub struct NodeStatus {
    /// 1-based position in the registry
    pub id: usize,
    pub name: String,
    pub address: String,
    pub status: NodeState,
}

/// Try a TCP connect to `address`
pub async fn probe_node(address: &str, timeout: Duration) -> NodeState {
    match tokio::time::timeout(timeout, TcpStream::connect(address)).await {
        Ok(Ok(_stream)) => NodeState::Alive,
        Ok(Err(e)) => {
            debug!(addr = %address, error = %e, "Probe connect failed");
            NodeState::Dead
        }
        Err(_) => {
            debug!(addr = %address, "Probe timed out");
            NodeState::Dead
        }
    }
}

/// Probe every address concurrently, preserving order
pub async fn probe_all(addresses: &[String], timeout: Duration) -> Vec<NodeStatus> {
    let probes = addresses.iter().enumerate().map(|(i, address)| async move {
        NodeStatus {
            id: i + 1,
            name: format!("Storage-{}", i + 1),
            address: address.clone(),
            status: probe_node(address, timeout).await,
        }
    });
    join_all(probes).await
}
