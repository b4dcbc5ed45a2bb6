//! Wire types shared between coordinator and node: the cluster-wide view
//! of membership and shard assignment, plus the registration handshake.

use serde::{Deserialize, Serialize};

/// Health as observed by the coordinator's health monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Suspect,
    Down,
}

/// Public view of a node, as sent to clients and broadcast to peers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeView {
    pub id: String,
    pub address: String,
    pub status: HealthStatus,
    pub shards: Vec<u32>,
}

/// Assignment of one shard to the node currently responsible for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub shard_id: u32,
    pub node_id: String,
}

/// The coordinator's authoritative snapshot of the cluster, tagged with a
/// monotonically increasing version. Nodes discard any broadcast whose
/// version does not strictly exceed the version they already hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterState {
    pub version: u64,
    pub shard_count: u32,
    pub nodes: Vec<NodeView>,
    pub assignments: Vec<Assignment>,
}

impl ClusterState {
    pub fn empty(shard_count: u32) -> Self {
        Self {
            version: 0,
            shard_count,
            nodes: Vec::new(),
            assignments: Vec::new(),
        }
    }

    pub fn node_for_shard(&self, shard_id: u32) -> Option<&str> {
        self.assignments
            .iter()
            .find(|a| a.shard_id == shard_id)
            .map(|a| a.node_id.as_str())
    }

    pub fn address_of(&self, node_id: &str) -> Option<&str> {
        self.nodes.iter().find(|n| n.id == node_id).map(|n| n.address.as_str())
    }
}

/// Body of a node's `POST /cluster/register` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub id: String,
    pub address: String,
}

/// Response to registration: the shard ids the coordinator expects this
/// node to seed itself with. Treated as a hint only -- the next
/// broadcast is authoritative and always wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub assigned_shards: Vec<u32>,
}
