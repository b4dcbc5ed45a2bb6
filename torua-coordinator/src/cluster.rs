//! Ties the registry and shard map together: recomputes assignments and
//! bumps the cluster state's version whenever membership or health
//! changes, without ever holding the write lock across network I/O.

use parking_lot::RwLock;
use torua_core::{ClusterState, HealthStatus, NodeView};

use crate::registry::Registry;
use crate::shardmap;

pub struct ClusterManager {
    pub registry: Registry,
    shard_count: u32,
    state: RwLock<ClusterState>,
}

impl ClusterManager {
    pub fn new(shard_count: u32) -> Self {
        Self {
            registry: Registry::new(),
            shard_count,
            state: RwLock::new(ClusterState::empty(shard_count)),
        }
    }

    pub fn shard_count(&self) -> u32 {
        self.shard_count
    }

    pub fn current(&self) -> ClusterState {
        self.state.read().clone()
    }

    /// Recomputes the shard map from currently-healthy nodes and installs
    /// a new, strictly higher-versioned `ClusterState`. Called after any
    /// registry mutation or health status flip. Returns the new state so
    /// the caller can hand it to the broadcaster without re-reading the
    /// lock.
    pub fn recompute(&self) -> ClusterState {
        let records = self.registry.snapshot();
        let healthy_ids: Vec<String> = records
            .iter()
            .filter(|n| n.status != HealthStatus::Down)
            .map(|n| n.id.clone())
            .collect();

        let assignments = shardmap::compute(self.shard_count, &healthy_ids);

        for record in &records {
            let shards: Vec<u32> = assignments
                .iter()
                .filter(|a| a.node_id == record.id)
                .map(|a| a.shard_id)
                .collect();
            self.registry.set_shards(&record.id, shards);
        }

        let nodes: Vec<NodeView> = self
            .registry
            .snapshot()
            .into_iter()
            .map(|n| NodeView {
                id: n.id,
                address: n.address,
                status: n.status,
                shards: n.shards,
            })
            .collect();

        let mut guard = self.state.write();
        let next_version = guard.version + 1;
        *guard = ClusterState {
            version: next_version,
            shard_count: self.shard_count,
            nodes,
            assignments,
        };
        guard.clone()
    }
}
