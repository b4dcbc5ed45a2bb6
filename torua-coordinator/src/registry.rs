//! The coordinator's table of known nodes. One reader/writer lock guards
//! the whole map; callers always copy out a snapshot and release the
//! lock before doing any I/O.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Instant;
use torua_core::HealthStatus;

/// Internal bookkeeping for one node. Not serialized directly; callers
/// project this into `torua_core::NodeView` for the wire.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub id: String,
    pub address: String,
    pub shards: Vec<u32>,
    pub status: HealthStatus,
    pub consecutive_failures: u32,
    pub last_ok: Instant,
    pub down_since: Option<Instant>,
}

impl NodeRecord {
    fn new(id: String, address: String) -> Self {
        Self {
            id,
            address,
            shards: Vec::new(),
            status: HealthStatus::Healthy,
            consecutive_failures: 0,
            last_ok: Instant::now(),
            down_since: None,
        }
    }
}

/// Outcome of applying a health probe result, used by the health monitor
/// to decide whether a shard-map recompute and broadcast are needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthTransition {
    None,
    BecameDown,
    BecameHealthy,
}

#[derive(Debug, Default)]
pub struct Registry {
    nodes: RwLock<HashMap<String, NodeRecord>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
        }
    }

    /// Upserts a node. Returns `true` if this is a never-before-seen id
    /// (the caller should treat this as a membership change and trigger
    /// a shard-map recompute); re-registration of an existing id updates
    /// the address but preserves health history.
    pub fn register(&self, id: &str, address: &str) -> bool {
        let mut guard = self.nodes.write();
        match guard.get_mut(id) {
            Some(existing) => {
                existing.address = address.to_string();
                false
            }
            None => {
                guard.insert(id.to_string(), NodeRecord::new(id.to_string(), address.to_string()));
                true
            }
        }
    }

    pub fn deregister(&self, id: &str) -> bool {
        self.nodes.write().remove(id).is_some()
    }

    pub fn snapshot(&self) -> Vec<NodeRecord> {
        self.nodes.read().values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<NodeRecord> {
        self.nodes.read().get(id).cloned()
    }

    pub fn set_shards(&self, id: &str, shards: Vec<u32>) {
        if let Some(node) = self.nodes.write().get_mut(id) {
            node.shards = shards;
        }
    }

    /// Applies one probe result to a node's health bookkeeping. Returns
    /// the transition, if any, so the caller can trigger downstream
    /// recompute/broadcast without holding the lock itself.
    pub fn record_probe(&self, id: &str, ok: bool, failure_threshold: u32) -> HealthTransition {
        let mut guard = self.nodes.write();
        let Some(node) = guard.get_mut(id) else {
            return HealthTransition::None;
        };

        if ok {
            node.consecutive_failures = 0;
            node.last_ok = Instant::now();
            node.down_since = None;
            if node.status == HealthStatus::Down {
                node.status = HealthStatus::Healthy;
                return HealthTransition::BecameHealthy;
            }
            node.status = HealthStatus::Healthy;
            HealthTransition::None
        } else {
            node.consecutive_failures += 1;
            if node.status != HealthStatus::Down && node.consecutive_failures >= failure_threshold {
                node.status = HealthStatus::Down;
                node.down_since = Some(Instant::now());
                HealthTransition::BecameDown
            } else if node.status == HealthStatus::Healthy {
                node.status = HealthStatus::Suspect;
                HealthTransition::None
            } else {
                HealthTransition::None
            }
        }
    }

    /// Evicts every node that has been `Down` for longer than
    /// `eviction_timeout`. Returns the evicted node ids.
    pub fn evict_stale(&self, eviction_timeout: std::time::Duration) -> Vec<String> {
        let mut guard = self.nodes.write();
        let victims: Vec<String> = guard
            .values()
            .filter(|n| n.down_since.map(|t| t.elapsed() > eviction_timeout).unwrap_or(false))
            .map(|n| n.id.clone())
            .collect();
        for id in &victims {
            guard.remove(id);
        }
        victims
    }
}
