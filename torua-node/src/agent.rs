//! Hosts a fixed set of shards, registers with the coordinator at boot,
//! and tracks the latest cluster state it has been told about.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use torua_core::{ClusterState, Error, RegisterRequest, RegisterResponse, Shard};
use tracing::{info, warn};

pub struct NodeAgent {
    node_id: String,
    shards: HashMap<u32, Shard>,
    cluster_state: RwLock<ClusterState>,
}

impl NodeAgent {
    pub fn new(node_id: impl Into<String>, shard_ids: &[u32]) -> Self {
        let node_id = node_id.into();
        let shards = shard_ids.iter().map(|&id| (id, Shard::new(id, true))).collect();
        Self {
            node_id,
            shards,
            cluster_state: RwLock::new(ClusterState::empty(0)),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn shard(&self, id: u32) -> Option<&Shard> {
        self.shards.get(&id)
    }

    pub fn owned_shard_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.shards.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn cluster_state(&self) -> ClusterState {
        self.cluster_state.read().clone()
    }

    /// Applies a broadcast cluster state iff its version strictly exceeds
    /// the version currently held. A non-increasing version is rejected
    /// as stale and left untouched -- the caller maps this to `409`.
    pub fn apply_state(&self, state: ClusterState) -> Result<(), Error> {
        let mut guard = self.cluster_state.write();
        if state.version <= guard.version {
            return Err(Error::StaleState {
                got: state.version,
                have: guard.version,
            });
        }
        *guard = state;
        Ok(())
    }

    /// `true` if the current cluster state says this node owns `shard_id`.
    /// Before any broadcast has been received, a node trusts its local
    /// boot-time shard set.
    pub fn owns_shard(&self, shard_id: u32) -> bool {
        let state = self.cluster_state.read();
        if state.version == 0 {
            return self.shards.contains_key(&shard_id);
        }
        state.node_for_shard(shard_id) == Some(self.node_id.as_str())
    }

    /// The node id the current cluster state believes owns `shard_id`,
    /// used to populate the not-owner hint header.
    pub fn hint_owner(&self, shard_id: u32) -> Option<String> {
        self.cluster_state.read().node_for_shard(shard_id).map(|s| s.to_string())
    }
}

/// Attempts registration once. Used directly by tests and as the unit of
/// work retried by [`register_with_backoff`].
pub async fn register_once(
    client: &reqwest::Client,
    coordinator_addr: &str,
    node_id: &str,
    advertise_addr: &str,
    timeout: Duration,
) -> Result<RegisterResponse, Error> {
    let url = format!("{}/cluster/register", coordinator_addr.trim_end_matches('/'));
    let response = client
        .post(&url)
        .timeout(timeout)
        .json(&RegisterRequest {
            id: node_id.to_string(),
            address: advertise_addr.to_string(),
        })
        .send()
        .await
        .map_err(|err| Error::UpstreamFailure(err.to_string()))?;

    if !response.status().is_success() {
        return Err(Error::UpstreamFailure(format!("coordinator returned {}", response.status())));
    }

    response.json().await.map_err(|err| Error::UpstreamFailure(err.to_string()))
}

/// Retries registration with bounded exponential backoff (200ms, doubling,
/// capped at 5s) until it succeeds. Runs until success; callers that need
/// a shutdown path should wrap this in a cancellable task.
pub async fn register_with_backoff(client: &reqwest::Client, coordinator_addr: &str, node_id: &str, advertise_addr: &str, timeout: Duration) -> RegisterResponse {
    let mut backoff = Duration::from_millis(200);
    let max_backoff = Duration::from_secs(5);

    loop {
        match register_once(client, coordinator_addr, node_id, advertise_addr, timeout).await {
            Ok(response) => {
                info!(node_id, assigned_shards = ?response.assigned_shards, "registered with coordinator");
                return response;
            }
            Err(err) => {
                warn!(node_id, error = %err, backoff_ms = backoff.as_millis(), "registration failed, retrying");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(max_backoff);
            }
        }
    }
}
