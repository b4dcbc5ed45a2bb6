//! Periodically probes every registered node's `/health` endpoint and
//! drives the registry's down/healthy transitions. A transition triggers
//! a shard-map recompute and a broadcast of the new cluster state; a
//! node left `Down` past the eviction timeout is dropped from the
//! registry entirely.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::interval;
use tracing::{debug, info};

use crate::broadcaster::Broadcaster;
use crate::cluster::ClusterManager;
use crate::config::CoordinatorConfig;
use crate::registry::HealthTransition;

pub struct HealthMonitor {
    cluster: Arc<ClusterManager>,
    broadcaster: Broadcaster,
    client: reqwest::Client,
    interval: Duration,
    probe_timeout: Duration,
    failure_threshold: u32,
    eviction_timeout: Duration,
    running: Arc<RwLock<bool>>,
}

impl HealthMonitor {
    pub fn new(cluster: Arc<ClusterManager>, broadcaster: Broadcaster, client: reqwest::Client, config: &CoordinatorConfig) -> Self {
        Self {
            cluster,
            broadcaster,
            client,
            interval: Duration::from_secs(config.health_interval_secs),
            probe_timeout: Duration::from_secs(config.health_probe_timeout_secs),
            failure_threshold: config.health_failure_threshold,
            eviction_timeout: Duration::from_secs(config.node_eviction_timeout_secs),
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Spawns the probe loop as a background task. Returns a handle the
    /// caller can await on shutdown.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        *self.running.write() = true;
        let cluster = self.cluster.clone();
        let broadcaster = self.broadcaster.clone();
        let client = self.client.clone();
        let running = self.running.clone();
        let tick = self.interval;
        let probe_timeout = self.probe_timeout;
        let failure_threshold = self.failure_threshold;
        let eviction_timeout = self.eviction_timeout;

        tokio::spawn(async move {
            let mut ticker = interval(tick);
            loop {
                ticker.tick().await;
                if !*running.read() {
                    break;
                }
                run_probe_round(&cluster, &broadcaster, &client, probe_timeout, failure_threshold, eviction_timeout).await;
            }
        })
    }

    pub fn stop(&self) {
        *self.running.write() = false;
    }
}

async fn run_probe_round(
    cluster: &Arc<ClusterManager>,
    broadcaster: &Broadcaster,
    client: &reqwest::Client,
    probe_timeout: Duration,
    failure_threshold: u32,
    eviction_timeout: Duration,
) {
    let nodes = cluster.registry.snapshot();
    let probes = nodes.iter().map(|node| probe_one(client, &node.id, &node.address, probe_timeout));
    let results = futures::future::join_all(probes).await;

    let mut changed = false;
    for (node, ok) in nodes.iter().zip(results) {
        let transition = cluster.registry.record_probe(&node.id, ok, failure_threshold);
        match transition {
            HealthTransition::BecameDown => {
                info!(node = %node.id, "node marked down after repeated health-probe failures");
                changed = true;
            }
            HealthTransition::BecameHealthy => {
                info!(node = %node.id, "node recovered");
                changed = true;
            }
            HealthTransition::None => {}
        }
    }

    let evicted = cluster.registry.evict_stale(eviction_timeout);
    if !evicted.is_empty() {
        info!(?evicted, "evicted nodes down past eviction timeout");
        changed = true;
    }

    if changed {
        let state = cluster.recompute();
        let addresses: Vec<String> = state.nodes.iter().map(|n| n.address.clone()).collect();
        broadcaster.broadcast(&addresses, &state).await;
    } else {
        debug!("health round completed with no status changes");
    }
}

async fn probe_one(client: &reqwest::Client, node_id: &str, address: &str, timeout: Duration) -> bool {
    let url = format!("{}/health", address.trim_end_matches('/'));
    match client.get(&url).timeout(timeout).send().await {
        Ok(response) => response.status().is_success(),
        Err(err) => {
            debug!(node = node_id, error = %err, "health probe failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn probe_round_marks_unreachable_node_down_after_threshold() {
        let cluster = Arc::new(ClusterManager::new(4));
        cluster.registry.register("n1", "http://127.0.0.1:1");
        let broadcaster = Broadcaster::new(reqwest::Client::new(), Duration::from_millis(50));
        let client = reqwest::Client::new();

        for _ in 0..3 {
            run_probe_round(&cluster, &broadcaster, &client, Duration::from_millis(50), 3, Duration::from_secs(9999)).await;
        }

        assert_eq!(
            cluster.registry.get("n1").unwrap().status,
            torua_core::HealthStatus::Down
        );
    }
}
