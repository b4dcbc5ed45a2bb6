//! Pushes a new `ClusterState` to every known node in parallel after a
//! membership or health change. Partial failure is tolerated: a node
//! that misses a broadcast will receive the next one, and in the
//! meantime will only be corrected once the health monitor's next
//! recompute fires another broadcast.

use std::time::Duration;

use torua_core::ClusterState;
use tracing::warn;

#[derive(Clone)]
pub struct Broadcaster {
    client: reqwest::Client,
    timeout: Duration,
}

impl Broadcaster {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Sends `state` to every node address given. Failures are logged and
    /// otherwise swallowed -- the health monitor is the backstop that
    /// notices a truly unreachable node.
    pub async fn broadcast(&self, addresses: &[String], state: &ClusterState) {
        let sends = addresses.iter().map(|address| self.send_one(address, state));
        futures::future::join_all(sends).await;
    }

    async fn send_one(&self, address: &str, state: &ClusterState) {
        let url = format!("{}/cluster/broadcast", address.trim_end_matches('/'));
        let result = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(state)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(address, status = %response.status(), "broadcast rejected by node");
            }
            Err(err) => {
                warn!(address, error = %err, "broadcast failed to reach node");
            }
        }
    }
}
