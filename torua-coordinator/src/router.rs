//! Routes a data-plane request to its owning node and relays the
//! response. Routing is stateless: given the same `ClusterState`, the
//! same key always resolves to the same `(shard_id, node_id)` pair.

use std::time::Duration;

use reqwest::header::HeaderValue;
use reqwest::Method;
use torua_core::{shard_for_key, Error};

use crate::cluster::ClusterManager;

pub const HINT_OWNER_HEADER: &str = "x-torua-hint-owner";

/// The node's answer, relayed back to the client verbatim.
pub struct ForwardedResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// A forwarding failure, carrying the owner hint the node attached (if
/// any) so the caller can relay it on the `502` it returns to the client.
pub struct ForwardError {
    pub error: Error,
    pub hint_owner: Option<HeaderValue>,
}

impl From<Error> for ForwardError {
    fn from(error: Error) -> Self {
        Self { error, hint_owner: None }
    }
}

/// Forwards `method /shard/{shard_id}/kv/{key}` to the node that owns
/// `key` under the coordinator's current cluster state.
///
/// On a `410` from the node, or on any transport failure, this records a
/// single health-probe failure against that node (without blocking on
/// it) and returns `UpstreamFailure` -- the caller maps that to `502`.
/// This version never retries transparently.
pub async fn forward(
    cluster: &ClusterManager,
    client: &reqwest::Client,
    forward_timeout: Duration,
    method: Method,
    key: &str,
    body: Vec<u8>,
) -> Result<ForwardedResponse, ForwardError> {
    let state = cluster.current();
    let shard_id = shard_for_key(key, state.shard_count);

    let node_id = state.node_for_shard(shard_id).ok_or(Error::NoOwner(shard_id))?.to_string();

    let address = state.address_of(&node_id).ok_or(Error::NoOwner(shard_id))?.to_string();

    let url = format!("{}/shard/{}/kv/{}", address.trim_end_matches('/'), shard_id, key);

    let request = client.request(method, &url).timeout(forward_timeout).body(body);

    let response = request.send().await.map_err(|err| {
        cluster.registry.record_probe(&node_id, false, u32::MAX);
        ForwardError::from(Error::UpstreamFailure(err.to_string()))
    })?;

    let status = response.status().as_u16();
    if status == 410 {
        cluster.registry.record_probe(&node_id, false, u32::MAX);
        let hint_owner = response.headers().get(HINT_OWNER_HEADER).cloned();
        return Err(ForwardError {
            error: Error::UpstreamFailure(format!("node {node_id} is not owner of shard {shard_id}")),
            hint_owner,
        });
    }

    let body = response.bytes().await.map_err(|err| ForwardError::from(Error::UpstreamFailure(err.to_string())))?;

    Ok(ForwardedResponse {
        status,
        body: body.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_fails_fast_with_no_nodes() {
        let manager = ClusterManager::new(4);
        manager.recompute();
        let rt = tokio::runtime::Runtime::new().unwrap();
        let client = reqwest::Client::new();
        let result = rt.block_on(forward(
            &manager,
            &client,
            Duration::from_secs(1),
            Method::GET,
            "some-key",
            Vec::new(),
        ));
        assert!(matches!(result, Err(ForwardError { error: Error::NoOwner(_), .. })));
    }

    #[test]
    fn routing_is_deterministic_for_fixed_state() {
        let manager = ClusterManager::new(4);
        manager.registry.register("n1", "http://127.0.0.1:9001");
        manager.registry.register("n2", "http://127.0.0.1:9002");
        manager.recompute();
        let state = manager.current();

        let shard_a = shard_for_key("consistent-key", state.shard_count);
        let shard_b = shard_for_key("consistent-key", state.shard_count);
        assert_eq!(shard_a, shard_b);
        assert_eq!(state.node_for_shard(shard_a), state.node_for_shard(shard_b));
    }
}
