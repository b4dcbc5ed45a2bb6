//! End-to-end tests driving a real coordinator and two real nodes over
//! HTTP, covering the concrete store/update/delete/distribution/routing/
//! membership scenarios.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use torua_coordinator::{http as coord_http, Broadcaster, ClusterManager, CoordinatorConfig};
use torua_node::agent::register_once;
use torua_node::{http as node_http, NodeAgent};

struct Cluster {
    coordinator_url: String,
    _node_a: tokio::task::JoinHandle<()>,
    _node_b: tokio::task::JoinHandle<()>,
    _coordinator: tokio::task::JoinHandle<()>,
}

async fn start_node(node_id: &str, shard_ids: &[u32]) -> (String, Arc<NodeAgent>, tokio::task::JoinHandle<()>) {
    let agent = Arc::new(NodeAgent::new(node_id, shard_ids));
    let state = node_http::AppState {
        agent: agent.clone(),
        max_value_bytes: 1024 * 1024,
        metrics_handle: None,
    };
    let app = node_http::router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = format!("http://{addr}");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (url, agent, handle)
}

async fn start_coordinator(shard_count: u32) -> (String, tokio::task::JoinHandle<()>) {
    let cluster = Arc::new(ClusterManager::new(shard_count));
    let client = Client::new();
    let broadcaster = Broadcaster::new(client.clone(), Duration::from_secs(2));
    let state = coord_http::AppState {
        cluster,
        broadcaster,
        client,
        config: Arc::new(CoordinatorConfig::default()),
        metrics_handle: None,
    };
    let app = coord_http::router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = format!("http://{addr}");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (url, handle)
}

async fn start_cluster() -> (Cluster, Client) {
    let (coordinator_url, coordinator_handle) = start_coordinator(4).await;
    let (node_a_url, _agent_a, node_a_handle) = start_node("node-a", &[0, 1]).await;
    let (node_b_url, _agent_b, node_b_handle) = start_node("node-b", &[2, 3]).await;

    let client = Client::new();
    for (id, url) in [("node-a", &node_a_url), ("node-b", &node_b_url)] {
        register_once(&client, &coordinator_url, id, url, Duration::from_secs(2)).await.unwrap();
    }

    // Registration triggers a broadcast synchronously in the handler, so
    // by the time register_once returns both nodes already hold the
    // latest cluster state.

    (
        Cluster {
            coordinator_url,
            _node_a: node_a_handle,
            _node_b: node_b_handle,
            _coordinator: coordinator_handle,
        },
        client,
    )
}

#[tokio::test]
async fn store_and_retrieve() {
    let (cluster, client) = start_cluster().await;

    let put = client
        .put(format!("{}/data/greeting", cluster.coordinator_url))
        .body("Hello World")
        .send()
        .await
        .unwrap();
    assert_eq!(put.status(), 204);

    let get = client.get(format!("{}/data/greeting", cluster.coordinator_url)).send().await.unwrap();
    assert_eq!(get.status(), 200);
    assert_eq!(get.text().await.unwrap(), "Hello World");
}

#[tokio::test]
async fn update_overwrites_previous_value() {
    let (cluster, client) = start_cluster().await;
    let url = format!("{}/data/counter", cluster.coordinator_url);

    client.put(&url).body("1").send().await.unwrap();
    client.put(&url).body("2").send().await.unwrap();
    let get = client.get(&url).send().await.unwrap();
    assert_eq!(get.text().await.unwrap(), "2");
}

#[tokio::test]
async fn delete_then_get_returns_not_found() {
    let (cluster, client) = start_cluster().await;
    let url = format!("{}/data/temp", cluster.coordinator_url);

    client.put(&url).body("x").send().await.unwrap();
    let delete = client.delete(&url).send().await.unwrap();
    assert_eq!(delete.status(), 204);

    let get = client.get(&url).send().await.unwrap();
    assert_eq!(get.status(), 404);
}

#[tokio::test]
async fn keys_distribute_across_at_least_two_shards() {
    let (cluster, client) = start_cluster().await;

    for i in 0..8 {
        let url = format!("{}/data/key{i}", cluster.coordinator_url);
        client.put(&url).body("v").send().await.unwrap();
    }

    let shards_resp = client.get(format!("{}/shards", cluster.coordinator_url)).send().await.unwrap();
    let body: Value = shards_resp.json().await.unwrap();
    let shard_ids: std::collections::HashSet<u64> = body["shards"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["shard_id"].as_u64().unwrap())
        .collect();
    assert!(shard_ids.len() >= 2);
}

#[tokio::test]
async fn repeated_reads_are_consistently_routed() {
    let (cluster, client) = start_cluster().await;
    let url = format!("{}/data/consistent-key", cluster.coordinator_url);
    client.put(&url).body("v").send().await.unwrap();

    let mut values = std::collections::HashSet::new();
    for _ in 0..10 {
        let get = client.get(&url).send().await.unwrap();
        values.insert(get.text().await.unwrap());
    }
    assert_eq!(values.len(), 1);
}

#[tokio::test]
async fn membership_and_assignment_are_visible() {
    let (cluster, client) = start_cluster().await;

    let nodes: Value = client.get(format!("{}/nodes", cluster.coordinator_url)).send().await.unwrap().json().await.unwrap();
    assert_eq!(nodes["nodes"].as_array().unwrap().len(), 2);

    let shards: Value = client.get(format!("{}/shards", cluster.coordinator_url)).send().await.unwrap().json().await.unwrap();
    let shard_list = shards["shards"].as_array().unwrap();
    assert_eq!(shard_list.len(), 4);
    for shard in shard_list {
        assert!(!shard["node_id"].as_str().unwrap().is_empty());
    }
}

#[tokio::test]
async fn concurrent_clients_do_not_lose_data_or_panic() {
    let (cluster, client) = start_cluster().await;
    let url = Arc::new(format!("{}/data/shared-counter", cluster.coordinator_url));

    let mut handles = Vec::new();
    for i in 0..50 {
        let client = client.clone();
        let url = url.clone();
        handles.push(tokio::spawn(async move {
            let put = client.put(url.as_str()).body(format!("v{i}")).send().await.unwrap();
            assert_eq!(put.status(), 204);
            let get = client.get(url.as_str()).send().await.unwrap();
            assert_eq!(get.status(), 200);
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    let final_get = client.get(url.as_str()).send().await.unwrap();
    assert_eq!(final_get.status(), 200);
}
