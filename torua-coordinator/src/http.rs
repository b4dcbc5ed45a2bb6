//! The coordinator's HTTP surface: registration, membership/assignment
//! introspection, and the routed data-plane.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use torua_core::{Error, RegisterRequest, RegisterResponse};

use crate::broadcaster::Broadcaster;
use crate::cluster::ClusterManager;
use crate::config::CoordinatorConfig;
use crate::router;
use crate::router::HINT_OWNER_HEADER;

#[derive(Clone)]
pub struct AppState {
    pub cluster: Arc<ClusterManager>,
    pub broadcaster: Broadcaster,
    pub client: reqwest::Client,
    pub config: Arc<CoordinatorConfig>,
    pub metrics_handle: Option<PrometheusHandle>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/cluster/register", post(register))
        .route("/nodes", get(list_nodes))
        .route("/shards", get(list_shards))
        .route("/data/:key", get(get_data).put(put_data).delete(delete_data))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn register(State(state): State<AppState>, Json(req): Json<RegisterRequest>) -> impl IntoResponse {
    if req.id.is_empty() || req.address.is_empty() {
        return error_response(Error::InvalidRequest("id and address are required".to_string()));
    }

    state.cluster.registry.register(&req.id, &req.address);
    let cluster_state = state.cluster.recompute();
    let assigned_shards: Vec<u32> = cluster_state
        .assignments
        .iter()
        .filter(|a| a.node_id == req.id)
        .map(|a| a.shard_id)
        .collect();

    let addresses: Vec<String> = cluster_state.nodes.iter().map(|n| n.address.clone()).collect();
    state.broadcaster.broadcast(&addresses, &cluster_state).await;

    (StatusCode::OK, Json(RegisterResponse { assigned_shards })).into_response()
}

#[derive(Serialize)]
struct NodesResponse {
    nodes: Vec<torua_core::NodeView>,
}

async fn list_nodes(State(state): State<AppState>) -> impl IntoResponse {
    let cluster_state = state.cluster.current();
    Json(NodesResponse {
        nodes: cluster_state.nodes,
    })
}

#[derive(Serialize)]
struct ShardsResponse {
    shards: Vec<torua_core::Assignment>,
}

async fn list_shards(State(state): State<AppState>) -> impl IntoResponse {
    let cluster_state = state.cluster.current();
    Json(ShardsResponse {
        shards: cluster_state.assignments,
    })
}

async fn get_data(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    forward(state, Method::GET, key, Bytes::new()).await
}

async fn put_data(State(state): State<AppState>, Path(key): Path<String>, body: Bytes) -> Response {
    if body.len() > state.config.max_value_bytes {
        return error_response(Error::InvalidRequest(format!(
            "value of {} bytes exceeds max_value_bytes={}",
            body.len(),
            state.config.max_value_bytes
        )));
    }
    forward(state, Method::PUT, key, body).await
}

async fn delete_data(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    forward(state, Method::DELETE, key, Bytes::new()).await
}

async fn forward(state: AppState, method: Method, key: String, body: Bytes) -> Response {
    let timeout = Duration::from_secs(state.config.forward_timeout_secs);
    match router::forward(&state.cluster, &state.client, timeout, method, &key, body.to_vec()).await {
        Ok(resp) => (StatusCode::from_u16(resp.status).unwrap_or(StatusCode::BAD_GATEWAY), resp.body).into_response(),
        Err(fwd_err) => {
            let mut headers = HeaderMap::new();
            if let Some(hint) = fwd_err.hint_owner {
                headers.insert(HINT_OWNER_HEADER, hint);
            }
            let status = StatusCode::from_u16(fwd_err.error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, headers, fwd_err.error.to_string()).into_response()
        }
    }
}

fn error_response(err: Error) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, err.to_string()).into_response()
}
