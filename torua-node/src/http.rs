//! The node's HTTP surface: health, the sharded data plane, and the
//! inbound cluster-state broadcast.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use torua_core::{ClusterState, Error};

use crate::agent::NodeAgent;

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<NodeAgent>,
    pub max_value_bytes: usize,
    pub metrics_handle: Option<PrometheusHandle>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/shard/:shard_id/kv/:key", get(get_kv).put(put_kv).delete(delete_kv))
        .route("/cluster/broadcast", post(broadcast))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn not_owner_response(state: &AppState, shard_id: u32) -> Response {
    let mut headers = HeaderMap::new();
    if let Some(owner) = state.agent.hint_owner(shard_id) {
        if let Ok(value) = HeaderValue::from_str(&owner) {
            headers.insert("X-Torua-Hint-Owner", value);
        }
    }
    (StatusCode::GONE, headers, Error::NotOwner(shard_id).to_string()).into_response()
}

async fn get_kv(State(state): State<AppState>, Path((shard_id, key)): Path<(u32, String)>) -> Response {
    if !state.agent.owns_shard(shard_id) {
        return not_owner_response(&state, shard_id);
    }
    let Some(shard) = state.agent.shard(shard_id) else {
        return not_owner_response(&state, shard_id);
    };

    match shard.get(&key) {
        Ok(value) => (StatusCode::OK, value).into_response(),
        Err(Error::NotFound(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => error_response(err),
    }
}

async fn put_kv(State(state): State<AppState>, Path((shard_id, key)): Path<(u32, String)>, body: Bytes) -> Response {
    if body.len() > state.max_value_bytes {
        return error_response(Error::InvalidRequest(format!(
            "value of {} bytes exceeds max_value_bytes={}",
            body.len(),
            state.max_value_bytes
        )));
    }
    if !state.agent.owns_shard(shard_id) {
        return not_owner_response(&state, shard_id);
    }
    let Some(shard) = state.agent.shard(shard_id) else {
        return not_owner_response(&state, shard_id);
    };

    shard.put(&key, &body);
    StatusCode::NO_CONTENT.into_response()
}

async fn delete_kv(State(state): State<AppState>, Path((shard_id, key)): Path<(u32, String)>) -> Response {
    if !state.agent.owns_shard(shard_id) {
        return not_owner_response(&state, shard_id);
    }
    let Some(shard) = state.agent.shard(shard_id) else {
        return not_owner_response(&state, shard_id);
    };

    shard.delete(&key);
    StatusCode::NO_CONTENT.into_response()
}

async fn broadcast(State(state): State<AppState>, Json(cluster_state): Json<ClusterState>) -> Response {
    match state.agent.apply_state(cluster_state) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: Error) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, err.to_string()).into_response()
}
