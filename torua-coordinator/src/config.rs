//! Coordinator configuration: process-level flags via `clap`, layered
//! over tunables that carry their own serde defaults so a partial config
//! file or partial env-var set still produces a usable configuration.

use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Parser)]
#[command(name = "torua-coordinator", about = "Torua cluster coordinator")]
pub struct Args {
    /// Address the coordinator's HTTP API binds to.
    #[arg(long, env = "TORUA_LISTEN_ADDR", default_value = "0.0.0.0:7000")]
    pub listen_addr: String,

    /// Path to an optional TOML config file overriding the tunables below.
    #[arg(long, env = "TORUA_CONFIG")]
    pub config: Option<String>,

    /// Total number of shards in the cluster. Fixed for the lifetime of
    /// the deployment.
    #[arg(long, env = "TORUA_SHARD_COUNT", default_value_t = default_shard_count())]
    pub shard_count: u32,

    /// `pretty` or `json` structured log output.
    #[arg(long, env = "TORUA_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// `tracing`/`RUST_LOG`-style filter. Falls back to `RUST_LOG` if unset.
    #[arg(long, env = "TORUA_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "TORUA_METRICS_ENABLED", default_value_t = true)]
    pub metrics_enabled: bool,
}

/// Tunables governing health monitoring, forwarding, and broadcast.
/// Deserializable from an optional TOML file; every field carries a
/// default so a missing or partial file is never fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    #[serde(default = "default_health_interval_secs")]
    pub health_interval_secs: u64,

    #[serde(default = "default_health_probe_timeout_secs")]
    pub health_probe_timeout_secs: u64,

    #[serde(default = "default_health_failure_threshold")]
    pub health_failure_threshold: u32,

    #[serde(default = "default_node_eviction_timeout_secs")]
    pub node_eviction_timeout_secs: u64,

    #[serde(default = "default_forward_timeout_secs")]
    pub forward_timeout_secs: u64,

    #[serde(default = "default_broadcast_timeout_secs")]
    pub broadcast_timeout_secs: u64,

    #[serde(default = "default_max_value_bytes")]
    pub max_value_bytes: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            health_interval_secs: default_health_interval_secs(),
            health_probe_timeout_secs: default_health_probe_timeout_secs(),
            health_failure_threshold: default_health_failure_threshold(),
            node_eviction_timeout_secs: default_node_eviction_timeout_secs(),
            forward_timeout_secs: default_forward_timeout_secs(),
            broadcast_timeout_secs: default_broadcast_timeout_secs(),
            max_value_bytes: default_max_value_bytes(),
        }
    }
}

impl CoordinatorConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml_from_str_or_default(&text))
    }
}

fn toml_from_str_or_default(text: &str) -> CoordinatorConfig {
    toml::from_str(text).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "failed to parse coordinator config, using defaults");
        CoordinatorConfig::default()
    })
}

fn default_shard_count() -> u32 {
    4
}

fn default_health_interval_secs() -> u64 {
    10
}

fn default_health_probe_timeout_secs() -> u64 {
    2
}

fn default_health_failure_threshold() -> u32 {
    3
}

fn default_node_eviction_timeout_secs() -> u64 {
    100
}

fn default_forward_timeout_secs() -> u64 {
    5
}

fn default_broadcast_timeout_secs() -> u64 {
    5
}

fn default_max_value_bytes() -> usize {
    1024 * 1024
}
