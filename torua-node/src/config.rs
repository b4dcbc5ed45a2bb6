//! Node process configuration: identity, bind address, the coordinator
//! to register with, and the fixed set of shards this node hosts.

use clap::Parser;

#[derive(Debug, Parser, Clone)]
#[command(name = "torua-node", about = "Torua storage node")]
pub struct Args {
    /// Stable, unique id this node registers under.
    #[arg(long, env = "TORUA_NODE_ID")]
    pub node_id: String,

    /// Address this node's HTTP server binds to.
    #[arg(long, env = "TORUA_LISTEN_ADDR", default_value = "0.0.0.0:8000")]
    pub listen_addr: String,

    /// Address this node advertises to the coordinator and peers. Falls
    /// back to `listen_addr` prefixed with `http://` if unset.
    #[arg(long, env = "TORUA_ADVERTISE_ADDR")]
    pub advertise_addr: Option<String>,

    /// Base URL of the coordinator, e.g. `http://127.0.0.1:7000`.
    #[arg(long, env = "TORUA_COORDINATOR_ADDR")]
    pub coordinator_addr: String,

    /// Comma-separated shard ids this node hosts at boot. Treated only
    /// as a seed -- the coordinator's next broadcast is authoritative.
    #[arg(long, env = "TORUA_SHARD_IDS", value_delimiter = ',', default_value = "")]
    pub shard_ids: Vec<u32>,

    #[arg(long, env = "TORUA_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    #[arg(long, env = "TORUA_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "TORUA_METRICS_ENABLED", default_value_t = true)]
    pub metrics_enabled: bool,

    /// Deadline for the registration POST to the coordinator.
    #[arg(long, env = "TORUA_REGISTER_TIMEOUT_SECS", default_value_t = 5)]
    pub register_timeout_secs: u64,

    /// Largest value this node's PUT handler accepts.
    #[arg(long, env = "TORUA_MAX_VALUE_BYTES", default_value_t = 1024 * 1024)]
    pub max_value_bytes: usize,
}

impl Args {
    pub fn advertise_address(&self) -> String {
        self.advertise_addr
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.listen_addr))
    }
}
