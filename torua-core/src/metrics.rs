//! Metric names shared by coordinator and node, kept in one place so
//! dashboards built against one binary also work against the other.

use metrics::{counter, histogram};
use std::time::Instant;

pub const SHARD_OP_TOTAL: &str = "torua_shard_op_total";
pub const SHARD_OP_DURATION_SECONDS: &str = "torua_shard_op_duration_seconds";
pub const CLUSTER_STATE_VERSION: &str = "torua_cluster_state_version";
pub const NODES_HEALTHY: &str = "torua_nodes_healthy";
pub const NODES_DOWN: &str = "torua_nodes_down";

/// Guard that records a shard operation's duration on drop, in the style
/// of an RAII timer: construct at the top of a handler, let it fall out
/// of scope when the work completes.
pub struct OpTimer {
    op: &'static str,
    started: Instant,
}

impl OpTimer {
    pub fn start(op: &'static str) -> Self {
        Self {
            op,
            started: Instant::now(),
        }
    }
}

impl Drop for OpTimer {
    fn drop(&mut self) {
        histogram!(SHARD_OP_DURATION_SECONDS, "op" => self.op).record(self.started.elapsed().as_secs_f64());
        counter!(SHARD_OP_TOTAL, "op" => self.op).increment(1);
    }
}
