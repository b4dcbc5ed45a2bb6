//! Shared core for Torua: the shard-local storage engine, hashing, error
//! taxonomy, and wire types used by both `torua-coordinator` and
//! `torua-node`.

pub mod cluster_state;
pub mod error;
pub mod hash;
pub mod metrics;
pub mod shard;
pub mod store;

pub use cluster_state::{Assignment, ClusterState, HealthStatus, NodeView, RegisterRequest, RegisterResponse};
pub use error::{Error, Result};
pub use hash::{fnv1a_32, shard_for_key};
pub use shard::{Shard, ShardOps, ShardState};
pub use store::{Store, StoreStats};
