//! A single shard: one key range, one [`Store`], its own op counters and
//! lifecycle state.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::hash::fnv1a_32;
use crate::store::{Store, StoreStats};

/// Lifecycle state of a shard. Transitions are one-directional:
/// `Active -> Migrating -> {Active, Deleted}` or `Active -> Deleted`.
/// `Deleted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardState {
    Active,
    Migrating,
    Deleted,
}

impl ShardState {
    fn can_transition_to(self, next: ShardState) -> bool {
        use ShardState::*;
        matches!(
            (self, next),
            (Active, Migrating) | (Migrating, Active) | (Migrating, Deleted) | (Active, Deleted)
        )
    }
}

/// Running counts of operations attempted against a shard. Counters are
/// incremented before the underlying store call so they reflect attempts,
/// not successes, and therefore never decrease.
#[derive(Debug, Default)]
pub struct ShardOps {
    gets: AtomicU64,
    puts: AtomicU64,
    deletes: AtomicU64,
}

impl ShardOps {
    pub fn gets(&self) -> u64 {
        self.gets.load(Ordering::Relaxed)
    }
    pub fn puts(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
    }
    pub fn deletes(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }
}

/// A numbered bucket of the key space, owned by exactly one node at a
/// time per the coordinator's shard map.
#[derive(Debug)]
pub struct Shard {
    id: u32,
    primary: bool,
    state: RwLock<ShardState>,
    store: Store,
    ops: ShardOps,
}

impl Shard {
    pub fn new(id: u32, primary: bool) -> Self {
        Self {
            id,
            primary,
            state: RwLock::new(ShardState::Active),
            store: Store::new(),
            ops: ShardOps::default(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn primary(&self) -> bool {
        self.primary
    }

    pub fn state(&self) -> ShardState {
        *self.state.read()
    }

    pub fn ops(&self) -> &ShardOps {
        &self.ops
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Attempts a state transition, silently refusing illegal ones.
    /// Returns whether the transition took effect.
    pub fn set_state(&self, next: ShardState) -> bool {
        let mut guard = self.state.write();
        if guard.can_transition_to(next) {
            *guard = next;
            true
        } else {
            tracing::warn!(shard_id = self.id, from = ?*guard, to = ?next, "refused illegal shard state transition");
            false
        }
    }

    /// This shard owns `key` iff `FNV1a_32(key) mod shard_count == id`.
    pub fn owns_key(&self, key: &str, shard_count: u32) -> bool {
        fnv1a_32(key.as_bytes()) % shard_count == self.id
    }

    pub fn get(&self, key: &str) -> crate::error::Result<Vec<u8>> {
        let _timer = crate::metrics::OpTimer::start("get");
        self.ops.gets.fetch_add(1, Ordering::Relaxed);
        self.store.get(key)
    }

    pub fn put(&self, key: &str, value: &[u8]) {
        let _timer = crate::metrics::OpTimer::start("put");
        self.ops.puts.fetch_add(1, Ordering::Relaxed);
        self.store.put(key, value);
    }

    pub fn delete(&self, key: &str) {
        let _timer = crate::metrics::OpTimer::start("delete");
        self.ops.deletes.fetch_add(1, Ordering::Relaxed);
        self.store.delete(key);
    }

    pub fn list_keys_in_range(&self, start: &str, end: &str) -> Vec<String> {
        self.store.list_range(start, end)
    }

    pub fn delete_range(&self, start: &str, end: &str) -> usize {
        self.store.delete_range(start, end)
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_active() {
        let shard = Shard::new(0, true);
        assert_eq!(shard.state(), ShardState::Active);
    }

    #[test]
    fn legal_transitions_succeed() {
        let shard = Shard::new(0, true);
        assert!(shard.set_state(ShardState::Migrating));
        assert_eq!(shard.state(), ShardState::Migrating);
        assert!(shard.set_state(ShardState::Active));
        assert!(shard.set_state(ShardState::Migrating));
        assert!(shard.set_state(ShardState::Deleted));
    }

    #[test]
    fn deleted_is_terminal() {
        let shard = Shard::new(0, true);
        shard.set_state(ShardState::Deleted);
        assert!(!shard.set_state(ShardState::Active));
        assert!(!shard.set_state(ShardState::Migrating));
        assert_eq!(shard.state(), ShardState::Deleted);
    }

    #[test]
    fn active_can_skip_straight_to_deleted() {
        let shard = Shard::new(0, true);
        assert!(shard.set_state(ShardState::Deleted));
    }

    #[test]
    fn owns_key_matches_hash_modulo() {
        let shard_count = 4;
        for id in 0..shard_count {
            let shard = Shard::new(id, true);
            for key in ["a", "bb", "ccc", "dddd", "e"] {
                let expected = fnv1a_32(key.as_bytes()) % shard_count == id;
                assert_eq!(shard.owns_key(key, shard_count), expected);
            }
        }
    }

    #[test]
    fn counters_are_monotonic_and_reflect_attempts() {
        let shard = Shard::new(0, true);
        shard.put("k", b"v");
        shard.put("k", b"v2");
        let _ = shard.get("k");
        let _ = shard.get("missing");
        shard.delete("k");
        shard.delete("k");

        assert_eq!(shard.ops().puts(), 2);
        assert_eq!(shard.ops().gets(), 2);
        assert_eq!(shard.ops().deletes(), 2);
    }
}
