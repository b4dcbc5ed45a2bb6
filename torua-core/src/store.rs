//! In-memory byte-value store backing a single shard.

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Aggregate size accounting for a [`Store`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub keys: usize,
    pub bytes: u64,
}

/// A thread-safe byte-value map. Readers never block other readers; a
/// writer excludes all others. Values handed to and returned from the
/// store are always copies, so callers can never observe or corrupt the
/// store's internal buffers through aliasing.
#[derive(Debug, Default)]
pub struct Store {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl Store {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.data
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    pub fn put(&self, key: &str, value: &[u8]) {
        self.data.write().insert(key.to_string(), value.to_vec());
    }

    /// Idempotent: deleting an absent key is not an error.
    pub fn delete(&self, key: &str) {
        self.data.write().remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// Unordered snapshot of all keys currently present.
    pub fn list(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }

    /// Keys `k` with `start <= k < end`. An empty `start` means unbounded
    /// below; an empty `end` means unbounded above. Result is sorted.
    pub fn list_range(&self, start: &str, end: &str) -> Vec<String> {
        let guard = self.data.read();
        let mut keys: Vec<String> = guard
            .keys()
            .filter(|k| (start.is_empty() || k.as_str() >= start) && (end.is_empty() || k.as_str() < end))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Deletes every key in `[start, end)` as observed at call time. Keys
    /// inserted into the range after the snapshot is taken are not
    /// deleted; this operation is not atomic with respect to concurrent
    /// writers.
    pub fn delete_range(&self, start: &str, end: &str) -> usize {
        let victims = self.list_range(start, end);
        let mut guard = self.data.write();
        for key in &victims {
            guard.remove(key);
        }
        victims.len()
    }

    pub fn stats(&self) -> StoreStats {
        let guard = self.data.read();
        StoreStats {
            keys: guard.len(),
            bytes: guard.values().map(|v| v.len() as u64).sum(),
        }
    }
}
