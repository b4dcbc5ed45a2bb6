//! Deterministic shard -> node assignment. Not consistent hashing: a
//! membership change can reshuffle many shards. That trade-off is
//! accepted because replication and rebalancing are out of scope; the
//! property this module guarantees is determinism given identical
//! inputs, not minimal movement.

use torua_core::Assignment;

/// Computes the shard map for `shard_count` shards over `healthy_node_ids`.
/// Node ids are sorted lexicographically first so the result does not
/// depend on registry iteration order; shard `i` goes to the node at
/// index `i mod len(nodes)`. Returns an empty map if there are no nodes.
pub fn compute(shard_count: u32, healthy_node_ids: &[String]) -> Vec<Assignment> {
    if healthy_node_ids.is_empty() {
        return Vec::new();
    }

    let mut nodes = healthy_node_ids.to_vec();
    nodes.sort();

    (0..shard_count)
        .map(|shard_id| Assignment {
            shard_id,
            node_id: nodes[(shard_id as usize) % nodes.len()].clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_nodes_yields_empty_map() {
        assert!(compute(4, &[]).is_empty());
    }

    #[test]
    fn every_shard_gets_exactly_one_node() {
        let nodes = vec!["b".to_string(), "a".to_string(), "c".to_string()];
        let map = compute(7, &nodes);
        assert_eq!(map.len(), 7);
        for shard_id in 0..7 {
            assert_eq!(map.iter().filter(|a| a.shard_id == shard_id).count(), 1);
        }
    }

    #[test]
    fn assignment_is_independent_of_input_order() {
        let a = compute(4, &["n1".to_string(), "n2".to_string(), "n3".to_string()]);
        let b = compute(4, &["n3".to_string(), "n1".to_string(), "n2".to_string()]);
        assert_eq!(
            a.iter().map(|x| (x.shard_id, x.node_id.clone())).collect::<Vec<_>>(),
            b.iter().map(|x| (x.shard_id, x.node_id.clone())).collect::<Vec<_>>()
        );
    }

    #[test]
    fn stable_when_node_set_unchanged() {
        let nodes = vec!["n1".to_string(), "n2".to_string()];
        let first = compute(4, &nodes);
        let second = compute(4, &nodes);
        assert_eq!(
            first.iter().map(|x| x.node_id.clone()).collect::<Vec<_>>(),
            second.iter().map(|x| x.node_id.clone()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn single_node_owns_every_shard() {
        let map = compute(4, &["solo".to_string()]);
        assert!(map.iter().all(|a| a.node_id == "solo"));
    }
}
