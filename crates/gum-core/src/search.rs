//! # Nearest-Node Search
//!
//! Bounded breadth-first search used by `TryToConnectWithNearest`.
//!
//! The search is level-synchronous: every node first reached at hop `d` is a
//! candidate at level `d`, and the first level holding any candidate wins.
//! Nodes already adjacent to the source are never candidates, so the nearest
//! useful level is at least two hops away.

use crate::config::{NearestSearchCfg, TieBreaker};
use crate::graph::Adjacency;
use crate::{NodeId, NodeState};
use std::collections::BTreeSet;

/// Find the node(s) to connect `source` to.
///
/// `state_of` reports the state a node should be judged by (its saved state
/// during a step, its live state otherwise) and returns `None` for nodes that
/// must not be chosen, such as nodes marked for deletion.
///
/// Returns an empty vector when nothing qualifies within `cfg.max_depth`
/// hops. Results are in ascending id order.
pub fn find_nearest<A, F>(
    adjacency: &A,
    source: NodeId,
    target: NodeState,
    cfg: &NearestSearchCfg,
    state_of: F,
) -> Vec<NodeId>
where
    A: Adjacency + ?Sized,
    F: Fn(NodeId) -> Option<NodeState>,
{
    if adjacency.adjacent(source).is_none() {
        return Vec::new();
    }

    let mut visited = BTreeSet::from([source]);
    let mut frontier = vec![source];

    for _depth in 1..=cfg.max_depth {
        let mut level = BTreeSet::new();
        for &node in &frontier {
            for &neighbor in adjacency.adjacent(node).into_iter().flatten() {
                if visited.insert(neighbor) {
                    level.insert(neighbor);
                }
            }
        }

        if level.is_empty() {
            break;
        }

        let candidates: Vec<NodeId> = level
            .iter()
            .copied()
            .filter(|&n| !adjacency.are_adjacent(source, n))
            .filter(|&n| state_of(n).is_some_and(|s| s.matches(target)))
            .collect();

        if !candidates.is_empty() {
            return select(candidates, cfg);
        }

        frontier = level.into_iter().collect();
    }

    Vec::new()
}

/// Apply `connect_all` and the tie-breaker to one level's candidates.
fn select(mut candidates: Vec<NodeId>, cfg: &NearestSearchCfg) -> Vec<NodeId> {
    if cfg.connect_all {
        return candidates;
    }
    match cfg.tie_breaker {
        TieBreaker::Stable => {
            candidates.truncate(1);
            candidates
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
