//! # Graph Lifecycle
//!
//! Post-step policies that keep the topology well formed:
//!
//! | Policy | Effect |
//! |--------|--------|
//! | Single component | Every non-primary component is deleted at once |
//! | Orphan cleanup | Non-primary components age, fade, then get deleted |
//! | Isolated-`A` reseed | Lone `A` nodes become fresh seeds |
//!
//! The primary component is the one holding the node with the smallest
//! `parents_count` (oldest lineage). It is never touched.

use crate::config::OrphanCleanupCfg;
use crate::{Graph, GumError, NodeId, NodeState};

/// Full fade signal.
pub const FADE_MAX: u16 = 1000;

/// Stateless lifecycle passes over a graph.
pub struct Lifecycle;

impl Lifecycle {
    /// Keep only the primary component. Returns the removed ids.
    pub fn enforce_single_component(graph: &mut Graph) -> Result<Vec<NodeId>, GumError> {
        let Some(root) = graph.oldest_node() else {
            return Ok(Vec::new());
        };

        for component in graph.connected_components() {
            if component.binary_search(&root).is_ok() {
                continue;
            }
            for id in component {
                graph.mark_deleted(id)?;
            }
        }

        Ok(graph.remove_marked_nodes())
    }

    /// Age every orphan component by one step, update fade, and delete the
    /// components whose age reached their size bucket's threshold.
    ///
    /// A component's age is the largest age among its members plus one, so
    /// merged orphans keep the older age and newborns inherit it. Members of
    /// the primary component are reset to age 0 and fade 0.
    ///
    /// Returns the removed ids.
    pub fn age_orphans(
        graph: &mut Graph,
        cfg: &OrphanCleanupCfg,
    ) -> Result<Vec<NodeId>, GumError> {
        let Some(root) = graph.oldest_node() else {
            return Ok(Vec::new());
        };

        for component in graph.connected_components() {
            if component.binary_search(&root).is_ok() {
                for &id in &component {
                    if let Some(node) = graph.node_mut(id) {
                        node.orphan_age = 0;
                        node.fade_permille = 0;
                    }
                }
                continue;
            }

            let age = component
                .iter()
                .filter_map(|&id| graph.node(id))
                .map(|n| n.orphan_age)
                .max()
                .unwrap_or(0)
                .saturating_add(1);
            let threshold = cfg.thresholds.for_size(component.len());
            let fade_start = cfg.fade_starts.for_size(component.len());

            if age >= threshold {
                tracing::debug!(
                    size = component.len(),
                    age,
                    "orphan component reached threshold"
                );
                for id in component {
                    graph.mark_deleted(id)?;
                }
                continue;
            }

            let fade = fade_permille(age, fade_start, threshold);
            for id in component {
                if let Some(node) = graph.node_mut(id) {
                    node.orphan_age = age;
                    node.fade_permille = fade;
                }
            }
        }

        Ok(graph.remove_marked_nodes())
    }

    /// Turn every isolated `A` node into a fresh seed: `parents_count = 0`,
    /// `prior_state = Unknown`. A graph holding a single node is left alone.
    ///
    /// Returns the reseeded ids.
    pub fn reseed_isolated(graph: &mut Graph) -> Vec<NodeId> {
        if graph.node_count() <= 1 {
            return Vec::new();
        }

        let isolated: Vec<NodeId> = graph
            .nodes()
            .filter(|n| n.state == NodeState::A && graph.degree(n.id) == 0)
            .map(|n| n.id)
            .collect();

        for &id in &isolated {
            if let Some(node) = graph.node_mut(id) {
                node.parents_count = 0;
                node.prior_state = NodeState::UNKNOWN;
            }
        }

        isolated
    }
}

/// Fade for an orphan of `age`: 0 before `fade_start`, then rising linearly
/// toward [`FADE_MAX`] as the age approaches `threshold`.
#[must_use]
pub fn fade_permille(age: u32, fade_start: u32, threshold: u32) -> u16 {
    if age < fade_start || threshold < fade_start {
        return 0;
    }
    let progressed = u64::from(age - fade_start) + 1;
    let window = u64::from(threshold - fade_start) + 1;
    (progressed * u64::from(FADE_MAX) / window).min(u64::from(FADE_MAX)) as u16
}

// =============================================================================
// TESTS
// =============================================================================
