//! # Graph Metrics
//!
//! Summary numbers a driver prints after a run or when inspecting a
//! checkpoint. All arithmetic is integer; density is fixed-point.

use crate::{Graph, NodeState};
use serde::Serialize;
use std::collections::BTreeMap;

/// Snapshot of graph-level numbers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct GraphMetrics {
    pub node_count: usize,
    pub edge_count: usize,
    pub component_count: usize,
    /// Size of the largest connected component.
    pub largest_component: usize,
    pub max_degree: u32,
    /// Nodes with a non-zero orphan fade.
    pub fading_nodes: usize,
    /// `edge_count / node_count`, stored as millionths.
    pub density_millionths: u64,
    /// Live node count per state, ascending by ordinal.
    pub state_histogram: BTreeMap<NodeState, usize>,
}

impl GraphMetrics {
    /// Compute metrics from a graph.
    #[must_use]
    pub fn from_graph(graph: &Graph) -> Self {
        let node_count = graph.node_count();
        let edge_count = graph.edge_count();
        let components = graph.connected_components();

        let density_millionths = if node_count > 0 {
            (edge_count as u64).saturating_mul(1_000_000) / node_count as u64
        } else {
            0
        };

        Self {
            node_count,
            edge_count,
            component_count: components.len(),
            largest_component: components.iter().map(Vec::len).max().unwrap_or(0),
            max_degree: graph.node_ids().map(|id| graph.degree(id)).max().unwrap_or(0),
            fading_nodes: graph.nodes().filter(|n| n.fade_permille > 0).count(),
            density_millionths,
            state_histogram: state_histogram(graph),
        }
    }
}

/// Count live nodes per state.
#[must_use]
pub fn state_histogram(graph: &Graph) -> BTreeMap<NodeState, usize> {
    let mut histogram = BTreeMap::new();
    for node in graph.nodes() {
        *histogram.entry(node.state).or_insert(0) += 1;
    }
    histogram
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_graph() {
        assert_eq!(GraphMetrics::from_graph(&Graph::new()), GraphMetrics::default());
    }

    #[test]
    fn counts_and_histogram() {
        let mut graph = Graph::new();
        let a = graph.add_node(NodeState::A);
        let b = graph.add_node(NodeState::B);
        let c = graph.add_node(NodeState::B);
        graph.add_edge(a, b).expect("edge");
        graph.add_edge(a, c).expect("edge");
        graph.add_node(NodeState::F);

        let metrics = GraphMetrics::from_graph(&graph);
        assert_eq!(metrics.node_count, 4);
        assert_eq!(metrics.edge_count, 2);
        assert_eq!(metrics.component_count, 2);
        assert_eq!(metrics.largest_component, 3);
        assert_eq!(metrics.max_degree, 2);
        assert_eq!(metrics.density_millionths, 500_000);
        assert_eq!(metrics.state_histogram.get(&NodeState::B), Some(&2));
        assert_eq!(metrics.state_histogram.get(&NodeState::F), Some(&1));
        assert_eq!(metrics.state_histogram.get(&NodeState::C), None);
    }
}
