//! # Graph Store
//!
//! The deterministic, undirected graph owned by the unfolding machine.
//!
//! All data structures use `BTreeMap`/`BTreeSet` for deterministic ordering:
//! node iteration is ascending by id and edge iteration is ascending by
//! `(min, max)` endpoint pair.

use crate::{EdgeView, GumError, Node, NodeId, NodeState};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

// =============================================================================
// ADJACENCY TRAIT
// =============================================================================

/// Read-only adjacency used by searches.
///
/// Implemented by the live [`Graph`] and by a frozen [`Topology`], so the same
/// search can run against the step-start edge set or against the current one.
pub trait Adjacency {
    /// Neighbor set of a node, `None` if the node is unknown.
    fn adjacent(&self, node: NodeId) -> Option<&BTreeSet<NodeId>>;

    /// Are `a` and `b` joined by an edge?
    fn are_adjacent(&self, a: NodeId, b: NodeId) -> bool {
        self.adjacent(a).is_some_and(|set| set.contains(&b))
    }
}

/// Frozen copy of the adjacency taken at step start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    adjacency: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl Topology {
    /// Nodes present when the snapshot was taken.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency.keys().copied()
    }

    /// Neighbors at snapshot time, ascending. Empty for unknown nodes.
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency.get(&node).into_iter().flatten().copied()
    }

    /// Degree at snapshot time.
    #[must_use]
    pub fn degree(&self, node: NodeId) -> u32 {
        self.adjacency.get(&node).map_or(0, |set| set.len() as u32)
    }
}

impl Adjacency for Topology {
    fn adjacent(&self, node: NodeId) -> Option<&BTreeSet<NodeId>> {
        self.adjacency.get(&node)
    }
}

// =============================================================================
// GRAPH IMPLEMENTATION
// =============================================================================

/// The graph store.
///
/// Sole owner of nodes and edges. Edges are stored symmetrically, so
/// `(a, b)` and `(b, a)` are the same edge and a degree is the size of the
/// neighbor set.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Node storage: NodeId -> Node
    nodes: BTreeMap<NodeId, Node>,

    /// Symmetric adjacency: node -> neighbors
    adjacency: BTreeMap<NodeId, BTreeSet<NodeId>>,

    /// Largest id ever stored. Survives deletions so ids are never reused.
    max_id_seen: u64,
}

impl Graph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id the allocator would hand out: `max(existing ids, 0) + 1`,
    /// never below an id that was already used.
    #[must_use]
    pub fn allocate_node_id(&self) -> NodeId {
        let live_max = self.nodes.keys().next_back().map_or(0, |id| id.0);
        NodeId(live_max.max(self.max_id_seen).saturating_add(1))
    }

    /// Add a fresh node with the given state and return its id.
    pub fn add_node(&mut self, state: NodeState) -> NodeId {
        let id = self.allocate_node_id();
        self.max_id_seen = id.0;
        self.nodes.insert(id, Node::new(id, state));
        self.adjacency.insert(id, BTreeSet::new());
        id
    }

    /// Insert a fully formed node under its own id (seeding, checkpoints).
    pub fn insert_node(&mut self, node: Node) -> Result<(), GumError> {
        if self.nodes.contains_key(&node.id) {
            return Err(GumError::DuplicateNode(node.id));
        }
        self.max_id_seen = self.max_id_seen.max(node.id.0);
        self.adjacency.insert(node.id, BTreeSet::new());
        self.nodes.insert(node.id, node);
        Ok(())
    }

    /// Connect `a` and `b`.
    ///
    /// Returns `Ok(true)` if a new edge was created, `Ok(false)` if it already
    /// existed or `a == b` (self-loops are never stored).
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> Result<bool, GumError> {
        self.require(a)?;
        self.require(b)?;
        if a == b {
            return Ok(false);
        }
        let inserted = self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
        Ok(inserted)
    }

    /// Disconnect `a` and `b`. Returns whether an edge was removed.
    pub fn remove_edge(&mut self, a: NodeId, b: NodeId) -> Result<bool, GumError> {
        self.require(a)?;
        self.require(b)?;
        let removed = self.adjacency.get_mut(&a).is_some_and(|set| set.remove(&b));
        if let Some(set) = self.adjacency.get_mut(&b) {
            set.remove(&a);
        }
        Ok(removed)
    }

    /// Tombstone a node. It stays in the store until the next sweep.
    pub fn mark_deleted(&mut self, id: NodeId) -> Result<(), GumError> {
        self.node_mut(id)
            .ok_or(GumError::NodeNotFound(id))?
            .marked_as_deleted = true;
        Ok(())
    }

    /// Remove every tombstoned node together with its incident edges.
    ///
    /// Returns the removed ids in ascending order.
    pub fn remove_marked_nodes(&mut self) -> Vec<NodeId> {
        let marked: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.marked_as_deleted)
            .map(|n| n.id)
            .collect();

        for id in &marked {
            if let Some(neighbors) = self.adjacency.remove(id) {
                for neighbor in neighbors {
                    if let Some(set) = self.adjacency.get_mut(&neighbor) {
                        set.remove(id);
                    }
                }
            }
            self.nodes.remove(id);
        }

        marked
    }

    /// Get all nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node ids in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get all edges as `(min, max)` pairs in deterministic order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeView> + '_ {
        self.adjacency.iter().flat_map(|(a, neighbors)| {
            neighbors
                .range((std::ops::Bound::Excluded(*a), std::ops::Bound::Unbounded))
                .map(move |b| EdgeView { a: *a, b: *b })
        })
    }

    /// Lookup a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Lookup a node for mutation.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Lookup a node that must exist.
    pub fn require(&self, id: NodeId) -> Result<&Node, GumError> {
        self.nodes.get(&id).ok_or(GumError::NodeNotFound(id))
    }

    /// Check if the graph contains a node.
    #[must_use]
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Are `a` and `b` connected by an edge?
    #[must_use]
    pub fn are_connected(&self, a: NodeId, b: NodeId) -> bool {
        self.are_adjacent(a, b)
    }

    /// Neighbors of a node in ascending order.
    pub fn neighbors(&self, id: NodeId) -> Result<Vec<NodeId>, GumError> {
        self.require(id)?;
        Ok(self
            .adjacency
            .get(&id)
            .into_iter()
            .flatten()
            .copied()
            .collect())
    }

    /// Live degree (`connectionsCount`).
    #[must_use]
    pub fn degree(&self, id: NodeId) -> u32 {
        self.adjacency.get(&id).map_or(0, |set| set.len() as u32)
    }

    /// Total number of nodes, tombstoned ones included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of nodes not marked for deletion.
    #[must_use]
    pub fn live_node_count(&self) -> usize {
        self.nodes.values().filter(|n| !n.marked_as_deleted).count()
    }

    /// Total number of undirected edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    /// Freeze the current adjacency.
    #[must_use]
    pub fn topology(&self) -> Topology {
        Topology {
            adjacency: self.adjacency.clone(),
        }
    }

    /// The node with the smallest `parents_count` (ties: smallest id).
    ///
    /// Its component is the primary component.
    #[must_use]
    pub fn oldest_node(&self) -> Option<NodeId> {
        self.nodes
            .values()
            .min_by_key(|n| (n.parents_count, n.id))
            .map(|n| n.id)
    }

    /// Connected components.
    ///
    /// Each component is sorted ascending; components are ordered by their
    /// smallest id.
    #[must_use]
    pub fn connected_components(&self) -> Vec<Vec<NodeId>> {
        let mut visited = BTreeSet::new();
        let mut components = Vec::new();

        for &root in self.nodes.keys() {
            if !visited.insert(root) {
                continue;
            }

            let mut component = vec![root];
            let mut queue = VecDeque::from([root]);

            while let Some(current) = queue.pop_front() {
                for &neighbor in self.adjacency.get(&current).into_iter().flatten() {
                    if visited.insert(neighbor) {
                        component.push(neighbor);
                        queue.push_back(neighbor);
                    }
                }
            }

            component.sort_unstable();
            components.push(component);
        }

        components
    }
}

impl Adjacency for Graph {
    fn adjacent(&self, node: NodeId) -> Option<&BTreeSet<NodeId>> {
        self.adjacency.get(&node)
    }
}

// =============================================================================
// SERIALIZATION SUPPORT
// =============================================================================

/// Serializable representation of the graph for run-state checkpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SerializableGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<(NodeId, NodeId)>,
    pub max_id_seen: u64,
}

impl From<&Graph> for SerializableGraph {
    fn from(graph: &Graph) -> Self {
        Self {
            nodes: graph.nodes.values().cloned().collect(),
            edges: graph.edges().map(|e| (e.a, e.b)).collect(),
            max_id_seen: graph.max_id_seen,
        }
    }
}

impl TryFrom<SerializableGraph> for Graph {
    type Error = GumError;

    fn try_from(sg: SerializableGraph) -> Result<Self, Self::Error> {
        let mut graph = Graph::new();
        for node in sg.nodes {
            graph.insert_node(node)?;
        }
        for (a, b) in sg.edges {
            graph.add_edge(a, b)?;
        }
        graph.max_id_seen = graph.max_id_seen.max(sg.max_id_seen);
        Ok(graph)
    }
}

// =============================================================================
// TESTS
// =============================================================================
