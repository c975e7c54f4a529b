//! # Graph Unfolding Machine
//!
//! The step engine. One call to [`GraphUnfoldingMachine::run_one_step`] runs
//! the fixed phase sequence below to completion:
//!
//! ```text
//! Snapshot ──▶ MatchApply ──▶ CommitPrior ──▶ Sweep ──▶ Lifecycle
//! ```
//!
//! - **Snapshot**: every node freezes `state`, degree and `parents_count`;
//!   the step-start topology is copied.
//! - **MatchApply**: nodes are visited in ascending id order; each fires the
//!   first matching rule against its frozen snapshot. Rewiring operations
//!   read the step-start topology, never edges created earlier in the phase.
//! - **CommitPrior**: `prior_state` of every surviving node becomes the state
//!   frozen at step start.
//! - **Sweep**: nodes that died are removed with their edges.
//! - **Lifecycle**: single-component enforcement or orphan cleanup, then
//!   isolated-`A` reseeding, each gated by configuration.
//!
//! The machine is single-writer: every mutating method takes `&mut self`, so
//! readers can only observe the graph between steps.

use crate::config::{MachineCfg, NearestSearchCfg, Transcription};
use crate::formats::RunState;
use crate::graph::{Graph, SerializableGraph, Topology};
use crate::lifecycle::Lifecycle;
use crate::rules::{MatchContext, Operation, OperationKind, RuleItem, RuleTable};
use crate::search::find_nearest;
use crate::{EdgeView, GumError, NodeId, NodeState, NodeView};
use serde::{Deserialize, Serialize};

// =============================================================================
// STEP PHASES & REPORT
// =============================================================================

/// The named phases of one step, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StepPhase {
    Snapshot,
    MatchApply,
    CommitPrior,
    Sweep,
    Lifecycle,
}

impl StepPhase {
    /// All phases in execution order.
    pub const SEQUENCE: [StepPhase; 5] = [
        StepPhase::Snapshot,
        StepPhase::MatchApply,
        StepPhase::CommitPrior,
        StepPhase::Sweep,
        StepPhase::Lifecycle,
    ];
}

/// What happened during one step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// Index of the step that produced this report (0 for the first).
    pub step: u64,
    /// Nodes that fired a rule.
    pub matched: usize,
    /// Nodes created this step, in creation order.
    pub births: Vec<NodeId>,
    /// Births dropped by the `max_vertices` cap.
    pub skipped_births: usize,
    /// Nodes removed by `Die`.
    pub deaths: Vec<NodeId>,
    pub edges_added: usize,
    pub edges_removed: usize,
    /// Nodes removed by single-component enforcement or orphan cleanup.
    pub lifecycle_removed: Vec<NodeId>,
    pub reseeded: Vec<NodeId>,
}

/// Frozen step-start view shared by the phases of one step.
struct StepSnapshot {
    topology: Topology,
    /// Step-start node ids, ascending. Newborns are never added.
    order: Vec<NodeId>,
}

// =============================================================================
// MACHINE
// =============================================================================

/// Applies a rule table to a graph, one synchronous step at a time.
#[derive(Debug, Clone)]
pub struct GraphUnfoldingMachine {
    graph: Graph,
    cfg: MachineCfg,
    rules: RuleTable,
    step: u64,
}

impl GraphUnfoldingMachine {
    /// Create a machine over `graph` with an empty rule table.
    #[must_use]
    pub fn new(graph: Graph, cfg: MachineCfg) -> Self {
        Self {
            graph,
            cfg,
            rules: RuleTable::new(),
            step: 0,
        }
    }

    /// Create a machine with a ready rule table.
    #[must_use]
    pub fn with_rules(graph: Graph, cfg: MachineCfg, rules: RuleTable) -> Self {
        Self {
            rules,
            ..Self::new(graph, cfg)
        }
    }

    /// Restore a machine from a run-state checkpoint.
    pub fn from_run_state(
        state: RunState,
        cfg: MachineCfg,
        rules: RuleTable,
    ) -> Result<Self, GumError> {
        let graph = Graph::try_from(state.graph)?;
        Ok(Self {
            step: state.step,
            ..Self::with_rules(graph, cfg, rules)
        })
    }

    /// Capture the graph and step counter for a later `from_run_state`.
    #[must_use]
    pub fn run_state(&self) -> RunState {
        RunState {
            step: self.step,
            graph: SerializableGraph::from(&self.graph),
        }
    }

    /// Add a single `start_state` node if the graph is empty.
    pub fn seed_if_empty(&mut self) -> Option<NodeId> {
        if self.graph.node_count() > 0 {
            return None;
        }
        let id = self.graph.add_node(self.cfg.start_state);
        tracing::debug!(node = %id, state = %self.cfg.start_state, "seeded empty graph");
        Some(id)
    }

    /// Start an externally driven run.
    ///
    /// Under `resettable` transcription the step counter, rule cursors and
    /// rule activity are cleared; under `continuable` nothing changes.
    pub fn begin_run(&mut self) {
        if self.cfg.transcription == Transcription::Continuable {
            return;
        }
        self.step = 0;
        self.rules.reset_activity();
        let ids: Vec<NodeId> = self.graph.node_ids().collect();
        for id in ids {
            if let Some(node) = self.graph.node_mut(id) {
                node.rule_cursor = 0;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Rule table surface
    // -------------------------------------------------------------------------

    pub fn add_rule_item(&mut self, item: RuleItem) {
        self.rules.add_rule_item(item);
    }

    pub fn clear_rule_table(&mut self) {
        self.rules.clear();
    }

    /// Rules in priority order.
    #[must_use]
    pub fn rule_items(&self) -> &[RuleItem] {
        self.rules.items()
    }

    pub fn rule_items_mut(&mut self) -> &mut [RuleItem] {
        self.rules.items_mut()
    }

    // -------------------------------------------------------------------------
    // Read surface
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Direct store access for seeding between steps.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    #[must_use]
    pub fn config(&self) -> &MachineCfg {
        &self.cfg
    }

    /// Number of completed steps.
    #[must_use]
    pub fn step(&self) -> u64 {
        self.step
    }

    #[must_use]
    pub fn max_vertices(&self) -> usize {
        self.cfg.max_vertices
    }

    #[must_use]
    pub fn nearest_search_cfg(&self) -> &NearestSearchCfg {
        &self.cfg.nearest_search
    }

    /// Has the configured `max_steps` budget been used up?
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.cfg.steps_exhausted(self.step)
    }

    /// Plain node records, ascending by id.
    #[must_use]
    pub fn nodes(&self) -> Vec<NodeView> {
        self.graph
            .nodes()
            .map(|n| NodeView {
                id: n.id,
                state: n.state,
                prior_state: n.prior_state,
                connections_count: self.graph.degree(n.id),
                parents_count: n.parents_count,
                born_from: n.born_from,
                fade_permille: n.fade_permille,
                orphan_age: n.orphan_age,
                rule_cursor: n.rule_cursor,
            })
            .collect()
    }

    /// Plain edge records, ascending.
    #[must_use]
    pub fn edges(&self) -> Vec<EdgeView> {
        self.graph.edges().collect()
    }

    #[must_use]
    pub fn are_nodes_connected(&self, a: NodeId, b: NodeId) -> bool {
        self.graph.are_connected(a, b)
    }

    // -------------------------------------------------------------------------
    // Manual triggers
    // -------------------------------------------------------------------------

    /// Run the nearest-node search for `node` on the live graph and connect.
    ///
    /// Returns the ids that were newly connected.
    pub fn try_to_connect_with_nearest(
        &mut self,
        node: NodeId,
        state: NodeState,
    ) -> Result<Vec<NodeId>, GumError> {
        self.graph.require(node)?;
        let found = find_nearest(&self.graph, node, state, &self.cfg.nearest_search, |id| {
            self.graph
                .node(id)
                .filter(|n| !n.marked_as_deleted)
                .map(|n| n.state)
        });

        let mut connected = Vec::with_capacity(found.len());
        for target in found {
            if self.graph.add_edge(node, target)? {
                connected.push(target);
            }
        }
        Ok(connected)
    }

    /// Prune every component but the primary one, if the policy is enabled.
    ///
    /// Returns how many nodes were removed.
    pub fn enforce_single_component_if_enabled(&mut self) -> Result<usize, GumError> {
        if !self.cfg.maintain_single_component {
            return Ok(0);
        }
        Ok(Lifecycle::enforce_single_component(&mut self.graph)?.len())
    }

    // -------------------------------------------------------------------------
    // Step
    // -------------------------------------------------------------------------

    /// Run one full step.
    pub fn run_one_step(&mut self) -> Result<StepReport, GumError> {
        let mut report = StepReport {
            step: self.step,
            ..StepReport::default()
        };

        let mut snapshot = None;
        for phase in StepPhase::SEQUENCE {
            let _span = tracing::trace_span!("phase", ?phase, step = self.step).entered();
            match phase {
                StepPhase::Snapshot => snapshot = Some(self.snapshot_phase()),
                StepPhase::MatchApply => {
                    if let Some(snap) = &snapshot {
                        self.match_apply_phase(snap, &mut report)?;
                    }
                }
                StepPhase::CommitPrior => {
                    if let Some(snap) = &snapshot {
                        self.commit_prior_phase(snap);
                    }
                }
                StepPhase::Sweep => report.deaths = self.graph.remove_marked_nodes(),
                StepPhase::Lifecycle => self.lifecycle_phase(&mut report)?,
            }
        }

        self.step = self.step.saturating_add(1);

        tracing::debug!(
            step = report.step,
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            matched = report.matched,
            births = report.births.len(),
            deaths = report.deaths.len(),
            pruned = report.lifecycle_removed.len(),
            "step complete"
        );

        Ok(report)
    }

    fn snapshot_phase(&mut self) -> StepSnapshot {
        let topology = self.graph.topology();
        let order: Vec<NodeId> = topology.node_ids().collect();

        for &id in &order {
            let degree = topology.degree(id);
            if let Some(node) = self.graph.node_mut(id) {
                node.saved_state = node.state;
                node.saved_degree = degree;
                node.saved_parents_count = node.parents_count;
            }
        }

        StepSnapshot { topology, order }
    }

    fn match_apply_phase(
        &mut self,
        snapshot: &StepSnapshot,
        report: &mut StepReport,
    ) -> Result<(), GumError> {
        self.rules.reset_activity();

        for &id in &snapshot.order {
            let Some(node) = self.graph.node(id) else {
                continue;
            };
            if node.marked_as_deleted {
                continue;
            }

            let neighbor_states: Vec<NodeState> = snapshot
                .topology
                .neighbors(id)
                .filter_map(|n| self.graph.node(n))
                .map(|n| n.saved_state)
                .collect();
            let ctx = MatchContext {
                state: node.saved_state,
                prior_state: node.prior_state,
                degree: node.saved_degree,
                parents_count: node.saved_parents_count,
                neighbor_states: &neighbor_states,
            };
            let Some(index) = self.rules.find(&ctx, self.cfg.count_compare) else {
                continue;
            };
            let Some(operation) = self.rules.items().get(index).map(|r| r.operation) else {
                continue;
            };

            self.rules.record_activation(index, id, self.step);
            let cursor = self.rules.next_cursor(index);
            if let Some(node) = self.graph.node_mut(id) {
                node.rule_cursor = cursor;
            }
            report.matched += 1;

            tracing::trace!(node = %id, rule = index, op = %operation.kind, operand = %operation.operand, "apply");
            self.apply(id, operation, snapshot, report)?;
        }

        Ok(())
    }

    fn apply(
        &mut self,
        id: NodeId,
        operation: Operation,
        snapshot: &StepSnapshot,
        report: &mut StepReport,
    ) -> Result<(), GumError> {
        let operand = operation.operand;
        match operation.kind {
            OperationKind::TurnToState => {
                if let Some(node) = self.graph.node_mut(id) {
                    node.state = operand;
                }
            }
            OperationKind::GiveBirth => self.give_birth(id, operand, false, report)?,
            OperationKind::GiveBirthConnected => self.give_birth(id, operand, true, report)?,
            OperationKind::DisconnectFrom => {
                let targets: Vec<NodeId> = snapshot
                    .topology
                    .neighbors(id)
                    .filter(|&n| {
                        self.graph
                            .node(n)
                            .is_some_and(|n| n.saved_state.matches(operand))
                    })
                    .collect();
                for target in targets {
                    if self.graph.remove_edge(id, target)? {
                        report.edges_removed += 1;
                    }
                }
            }
            OperationKind::Die => self.graph.mark_deleted(id)?,
            OperationKind::TryToConnectWith => {
                let target = self
                    .graph
                    .nodes()
                    .filter(|n| n.id != id && !n.marked_as_deleted)
                    .filter(|n| n.saved_state.matches(operand))
                    .find(|n| !self.graph.are_connected(id, n.id))
                    .map(|n| n.id);
                if let Some(target) = target
                    && self.graph.add_edge(id, target)?
                {
                    report.edges_added += 1;
                }
            }
            OperationKind::TryToConnectWithNearest => {
                let found = find_nearest(
                    &snapshot.topology,
                    id,
                    operand,
                    &self.cfg.nearest_search,
                    |n| {
                        self.graph
                            .node(n)
                            .filter(|n| !n.marked_as_deleted)
                            .map(|n| n.saved_state)
                    },
                );
                for target in found {
                    if self.graph.add_edge(id, target)? {
                        report.edges_added += 1;
                    }
                }
            }
        }
        Ok(())
    }

    fn give_birth(
        &mut self,
        parent: NodeId,
        state: NodeState,
        connected: bool,
        report: &mut StepReport,
    ) -> Result<(), GumError> {
        if !self.cfg.birth_allowed(self.graph.live_node_count()) {
            report.skipped_births += 1;
            tracing::debug!(parent = %parent, max_vertices = self.cfg.max_vertices, "birth skipped at capacity");
            return Ok(());
        }

        let parents_count = self.graph.require(parent)?.parents_count.saturating_add(1);
        let child = self.graph.add_node(state);
        if let Some(node) = self.graph.node_mut(child) {
            node.parents_count = parents_count;
            node.born_from = Some(parent);
        }
        if connected && self.graph.add_edge(parent, child)? {
            report.edges_added += 1;
        }

        report.births.push(child);
        Ok(())
    }

    fn commit_prior_phase(&mut self, snapshot: &StepSnapshot) {
        for &id in &snapshot.order {
            if let Some(node) = self.graph.node_mut(id)
                && !node.marked_as_deleted
            {
                node.prior_state = node.saved_state;
            }
        }
    }

    fn lifecycle_phase(&mut self, report: &mut StepReport) -> Result<(), GumError> {
        if self.cfg.maintain_single_component {
            report.lifecycle_removed = Lifecycle::enforce_single_component(&mut self.graph)?;
        } else if self.cfg.orphan_cleanup.enabled {
            report.lifecycle_removed =
                Lifecycle::age_orphans(&mut self.graph, &self.cfg.orphan_cleanup)?;
        }

        if self.cfg.reseeding_active() {
            report.reseeded = Lifecycle::reseed_isolated(&mut self.graph);
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{CountRange, OperationCondition};

    fn rule(current: NodeState, kind: OperationKind, operand: NodeState) -> RuleItem {
        RuleItem::new(
            OperationCondition::on_state(current),
            Operation::new(kind, operand),
        )
    }

    fn quiet_cfg() -> MachineCfg {
        MachineCfg {
            reseed_isolated_a: false,
            ..MachineCfg::default()
        }
    }

    fn machine_with(states: &[NodeState], edges: &[(usize, usize)]) -> (GraphUnfoldingMachine, Vec<NodeId>) {
        let mut graph = Graph::new();
        let ids: Vec<NodeId> = states.iter().map(|&s| graph.add_node(s)).collect();
        for &(a, b) in edges {
            graph.add_edge(ids[a], ids[b]).expect("edge");
        }
        (GraphUnfoldingMachine::new(graph, quiet_cfg()), ids)
    }

    #[test]
    fn seed_if_empty_uses_start_state() {
        let mut machine = GraphUnfoldingMachine::new(Graph::new(), quiet_cfg());
        let seed = machine.seed_if_empty().expect("seed");
        assert_eq!(machine.graph().node(seed).map(|n| n.state), Some(NodeState::A));
        assert!(machine.seed_if_empty().is_none());
    }

    #[test]
    fn turn_to_state() {
        let (mut machine, ids) = machine_with(&[NodeState::A], &[]);
        machine.add_rule_item(rule(NodeState::A, OperationKind::TurnToState, NodeState::B));

        let report = machine.run_one_step().expect("step");
        assert_eq!(report.matched, 1);
        assert_eq!(machine.graph().node(ids[0]).map(|n| n.state), Some(NodeState::B));
        assert_eq!(machine.step(), 1);
    }

    #[test]
    fn prior_state_lags_one_step() {
        let (mut machine, ids) = machine_with(&[NodeState::A], &[]);
        machine.add_rule_item(rule(NodeState::A, OperationKind::TurnToState, NodeState::B));
        machine.add_rule_item(rule(NodeState::B, OperationKind::TurnToState, NodeState::C));

        assert_eq!(machine.graph().node(ids[0]).map(|n| n.prior_state), Some(NodeState::UNKNOWN));
        machine.run_one_step().expect("step");
        assert_eq!(machine.graph().node(ids[0]).map(|n| n.prior_state), Some(NodeState::A));
        machine.run_one_step().expect("step");
        let node = machine.graph().node(ids[0]).expect("node");
        assert_eq!(node.prior_state, NodeState::B);
        assert_eq!(node.state, NodeState::C);
    }

    #[test]
    fn births_record_provenance_and_lineage() {
        let (mut machine, ids) = machine_with(&[NodeState::A, NodeState::B], &[]);
        if let Some(node) = machine.graph_mut().node_mut(ids[0]) {
            node.parents_count = 3;
        }
        machine.add_rule_item(rule(NodeState::A, OperationKind::GiveBirth, NodeState::C));
        machine.add_rule_item(rule(NodeState::B, OperationKind::GiveBirthConnected, NodeState::D));

        let report = machine.run_one_step().expect("step");
        assert_eq!(report.births.len(), 2);

        let first = machine.graph().node(report.births[0]).expect("child");
        assert_eq!(first.born_from, Some(ids[0]));
        assert_eq!(first.parents_count, 4);
        assert_eq!(first.state, NodeState::C);
        assert_eq!(machine.graph().degree(first.id), 0);

        let second = machine.graph().node(report.births[1]).expect("child");
        assert_eq!(second.born_from, Some(ids[1]));
        assert!(machine.are_nodes_connected(ids[1], second.id));
    }

    #[test]
    fn newborns_are_not_matched_in_their_birth_step() {
        let (mut machine, _) = machine_with(&[NodeState::A], &[]);
        machine.add_rule_item(rule(NodeState::A, OperationKind::GiveBirth, NodeState::A));

        let report = machine.run_one_step().expect("step");
        assert_eq!(report.matched, 1);
        assert_eq!(machine.graph().node_count(), 2);
    }

    #[test]
    fn capacity_silently_skips_births() {
        let (mut machine, _) = machine_with(&[NodeState::A, NodeState::A], &[]);
        machine.cfg.max_vertices = 3;
        machine.add_rule_item(rule(NodeState::A, OperationKind::GiveBirth, NodeState::B));

        let report = machine.run_one_step().expect("step");
        assert_eq!(report.births.len(), 1);
        assert_eq!(report.skipped_births, 1);
        assert_eq!(machine.graph().node_count(), 3);
    }

    #[test]
    fn capacity_ignores_nodes_dying_this_step() {
        let (mut machine, ids) = machine_with(&[NodeState::B, NodeState::A], &[]);
        machine.cfg.max_vertices = 2;
        machine.add_rule_item(rule(NodeState::B, OperationKind::Die, NodeState::IGNORED));
        machine.add_rule_item(rule(NodeState::A, OperationKind::GiveBirth, NodeState::C));

        let report = machine.run_one_step().expect("step");
        assert_eq!(report.deaths, vec![ids[0]]);
        assert_eq!(report.births.len(), 1);
        assert_eq!(report.skipped_births, 0);
        assert_eq!(machine.graph().node_count(), 2);
    }

    #[test]
    fn die_is_swept_with_edges() {
        let (mut machine, ids) = machine_with(&[NodeState::A, NodeState::B], &[(0, 1)]);
        machine.add_rule_item(rule(NodeState::B, OperationKind::Die, NodeState::IGNORED));

        let report = machine.run_one_step().expect("step");
        assert_eq!(report.deaths, vec![ids[1]]);
        assert_eq!(machine.graph().node_count(), 1);
        assert_eq!(machine.graph().edge_count(), 0);
    }

    #[test]
    fn try_to_connect_with_picks_lowest_unconnected() {
        let (mut machine, ids) = machine_with(
            &[NodeState::A, NodeState::C, NodeState::C, NodeState::C],
            &[(0, 1)],
        );
        machine.add_rule_item(rule(NodeState::A, OperationKind::TryToConnectWith, NodeState::C));

        let report = machine.run_one_step().expect("step");
        assert_eq!(report.edges_added, 1);
        assert!(machine.are_nodes_connected(ids[0], ids[2]));
        assert!(!machine.are_nodes_connected(ids[0], ids[3]));
    }

    #[test]
    fn disconnect_from_uses_saved_state() {
        let (mut machine, ids) = machine_with(&[NodeState::A, NodeState::B], &[(0, 1)]);
        machine.add_rule_item(rule(NodeState::B, OperationKind::TurnToState, NodeState::C));
        machine.add_rule_item(rule(NodeState::A, OperationKind::DisconnectFrom, NodeState::B));

        // B is visited first and retags itself before A disconnects.
        let (mut machine2, ids2) = machine_with(&[NodeState::B, NodeState::A], &[(0, 1)]);
        machine2.add_rule_item(rule(NodeState::B, OperationKind::TurnToState, NodeState::C));
        machine2.add_rule_item(rule(NodeState::A, OperationKind::DisconnectFrom, NodeState::B));

        machine.run_one_step().expect("step");
        machine2.run_one_step().expect("step");
        assert!(!machine.are_nodes_connected(ids[0], ids[1]));
        assert!(!machine2.are_nodes_connected(ids2[0], ids2[1]));
    }

    #[test]
    fn conn_with_state_sees_pre_step_states() {
        let (mut machine, ids) = machine_with(&[NodeState::A, NodeState::B], &[(0, 1)]);
        machine.add_rule_item(RuleItem::new(
            OperationCondition::on_state(NodeState::A)
                .with_conn_with_state(NodeState::B, CountRange::at_least(1)),
            Operation::new(OperationKind::TurnToState, NodeState::D),
        ));
        machine.add_rule_item(RuleItem::new(
            OperationCondition::on_state(NodeState::B)
                .with_conn_with_state(NodeState::A, CountRange::at_least(1)),
            Operation::new(OperationKind::TurnToState, NodeState::E),
        ));

        machine.run_one_step().expect("step");
        assert_eq!(machine.graph().node(ids[0]).map(|n| n.state), Some(NodeState::D));
        assert_eq!(machine.graph().node(ids[1]).map(|n| n.state), Some(NodeState::E));
    }

    #[test]
    fn rule_bookkeeping_is_updated() {
        let (mut machine, ids) = machine_with(&[NodeState::A, NodeState::A], &[]);
        machine.add_rule_item(rule(NodeState::A, OperationKind::TurnToState, NodeState::B));
        machine.add_rule_item(rule(NodeState::C, OperationKind::TurnToState, NodeState::D));

        machine.run_one_step().expect("step");
        let items = machine.rule_items();
        assert!(items[0].is_active);
        assert_eq!(items[0].active_in_nodes, ids);
        assert_eq!(items[0].last_activation_step, Some(0));
        assert!(!items[1].is_active);

        machine.run_one_step().expect("step");
        assert!(!machine.rule_items()[0].is_active);
    }

    #[test]
    fn continuable_keeps_first_match_precedence() {
        let (mut machine, ids) = machine_with(&[NodeState::A], &[]);
        machine.cfg.transcription = Transcription::Continuable;
        machine.add_rule_item(rule(NodeState::A, OperationKind::TurnToState, NodeState::A));
        machine.add_rule_item(rule(NodeState::A, OperationKind::TurnToState, NodeState::B));

        for _ in 0..3 {
            machine.run_one_step().expect("step");
            let node = machine.graph().node(ids[0]).expect("node");
            assert_eq!(node.state, NodeState::A);
            assert_eq!(node.rule_cursor, 1);
        }
        assert_eq!(machine.rule_items()[0].active_in_nodes, ids);
        assert!(!machine.rule_items()[1].is_active);
    }

    #[test]
    fn display_cursor_wraps_after_last_rule() {
        let (mut machine, ids) = machine_with(&[NodeState::A], &[]);
        machine.add_rule_item(rule(NodeState::C, OperationKind::TurnToState, NodeState::D));
        machine.add_rule_item(rule(NodeState::A, OperationKind::TurnToState, NodeState::B));
        machine.add_rule_item(rule(NodeState::B, OperationKind::TurnToState, NodeState::B));

        machine.run_one_step().expect("step");
        assert_eq!(machine.graph().node(ids[0]).map(|n| n.rule_cursor), Some(2));
        machine.run_one_step().expect("step");
        assert_eq!(machine.graph().node(ids[0]).map(|n| n.rule_cursor), Some(0));
    }

    #[test]
    fn begin_run_resets_only_when_resettable() {
        let (mut machine, _) = machine_with(&[NodeState::A], &[]);
        machine.run_one_step().expect("step");
        machine.begin_run();
        assert_eq!(machine.step(), 0);

        machine.cfg.transcription = Transcription::Continuable;
        machine.run_one_step().expect("step");
        machine.begin_run();
        assert_eq!(machine.step(), 1);
    }

    #[test]
    fn manual_nearest_uses_live_graph() {
        let (mut machine, ids) = machine_with(
            &[NodeState::A, NodeState::C, NodeState::B],
            &[(0, 1), (1, 2)],
        );
        let connected = machine
            .try_to_connect_with_nearest(ids[0], NodeState::B)
            .expect("connect");
        assert_eq!(connected, vec![ids[2]]);
        assert!(machine.are_nodes_connected(ids[0], ids[2]));

        let missing = machine.try_to_connect_with_nearest(NodeId(999), NodeState::B);
        assert!(matches!(missing, Err(GumError::NodeNotFound(_))));
    }

    #[test]
    fn enforce_single_component_is_gated() {
        let (mut machine, _) = machine_with(&[NodeState::A, NodeState::B], &[]);
        assert_eq!(machine.enforce_single_component_if_enabled().expect("noop"), 0);

        machine.cfg.maintain_single_component = true;
        assert_eq!(machine.enforce_single_component_if_enabled().expect("prune"), 1);
        assert_eq!(machine.graph().node_count(), 1);
    }

    #[test]
    fn run_state_roundtrip() {
        let (mut machine, _) = machine_with(&[NodeState::A], &[]);
        machine.add_rule_item(rule(NodeState::A, OperationKind::GiveBirthConnected, NodeState::B));
        machine.run_one_step().expect("step");

        let state = machine.run_state();
        let restored =
            GraphUnfoldingMachine::from_run_state(state, quiet_cfg(), RuleTable::new()).expect("restore");
        assert_eq!(restored.step(), 1);
        assert_eq!(restored.nodes(), machine.nodes());
        assert_eq!(restored.edges(), machine.edges());
    }
}
