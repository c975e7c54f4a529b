//! # Property-Based Tests
//!
//! Determinism and structural invariants of the machine under random
//! genomes and random seed graphs.

use gum_core::{
    CountRange, Graph, GraphUnfoldingMachine, MachineCfg, NodeId, NodeState, Operation,
    OperationCondition, OperationKind, RuleItem, state_from_bytes, state_to_bytes,
};
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::sample::select;

// =============================================================================
// STRATEGIES
// =============================================================================

fn letter() -> impl Strategy<Value = NodeState> {
    (1u8..=5).prop_map(NodeState::from_ordinal)
}

fn condition_state() -> impl Strategy<Value = NodeState> {
    prop_oneof![Just(NodeState::IGNORED), letter()]
}

fn rule_item() -> impl Strategy<Value = RuleItem> {
    (
        condition_state(),
        select(OperationKind::ALL.to_vec()),
        letter(),
        -1i64..4,
        any::<bool>(),
    )
        .prop_map(|(current, kind, operand, max_degree, enabled)| {
            let item = RuleItem::new(
                OperationCondition::on_state(current)
                    .with_connections(CountRange::new(-1, max_degree)),
                Operation::new(kind, operand),
            );
            if enabled { item } else { item.disabled() }
        })
}

/// Seed states plus edges given as index pairs into the seed.
fn seed_graph() -> impl Strategy<Value = (Vec<NodeState>, Vec<(usize, usize)>)> {
    vec(letter(), 1..8).prop_flat_map(|states| {
        let n = states.len();
        (Just(states), vec((0..n, 0..n), 0..12))
    })
}

fn build(
    (states, edges): &(Vec<NodeState>, Vec<(usize, usize)>),
    rules: &[RuleItem],
    cfg: MachineCfg,
) -> GraphUnfoldingMachine {
    let mut graph = Graph::new();
    let ids: Vec<NodeId> = states.iter().map(|&s| graph.add_node(s)).collect();
    for &(a, b) in edges {
        graph.add_edge(ids[a], ids[b]).expect("edge");
    }
    let mut machine = GraphUnfoldingMachine::new(graph, cfg);
    for item in rules {
        machine.add_rule_item(item.clone());
    }
    machine
}

fn small_cfg(single_component: bool, orphans: bool) -> MachineCfg {
    let mut cfg = MachineCfg {
        max_vertices: 40,
        maintain_single_component: single_component,
        ..MachineCfg::default()
    };
    cfg.orphan_cleanup.enabled = orphans;
    cfg
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Two machines built from the same inputs stay identical step for step.
    #[test]
    fn identical_inputs_produce_identical_runs(
        seed in seed_graph(),
        rules in vec(rule_item(), 1..8),
        single in any::<bool>(),
        orphans in any::<bool>(),
    ) {
        let mut first = build(&seed, &rules, small_cfg(single, orphans));
        let mut second = build(&seed, &rules, small_cfg(single, orphans));

        for _ in 0..6 {
            let a = first.run_one_step().expect("step");
            let b = second.run_one_step().expect("step");
            prop_assert_eq!(a, b);
            prop_assert_eq!(first.nodes(), second.nodes());
            prop_assert_eq!(first.edges(), second.edges());
        }
    }

    /// Births always receive ids above every id seen before.
    #[test]
    fn birth_ids_increase_monotonically(
        seed in seed_graph(),
        rules in vec(rule_item(), 1..8),
    ) {
        let mut machine = build(&seed, &rules, small_cfg(false, true));
        let mut high_water = machine.nodes().iter().map(|n| n.id).max().unwrap_or(NodeId(0));

        for _ in 0..6 {
            let report = machine.run_one_step().expect("step");
            for id in report.births {
                prop_assert!(id > high_water);
                high_water = id;
            }
        }
    }

    /// After every step: no deleted node survives, edges join live distinct
    /// nodes, and the vertex cap holds.
    #[test]
    fn steps_leave_graph_well_formed(
        seed in seed_graph(),
        rules in vec(rule_item(), 1..8),
        single in any::<bool>(),
    ) {
        let mut machine = build(&seed, &rules, small_cfg(single, false));
        let start = machine.graph().node_count();

        for _ in 0..6 {
            machine.run_one_step().expect("step");
            let graph = machine.graph();

            prop_assert!(graph.nodes().all(|n| !n.marked_as_deleted));
            for edge in machine.edges() {
                prop_assert!(edge.a < edge.b);
                prop_assert!(graph.contains_node(edge.a) && graph.contains_node(edge.b));
            }
            prop_assert_eq!(graph.edge_count(), machine.edges().len());
            prop_assert!(graph.node_count() <= start.max(machine.max_vertices()));
            if single && graph.node_count() > 0 {
                prop_assert_eq!(graph.connected_components().len(), 1);
            }
        }
    }

    /// Adding an edge twice, in either direction, stores it once.
    #[test]
    fn edge_insertion_is_idempotent(states in vec(letter(), 2..6), a in 0usize..6, b in 0usize..6) {
        let mut graph = Graph::new();
        let ids: Vec<NodeId> = states.iter().map(|&s| graph.add_node(s)).collect();
        let (x, y) = (ids[a % ids.len()], ids[b % ids.len()]);

        let first = graph.add_edge(x, y).expect("edge");
        let again = graph.add_edge(y, x).expect("edge");

        prop_assert_eq!(first, x != y);
        prop_assert!(!again);
        prop_assert_eq!(graph.edge_count(), usize::from(x != y));
        prop_assert_eq!(graph.are_connected(x, y), graph.are_connected(y, x));
    }

    /// A run resumed from a checkpoint continues exactly like the original.
    #[test]
    fn checkpoint_resume_matches_uninterrupted_run(
        seed in seed_graph(),
        rules in vec(rule_item(), 1..8),
    ) {
        let cfg = small_cfg(false, true);
        let mut original = build(&seed, &rules, cfg.clone());
        for _ in 0..3 {
            original.run_one_step().expect("step");
        }

        let bytes = state_to_bytes(&original.run_state()).expect("encode");
        let state = state_from_bytes(&bytes).expect("decode");
        let mut table = gum_core::RuleTable::new();
        for item in &rules {
            table.add_rule_item(item.clone());
        }
        let mut resumed = GraphUnfoldingMachine::from_run_state(state, cfg, table).expect("resume");

        for _ in 0..3 {
            original.run_one_step().expect("step");
            resumed.run_one_step().expect("step");
        }
        prop_assert_eq!(original.step(), resumed.step());
        prop_assert_eq!(original.nodes(), resumed.nodes());
        prop_assert_eq!(original.edges(), resumed.edges());
    }
}
