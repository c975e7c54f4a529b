//! # gum-core
//!
//! The deterministic Graph Unfolding Machine.
//!
//! A genome (an ordered table of condition → operation rules) is applied
//! synchronously, step by step, to an undirected graph of state-tagged
//! nodes. Each step grows, retags, rewires and prunes the graph.
//!
//! ## Architectural Constraints
//!
//! - Single-threaded and synchronous: a step runs to completion
//! - Deterministic: `BTreeMap`/`BTreeSet` everywhere, ascending-id iteration,
//!   integer arithmetic only
//! - No I/O: file handling lives in the `gum` binary
//!
//! ## Example
//!
//! ```
//! use gum_core::{
//!     Graph, GraphUnfoldingMachine, MachineCfg, NodeState, Operation, OperationCondition,
//!     OperationKind, RuleItem,
//! };
//!
//! let mut machine = GraphUnfoldingMachine::new(Graph::new(), MachineCfg::default());
//! machine.seed_if_empty();
//! machine.add_rule_item(RuleItem::new(
//!     OperationCondition::on_state(NodeState::A),
//!     Operation::new(OperationKind::GiveBirthConnected, NodeState::B),
//! ));
//!
//! machine.run_one_step().expect("step");
//! assert_eq!(machine.nodes().len(), 2);
//! assert_eq!(machine.edges().len(), 1);
//! ```

// =============================================================================
// MODULES
// =============================================================================

pub mod config;
pub mod formats;
pub mod genome;
pub mod graph;
pub mod lifecycle;
pub mod machine;
pub mod rules;
pub mod search;
pub mod system;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{EdgeView, GumError, Node, NodeId, NodeState, NodeView};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use config::{
    CountCompare, MachineCfg, NearestSearchCfg, OrphanCleanupCfg, SizeBuckets, TieBreaker,
    Transcription,
};
pub use genome::{GenomeDocument, RuleRecord};
pub use graph::{Adjacency, Graph, SerializableGraph, Topology};
pub use lifecycle::Lifecycle;
pub use machine::{GraphUnfoldingMachine, StepPhase, StepReport};
pub use rules::{
    CountRange, MatchContext, Operation, OperationCondition, OperationKind, RuleItem, RuleTable,
};
pub use search::find_nearest;

// =============================================================================
// RE-EXPORTS: Formats & System
// =============================================================================

#[cfg(feature = "crypto-hash")]
pub use formats::graph_fingerprint;
pub use formats::{RunState, state_from_bytes, state_to_bytes};
pub use system::{GraphMetrics, state_histogram};
