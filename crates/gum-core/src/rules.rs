//! # Rule Table
//!
//! The genome: an ordered list of condition → operation rules.
//!
//! Table order is priority order. A node fires at most one rule per step,
//! the first enabled rule whose condition matches the node's snapshot.

use crate::config::CountCompare;
use crate::{NodeId, NodeState};

// =============================================================================
// OPERATIONS
// =============================================================================

/// The closed set of operations a rule can apply to its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationKind {
    TurnToState,
    GiveBirth,
    GiveBirthConnected,
    DisconnectFrom,
    Die,
    TryToConnectWith,
    TryToConnectWithNearest,
}

impl OperationKind {
    /// Every kind, in canonical order.
    pub const ALL: [OperationKind; 7] = [
        OperationKind::TurnToState,
        OperationKind::GiveBirth,
        OperationKind::GiveBirthConnected,
        OperationKind::DisconnectFrom,
        OperationKind::Die,
        OperationKind::TryToConnectWith,
        OperationKind::TryToConnectWithNearest,
    ];

    /// Canonical token.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            OperationKind::TurnToState => "TurnToState",
            OperationKind::GiveBirth => "GiveBirth",
            OperationKind::GiveBirthConnected => "GiveBirthConnected",
            OperationKind::DisconnectFrom => "DisconnectFrom",
            OperationKind::Die => "Die",
            OperationKind::TryToConnectWith => "TryToConnectWith",
            OperationKind::TryToConnectWithNearest => "TryToConnectWithNearest",
        }
    }

    /// Does this kind use its operand?
    #[must_use]
    pub fn takes_operand(self) -> bool {
        !matches!(self, OperationKind::Die)
    }

    /// Is the operand a state some node will carry, rather than a match target?
    #[must_use]
    pub fn assigns_state(self) -> bool {
        matches!(
            self,
            OperationKind::TurnToState | OperationKind::GiveBirth | OperationKind::GiveBirthConnected
        )
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An operation with its operand state (`IGNORED` for `Die`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub kind: OperationKind,
    pub operand: NodeState,
}

impl Operation {
    #[must_use]
    pub const fn new(kind: OperationKind, operand: NodeState) -> Self {
        Self { kind, operand }
    }

    #[must_use]
    pub const fn die() -> Self {
        Self::new(OperationKind::Die, NodeState::IGNORED)
    }
}

// =============================================================================
// CONDITIONS
// =============================================================================

/// Inclusive count bounds; a negative bound is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountRange {
    pub ge: i64,
    pub le: i64,
}

impl CountRange {
    /// No constraint.
    pub const ANY: CountRange = CountRange { ge: -1, le: -1 };

    #[must_use]
    pub const fn new(ge: i64, le: i64) -> Self {
        Self { ge, le }
    }

    /// Exactly `n` in range mode.
    #[must_use]
    pub const fn exactly(n: i64) -> Self {
        Self { ge: n, le: n }
    }

    /// At least `n`.
    #[must_use]
    pub const fn at_least(n: i64) -> Self {
        Self { ge: n, le: -1 }
    }

    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.ge < 0 && self.le < 0
    }

    /// Does `count` satisfy the bounds under `mode`?
    #[must_use]
    pub fn accepts(&self, count: u64, mode: CountCompare) -> bool {
        let count = count.min(i64::MAX as u64) as i64;
        match mode {
            CountCompare::Range => {
                (self.ge < 0 || count >= self.ge) && (self.le < 0 || count <= self.le)
            }
            CountCompare::Exact => {
                (self.ge < 0 || count == self.ge) && (self.le < 0 || count == self.le)
            }
        }
    }
}

impl Default for CountRange {
    fn default() -> Self {
        Self::ANY
    }
}

/// Count constraint over neighbors carrying one particular saved state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnWithState {
    pub state: NodeState,
    pub range: CountRange,
}

/// The frozen matching context of one node for one step.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    pub state: NodeState,
    pub prior_state: NodeState,
    pub degree: u32,
    pub parents_count: u64,
    /// Saved states of the node's step-start neighbors.
    pub neighbor_states: &'a [NodeState],
}

/// Conjunctive predicate over a node's snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationCondition {
    pub current: NodeState,
    pub prior: NodeState,
    pub all_connections: CountRange,
    pub parents: CountRange,
    pub conn_with_state: Option<ConnWithState>,
}

impl OperationCondition {
    /// Condition on the current state only.
    #[must_use]
    pub fn on_state(current: NodeState) -> Self {
        Self {
            current,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_prior(mut self, prior: NodeState) -> Self {
        self.prior = prior;
        self
    }

    #[must_use]
    pub fn with_connections(mut self, range: CountRange) -> Self {
        self.all_connections = range;
        self
    }

    #[must_use]
    pub fn with_parents(mut self, range: CountRange) -> Self {
        self.parents = range;
        self
    }

    #[must_use]
    pub fn with_conn_with_state(mut self, state: NodeState, range: CountRange) -> Self {
        self.conn_with_state = Some(ConnWithState { state, range });
        self
    }

    /// Evaluate against a snapshot.
    #[must_use]
    pub fn matches(&self, ctx: &MatchContext<'_>, mode: CountCompare) -> bool {
        if !ctx.state.matches(self.current) || !ctx.prior_state.matches(self.prior) {
            return false;
        }
        if !self.all_connections.accepts(ctx.degree as u64, mode) {
            return false;
        }
        if !self.parents.accepts(ctx.parents_count, mode) {
            return false;
        }
        match self.conn_with_state {
            Some(cws) => {
                let count = ctx
                    .neighbor_states
                    .iter()
                    .filter(|s| s.matches(cws.state))
                    .count();
                cws.range.accepts(count as u64, mode)
            }
            None => true,
        }
    }
}

impl Default for OperationCondition {
    fn default() -> Self {
        Self {
            current: NodeState::IGNORED,
            prior: NodeState::IGNORED,
            all_connections: CountRange::ANY,
            parents: CountRange::ANY,
            conn_with_state: None,
        }
    }
}

// =============================================================================
// RULE ITEM & TABLE
// =============================================================================

/// One genome rule plus its observability bookkeeping.
///
/// Only `condition`, `operation` and `is_enabled` affect behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleItem {
    pub condition: OperationCondition,
    pub operation: Operation,
    pub is_enabled: bool,
    /// Did this rule fire during the last step?
    pub is_active: bool,
    pub last_activation_step: Option<u64>,
    /// Nodes this rule fired on during the last step, ascending.
    pub active_in_nodes: Vec<NodeId>,
}

impl RuleItem {
    /// An enabled rule with clean bookkeeping.
    #[must_use]
    pub fn new(condition: OperationCondition, operation: Operation) -> Self {
        Self {
            condition,
            operation,
            is_enabled: true,
            is_active: false,
            last_activation_step: None,
            active_in_nodes: Vec::new(),
        }
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.is_enabled = false;
        self
    }
}

/// Ordered collection of rules. Insertion order is priority order.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    items: Vec<RuleItem>,
}

impl RuleTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule at the lowest priority.
    pub fn add_rule_item(&mut self, item: RuleItem) {
        self.items.push(item);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Rules in priority order.
    #[must_use]
    pub fn items(&self) -> &[RuleItem] {
        &self.items
    }

    /// Mutable access for editors (toggling `is_enabled`, rewriting operands).
    pub fn items_mut(&mut self) -> &mut [RuleItem] {
        &mut self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Index of the first enabled rule matching `ctx`.
    #[must_use]
    pub fn find(&self, ctx: &MatchContext<'_>, mode: CountCompare) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.is_enabled && item.condition.matches(ctx, mode))
    }

    /// Display cursor following a match at `index`, wrapping to 0.
    #[must_use]
    pub fn next_cursor(&self, index: usize) -> usize {
        if self.items.is_empty() {
            0
        } else {
            (index + 1) % self.items.len()
        }
    }

    /// Forget last step's activity.
    pub fn reset_activity(&mut self) {
        for item in &mut self.items {
            item.is_active = false;
            item.active_in_nodes.clear();
        }
    }

    /// Record that rule `index` fired on `node` during `step`.
    pub fn record_activation(&mut self, index: usize, node: NodeId, step: u64) {
        if let Some(item) = self.items.get_mut(index) {
            item.is_active = true;
            item.last_activation_step = Some(step);
            item.active_in_nodes.push(node);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
