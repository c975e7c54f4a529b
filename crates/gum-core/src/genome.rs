//! # Genome Records
//!
//! The plain external form of rules, machine configuration and seed graphs,
//! as produced by rule editors and stored in genome documents.
//!
//! Records carry state and operation names as strings. Converting a record
//! into its typed counterpart validates every token and fails fast with
//! [`GumError::InvalidGenome`]; nothing is silently dropped.
//!
//! ## Rule record
//!
//! ```json
//! { "condition": { "current": "A", "prior": "any", "conn_with_state": "B",
//!                  "conn_ge": 1, "conn_le": -1, "parents_ge": -1, "parents_le": -1 },
//!   "op": { "kind": "TurnToState", "operand": "C" },
//!   "enabled": true }
//! ```
//!
//! `conn_ge`/`conn_le` bound the number of neighbors in `conn_with_state`
//! when that field names a concrete state, and the total degree otherwise.
//! `degree_ge`/`degree_le` bound the total degree alongside a concrete
//! `conn_with_state`; without one they may not be combined with the `conn_*`
//! bounds.
//!
//! States assigned to nodes (seed nodes, `TurnToState` and birth operands)
//! must be concrete: `any` and `Unknown` are rejected there.

use crate::config::MachineCfg;
use crate::machine::GraphUnfoldingMachine;
use crate::rules::{CountRange, Operation, OperationCondition, OperationKind, RuleItem, RuleTable};
use crate::{Graph, GumError, Node, NodeId, NodeState};
use serde::{Deserialize, Serialize};

/// Misspelled operation names still accepted on input.
pub const LEGACY_KIND_ALIASES: &[(&str, OperationKind)] =
    &[("DisconectFrom", OperationKind::DisconnectFrom)];

/// Parse an operation name, canonical or legacy.
pub fn parse_kind(token: &str) -> Result<OperationKind, GumError> {
    OperationKind::ALL
        .into_iter()
        .find(|kind| kind.name() == token)
        .or_else(|| {
            LEGACY_KIND_ALIASES
                .iter()
                .find(|(alias, _)| *alias == token)
                .map(|&(_, kind)| kind)
        })
        .ok_or_else(|| GumError::InvalidGenome(format!("unknown operation kind {token:?}")))
}

fn parse_state(token: &str, field: &str) -> Result<NodeState, GumError> {
    NodeState::from_name(token)
        .map_err(|_| GumError::InvalidGenome(format!("{field}: unknown state {token:?}")))
}

/// Like [`parse_state`], for states a node will actually carry.
fn parse_concrete_state(token: &str, field: &str) -> Result<NodeState, GumError> {
    let state = parse_state(token, field)?;
    if state.is_wildcard() || state.is_unknown() {
        return Err(GumError::InvalidGenome(format!(
            "{field}: {token:?} is not a state a node can carry"
        )));
    }
    Ok(state)
}

fn wildcard() -> String {
    NodeState::IGNORED.name()
}

fn enabled_by_default() -> bool {
    true
}

fn bound(value: Option<i64>) -> i64 {
    value.unwrap_or(-1)
}

fn record_bound(value: i64) -> Option<i64> {
    (value >= 0).then_some(value)
}

// =============================================================================
// RULE RECORDS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionRecord {
    #[serde(default = "wildcard")]
    pub current: String,
    #[serde(default = "wildcard")]
    pub prior: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conn_with_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conn_ge: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conn_le: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree_ge: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree_le: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parents_ge: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parents_le: Option<i64>,
}

impl Default for ConditionRecord {
    fn default() -> Self {
        Self {
            current: wildcard(),
            prior: wildcard(),
            conn_with_state: None,
            conn_ge: None,
            conn_le: None,
            degree_ge: None,
            degree_le: None,
            parents_ge: None,
            parents_le: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpRecord {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operand: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleRecord {
    #[serde(default)]
    pub condition: ConditionRecord,
    pub op: OpRecord,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl TryFrom<&ConditionRecord> for OperationCondition {
    type Error = GumError;

    fn try_from(record: &ConditionRecord) -> Result<Self, Self::Error> {
        let mut condition = OperationCondition::on_state(parse_state(&record.current, "current")?)
            .with_prior(parse_state(&record.prior, "prior")?)
            .with_parents(CountRange::new(
                bound(record.parents_ge),
                bound(record.parents_le),
            ));

        let conn = CountRange::new(bound(record.conn_ge), bound(record.conn_le));
        let conn_state = record
            .conn_with_state
            .as_deref()
            .map(|token| parse_state(token, "conn_with_state"))
            .transpose()?
            .filter(|state| !state.is_wildcard());

        let degree = CountRange::new(bound(record.degree_ge), bound(record.degree_le));
        condition = match conn_state {
            Some(state) => condition
                .with_conn_with_state(state, conn)
                .with_connections(degree),
            None if !conn.is_unbounded() && !degree.is_unbounded() => {
                return Err(GumError::InvalidGenome(
                    "conn_ge/conn_le and degree_ge/degree_le both bound the degree".to_string(),
                ));
            }
            None if conn.is_unbounded() => condition.with_connections(degree),
            None => condition.with_connections(conn),
        };
        Ok(condition)
    }
}

impl TryFrom<&OpRecord> for Operation {
    type Error = GumError;

    fn try_from(record: &OpRecord) -> Result<Self, Self::Error> {
        let kind = parse_kind(&record.kind)?;
        if !kind.takes_operand() {
            return Ok(Operation::new(kind, NodeState::IGNORED));
        }
        let token = record.operand.as_deref().ok_or_else(|| {
            GumError::InvalidGenome(format!("operation {kind} requires an operand"))
        })?;
        let operand = if kind.assigns_state() {
            parse_concrete_state(token, "operand")?
        } else {
            parse_state(token, "operand")?
        };
        Ok(Operation::new(kind, operand))
    }
}

impl TryFrom<&RuleRecord> for RuleItem {
    type Error = GumError;

    fn try_from(record: &RuleRecord) -> Result<Self, Self::Error> {
        let item = RuleItem::new(
            OperationCondition::try_from(&record.condition)?,
            Operation::try_from(&record.op)?,
        );
        Ok(if record.enabled { item } else { item.disabled() })
    }
}

impl From<&RuleItem> for RuleRecord {
    fn from(item: &RuleItem) -> Self {
        let cond = &item.condition;
        let (conn_with_state, conn, degree) = match cond.conn_with_state {
            Some(cws) => (Some(cws.state.name()), cws.range, cond.all_connections),
            None => (None, cond.all_connections, CountRange::ANY),
        };
        let operand = item
            .operation
            .kind
            .takes_operand()
            .then(|| item.operation.operand.name());

        Self {
            condition: ConditionRecord {
                current: cond.current.name(),
                prior: cond.prior.name(),
                conn_with_state,
                conn_ge: record_bound(conn.ge),
                conn_le: record_bound(conn.le),
                degree_ge: record_bound(degree.ge),
                degree_le: record_bound(degree.le),
                parents_ge: record_bound(cond.parents.ge),
                parents_le: record_bound(cond.parents.le),
            },
            op: OpRecord {
                kind: item.operation.kind.name().to_string(),
                operand,
            },
            enabled: item.is_enabled,
        }
    }
}

// =============================================================================
// SEED GRAPH
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeRecord {
    pub id: u64,
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InitGraphRecord {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<[u64; 2]>,
}

impl TryFrom<&InitGraphRecord> for Graph {
    type Error = GumError;

    fn try_from(record: &InitGraphRecord) -> Result<Self, Self::Error> {
        let mut graph = Graph::new();
        for node in &record.nodes {
            let state = parse_concrete_state(&node.state, "init_graph.nodes")?;
            graph
                .insert_node(Node::new(NodeId(node.id), state))
                .map_err(|e| GumError::InvalidGenome(e.to_string()))?;
        }
        for &[a, b] in &record.edges {
            graph
                .add_edge(NodeId(a), NodeId(b))
                .map_err(|e| GumError::InvalidGenome(format!("init_graph.edges [{a}, {b}]: {e}")))?;
        }
        Ok(graph)
    }
}

impl From<&Graph> for InitGraphRecord {
    fn from(graph: &Graph) -> Self {
        Self {
            nodes: graph
                .nodes()
                .map(|n| NodeRecord {
                    id: n.id.0,
                    state: n.state.name(),
                })
                .collect(),
            edges: graph.edges().map(|e| [e.a.0, e.b.0]).collect(),
        }
    }
}

// =============================================================================
// GENOME DOCUMENT
// =============================================================================

/// A complete genome document: configuration, rules and seed graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenomeDocument {
    pub machine: MachineCfg,
    pub rules: Vec<RuleRecord>,
    pub init_graph: InitGraphRecord,
}

impl GenomeDocument {
    /// Validate every rule record, in order.
    pub fn rule_table(&self) -> Result<RuleTable, GumError> {
        let mut table = RuleTable::new();
        for (index, record) in self.rules.iter().enumerate() {
            let item = RuleItem::try_from(record).map_err(|e| match e {
                GumError::InvalidGenome(msg) => GumError::InvalidGenome(format!("rule {index}: {msg}")),
                other => other,
            })?;
            table.add_rule_item(item);
        }
        Ok(table)
    }

    pub fn initial_graph(&self) -> Result<Graph, GumError> {
        Graph::try_from(&self.init_graph)
    }

    /// Build a machine ready to step. An empty seed graph gets one
    /// `start_state` node.
    pub fn build_machine(&self) -> Result<GraphUnfoldingMachine, GumError> {
        let rules = self.rule_table()?;
        let graph = self.initial_graph()?;
        let mut machine = GraphUnfoldingMachine::with_rules(graph, self.machine.clone(), rules);
        machine.seed_if_empty();
        Ok(machine)
    }

    /// Export a machine's configuration, rules and current graph.
    #[must_use]
    pub fn from_machine(machine: &GraphUnfoldingMachine) -> Self {
        Self {
            machine: machine.config().clone(),
            rules: machine.rule_items().iter().map(RuleRecord::from).collect(),
            init_graph: InitGraphRecord::from(machine.graph()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
