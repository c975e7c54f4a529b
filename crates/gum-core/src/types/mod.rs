//! # Core Type Definitions
//!
//! This module contains all core types for the unfolding machine:
//! - Graph identifiers (`NodeId`)
//! - Node tags (`NodeState`) with their ordinal/name table
//! - The mutable `Node` record and its read-only `NodeView` / `EdgeView`
//! - Error types (`GumError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Use saturating arithmetic for counters to prevent overflow

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// GRAPH IDENTIFIERS
// =============================================================================

/// Unique identifier for a node in the unfolding graph.
///
/// Ids are allocated monotonically and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// NODE STATE
// =============================================================================

/// Letter names for ordinals 1..=26.
const LETTER_NAMES: [&str; 26] = [
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R", "S",
    "T", "U", "V", "W", "X", "Y", "Z",
];

/// Token accepted and emitted for the wildcard state.
pub const WILDCARD_TOKEN: &str = "any";

/// Token accepted and emitted for the "no prior step" sentinel.
pub const UNKNOWN_TOKEN: &str = "Unknown";

/// Prefix used for extended tags above `Z` (`S27` ..= `S254`).
const EXTENDED_PREFIX: char = 'S';

/// A node tag.
///
/// The ordinal is significant: lower ordinal wins priority tie-breaks.
///
/// | Ordinal | Name | Meaning |
/// |---------|------|---------|
/// | 0 | `any` | Wildcard, matches every state |
/// | 1..=26 | `A`..`Z` | Letter tags |
/// | 27..=254 | `S27`..`S254` | Extended tags |
/// | 255 | `Unknown` | Not yet assigned / no prior step |
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeState(u8);

impl NodeState {
    /// Wildcard: matches any state in a condition.
    pub const IGNORED: Self = Self(0);
    /// Sentinel for "no prior step" / unassigned.
    pub const UNKNOWN: Self = Self(u8::MAX);

    pub const A: Self = Self(1);
    pub const B: Self = Self(2);
    pub const C: Self = Self(3);
    pub const D: Self = Self(4);
    pub const E: Self = Self(5);
    pub const F: Self = Self(6);
    pub const G: Self = Self(7);
    pub const H: Self = Self(8);

    /// Build a state from its raw ordinal.
    #[must_use]
    pub const fn from_ordinal(ordinal: u8) -> Self {
        Self(ordinal)
    }

    /// Build a letter state (`'A'..='Z'`).
    #[must_use]
    pub fn letter(c: char) -> Option<Self> {
        if c.is_ascii_uppercase() {
            Some(Self(c as u8 - b'A' + 1))
        } else {
            None
        }
    }

    /// Raw ordinal value.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self.0
    }

    /// `true` for the wildcard.
    #[must_use]
    pub const fn is_wildcard(self) -> bool {
        self.0 == Self::IGNORED.0
    }

    /// `true` for the `Unknown` sentinel.
    #[must_use]
    pub const fn is_unknown(self) -> bool {
        self.0 == Self::UNKNOWN.0
    }

    /// Does this state satisfy `pattern`? The wildcard matches everything.
    #[must_use]
    pub const fn matches(self, pattern: NodeState) -> bool {
        pattern.is_wildcard() || pattern.0 == self.0
    }

    /// The lower-ordinal of two states (edge coloring tie-break).
    #[must_use]
    pub fn min_of(a: NodeState, b: NodeState) -> NodeState {
        a.min(b)
    }

    /// Canonical name of this state.
    #[must_use]
    pub fn name(self) -> String {
        match self.0 {
            0 => WILDCARD_TOKEN.to_string(),
            255 => UNKNOWN_TOKEN.to_string(),
            n @ 1..=26 => LETTER_NAMES[(n - 1) as usize].to_string(),
            n => format!("{}{}", EXTENDED_PREFIX, n),
        }
    }

    /// Parse a canonical name (or the `Ignored` alias of the wildcard).
    pub fn from_name(name: &str) -> Result<Self, GumError> {
        match name {
            WILDCARD_TOKEN | "Ignored" => return Ok(Self::IGNORED),
            UNKNOWN_TOKEN => return Ok(Self::UNKNOWN),
            _ => {}
        }

        if let Some(index) = LETTER_NAMES.iter().position(|&l| l == name) {
            return Ok(Self(index as u8 + 1));
        }

        let ordinal = name
            .strip_prefix(EXTENDED_PREFIX)
            .and_then(|digits| digits.parse::<u8>().ok())
            .filter(|n| (27..=254).contains(n))
            .ok_or_else(|| GumError::InvalidState(name.to_string()))?;
        Ok(Self(ordinal))
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl fmt::Debug for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeState({})", self.name())
    }
}

impl TryFrom<String> for NodeState {
    type Error = GumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_name(&value)
    }
}

impl From<NodeState> for String {
    fn from(state: NodeState) -> Self {
        state.name()
    }
}

impl std::str::FromStr for NodeState {
    type Err = GumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

// =============================================================================
// NODE
// =============================================================================

/// A node of the unfolding graph.
///
/// The `saved_*` fields are the per-step snapshot: they are written once at
/// the start of every step and are the only fields consulted by rule matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub state: NodeState,
    /// State at the start of the previous step (`Unknown` before the first).
    pub prior_state: NodeState,
    pub saved_state: NodeState,
    pub saved_degree: u32,
    pub saved_parents_count: u64,
    /// Lineage age: parent's count + 1 at birth. Lowest value marks the
    /// primary component.
    pub parents_count: u64,
    /// Node that gave birth to this one. Never consulted when matching.
    pub born_from: Option<NodeId>,
    pub marked_as_deleted: bool,
    /// Orphan fade signal, 0..=1000.
    pub fade_permille: u16,
    pub orphan_age: u32,
    /// Rule after the last one that fired, wrapping to 0. Display only.
    pub rule_cursor: usize,
}

impl Node {
    /// Create a fresh node with no history.
    #[must_use]
    pub fn new(id: NodeId, state: NodeState) -> Self {
        Self {
            id,
            state,
            prior_state: NodeState::UNKNOWN,
            saved_state: state,
            saved_degree: 0,
            saved_parents_count: 0,
            parents_count: 0,
            born_from: None,
            marked_as_deleted: false,
            fade_permille: 0,
            orphan_age: 0,
            rule_cursor: 0,
        }
    }
}

// =============================================================================
// READ RECORDS
// =============================================================================

/// Plain node record handed to renderers and inspectors between steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: NodeId,
    pub state: NodeState,
    pub prior_state: NodeState,
    pub connections_count: u32,
    pub parents_count: u64,
    pub born_from: Option<NodeId>,
    pub fade_permille: u16,
    pub orphan_age: u32,
    pub rule_cursor: usize,
}

/// Plain undirected edge record, always `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeView {
    pub a: NodeId,
    pub b: NodeId,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the unfolding machine.
///
/// - Structural misuse is always surfaced, never recovered silently
/// - Capacity skips and search misses are not errors
/// - The CORE should never panic
#[derive(Debug, Error)]
pub enum GumError {
    /// An operation referenced a node id that is not in the store.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// A node was inserted with an id that is already taken.
    #[error("Duplicate node id: {0}")]
    DuplicateNode(NodeId),

    /// A state token could not be parsed.
    #[error("Invalid state token: {0:?}")]
    InvalidState(String),

    /// A genome document (rules, config, seed graph) is malformed.
    #[error("Invalid genome: {0}")]
    InvalidGenome(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_table_is_bidirectional() {
        for ordinal in 0..=u8::MAX {
            let state = NodeState::from_ordinal(ordinal);
            let parsed = NodeState::from_name(&state.name()).expect("parse");
            assert_eq!(parsed, state);
        }
    }

    #[test]
    fn letter_names() {
        assert_eq!(NodeState::A.name(), "A");
        assert_eq!(NodeState::from_name("Z").expect("Z").ordinal(), 26);
        assert_eq!(NodeState::letter('F'), Some(NodeState::F));
        assert_eq!(NodeState::letter('f'), None);
    }

    #[test]
    fn sentinels() {
        assert_eq!(NodeState::from_name("any").expect("any"), NodeState::IGNORED);
        assert_eq!(NodeState::from_name("Ignored").expect("alias"), NodeState::IGNORED);
        assert_eq!(NodeState::from_name("Unknown").expect("unknown"), NodeState::UNKNOWN);
        assert_eq!(NodeState::IGNORED.ordinal(), 0);
    }

    #[test]
    fn rejects_bad_tokens() {
        assert!(NodeState::from_name("a").is_err());
        assert!(NodeState::from_name("S26").is_err());
        assert!(NodeState::from_name("S255").is_err());
        assert!(NodeState::from_name("").is_err());
    }

    #[test]
    fn wildcard_matches_everything() {
        assert!(NodeState::C.matches(NodeState::IGNORED));
        assert!(NodeState::UNKNOWN.matches(NodeState::IGNORED));
        assert!(NodeState::C.matches(NodeState::C));
        assert!(!NodeState::C.matches(NodeState::D));
    }

    #[test]
    fn lower_ordinal_wins() {
        assert_eq!(NodeState::min_of(NodeState::D, NodeState::B), NodeState::B);
        assert!(NodeState::IGNORED < NodeState::A);
        assert!(NodeState::from_ordinal(200) < NodeState::UNKNOWN);
    }

    #[test]
    fn serde_uses_names() {
        let json = serde_json::to_string(&NodeState::C).expect("ser");
        assert_eq!(json, "\"C\"");
        let back: NodeState = serde_json::from_str("\"S40\"").expect("de");
        assert_eq!(back.ordinal(), 40);
        assert!(serde_json::from_str::<NodeState>("\"nope\"").is_err());
    }

    #[test]
    fn new_node_has_no_history() {
        let node = Node::new(NodeId(7), NodeState::A);
        assert_eq!(node.prior_state, NodeState::UNKNOWN);
        assert_eq!(node.born_from, None);
        assert!(!node.marked_as_deleted);
    }
}
