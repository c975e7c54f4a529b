//! # Machine Configuration
//!
//! Every recognised machine option and its default, in one place.
//!
//! The structures deserialize directly from genome documents: absent fields
//! take the defaults below, unknown fields are rejected.

use crate::NodeState;
use serde::{Deserialize, Serialize};

/// Default vertex cap when a genome does not set one.
pub const DEFAULT_MAX_VERTICES: usize = 2000;

/// Default step budget for a driving loop.
pub const DEFAULT_MAX_STEPS: i64 = 120;

/// Default hop bound for nearest-node searches.
pub const DEFAULT_NEAREST_MAX_DEPTH: u32 = 2;

/// Sentinel meaning "no bound" for counters and step budgets.
pub const UNBOUNDED: i64 = -1;

// =============================================================================
// MODES
// =============================================================================

/// How rule-table scanning and run counters behave across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transcription {
    /// `begin_run` resets the step counter, rule cursors and rule activity.
    #[default]
    Resettable,
    /// Counters and cursors accumulate across runs.
    Continuable,
}

/// How `ge`/`le` bounds of a condition compare against counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountCompare {
    /// Inclusive `[ge, le]` range.
    #[default]
    Range,
    /// Count must equal every bound that is set.
    Exact,
}

/// Tie-breaking among equally near search candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieBreaker {
    /// Minimum node id.
    #[default]
    Stable,
}

// =============================================================================
// SUB-CONFIGS
// =============================================================================

/// Parameters of `TryToConnectWithNearest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NearestSearchCfg {
    pub max_depth: u32,
    pub tie_breaker: TieBreaker,
    /// Connect to every candidate at the nearest level instead of one.
    pub connect_all: bool,
}

impl Default for NearestSearchCfg {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_NEAREST_MAX_DEPTH,
            tie_breaker: TieBreaker::Stable,
            connect_all: false,
        }
    }
}

/// Per-component-size values used by orphan cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SizeBuckets {
    pub size1: u32,
    pub size2: u32,
    pub others: u32,
}

impl SizeBuckets {
    /// Value for a component of `size` nodes.
    #[must_use]
    pub fn for_size(&self, size: usize) -> u32 {
        match size {
            0 | 1 => self.size1,
            2 => self.size2,
            _ => self.others,
        }
    }
}

/// Orphan fade/delete policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrphanCleanupCfg {
    pub enabled: bool,
    /// Orphan age at which a component is deleted.
    pub thresholds: SizeBuckets,
    /// Orphan age at which fading begins.
    pub fade_starts: SizeBuckets,
}

impl Default for OrphanCleanupCfg {
    fn default() -> Self {
        Self {
            enabled: false,
            thresholds: SizeBuckets {
                size1: 5,
                size2: 7,
                others: 10,
            },
            fade_starts: SizeBuckets {
                size1: 3,
                size2: 4,
                others: 6,
            },
        }
    }
}

// =============================================================================
// MACHINE CONFIG
// =============================================================================

/// Configuration of one unfolding machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MachineCfg {
    /// State of the seed node created for an empty graph.
    pub start_state: NodeState,
    pub transcription: Transcription,
    pub count_compare: CountCompare,
    /// Hard vertex cap; 0 means unlimited.
    pub max_vertices: usize,
    /// Step budget for driving loops; -1 means unlimited.
    pub max_steps: i64,
    /// Reserved for randomized tie-breaking. Stored, never consumed.
    pub rng_seed: u64,
    pub nearest_search: NearestSearchCfg,
    pub maintain_single_component: bool,
    pub orphan_cleanup: OrphanCleanupCfg,
    #[serde(rename = "reseed_isolated_A", alias = "reseed_isolated_a")]
    pub reseed_isolated_a: bool,
}

impl Default for MachineCfg {
    fn default() -> Self {
        Self {
            start_state: NodeState::A,
            transcription: Transcription::Resettable,
            count_compare: CountCompare::Range,
            max_vertices: DEFAULT_MAX_VERTICES,
            max_steps: DEFAULT_MAX_STEPS,
            rng_seed: 0,
            nearest_search: NearestSearchCfg::default(),
            maintain_single_component: false,
            orphan_cleanup: OrphanCleanupCfg::default(),
            reseed_isolated_a: true,
        }
    }
}

impl MachineCfg {
    /// May one more node be born into a graph of `node_count` live nodes?
    #[must_use]
    pub fn birth_allowed(&self, node_count: usize) -> bool {
        self.max_vertices == 0 || node_count < self.max_vertices
    }

    /// Has a driving loop used up its step budget?
    #[must_use]
    pub fn steps_exhausted(&self, steps_done: u64) -> bool {
        self.max_steps >= 0 && steps_done >= self.max_steps as u64
    }

    /// Reseeding only runs when neither other lifecycle policy is active.
    #[must_use]
    pub fn reseeding_active(&self) -> bool {
        self.reseed_isolated_a && !self.maintain_single_component && !self.orphan_cleanup.enabled
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = MachineCfg::default();
        assert_eq!(cfg.max_vertices, 2000);
        assert_eq!(cfg.max_steps, 120);
        assert_eq!(cfg.nearest_search.max_depth, 2);
        assert_eq!(cfg.nearest_search.tie_breaker, TieBreaker::Stable);
        assert!(!cfg.nearest_search.connect_all);
        assert!(!cfg.orphan_cleanup.enabled);
        assert!(cfg.reseed_isolated_a);
        assert!(!cfg.maintain_single_component);
    }

    #[test]
    fn absent_fields_take_defaults() {
        let cfg: MachineCfg =
            serde_json::from_str(r#"{"nearest_search": {"connect_all": true}}"#).expect("parse");
        assert!(cfg.nearest_search.connect_all);
        assert_eq!(cfg.nearest_search.max_depth, 2);
        assert_eq!(cfg.max_vertices, 2000);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = serde_json::from_str::<MachineCfg>(r#"{"max_vertex": 10}"#);
        assert!(result.is_err());
    }

    #[test]
    fn reseed_key_uses_documented_spelling() {
        let cfg: MachineCfg =
            serde_json::from_str(r#"{"reseed_isolated_A": false}"#).expect("parse");
        assert!(!cfg.reseed_isolated_a);
    }

    #[test]
    fn capacity_zero_is_unlimited() {
        let cfg = MachineCfg {
            max_vertices: 0,
            ..MachineCfg::default()
        };
        assert!(cfg.birth_allowed(1_000_000));

        let capped = MachineCfg {
            max_vertices: 3,
            ..MachineCfg::default()
        };
        assert!(capped.birth_allowed(2));
        assert!(!capped.birth_allowed(3));
    }

    #[test]
    fn step_budget() {
        let cfg = MachineCfg {
            max_steps: 2,
            ..MachineCfg::default()
        };
        assert!(!cfg.steps_exhausted(1));
        assert!(cfg.steps_exhausted(2));

        let unlimited = MachineCfg {
            max_steps: UNBOUNDED,
            ..MachineCfg::default()
        };
        assert!(!unlimited.steps_exhausted(u64::MAX));
    }

    #[test]
    fn size_buckets() {
        let buckets = OrphanCleanupCfg::default().thresholds;
        assert_eq!(buckets.for_size(1), 5);
        assert_eq!(buckets.for_size(2), 7);
        assert_eq!(buckets.for_size(9), 10);
    }
}
