use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// How a frontier formula is combined with the transition relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchingMode {
    /// One successor formula per frontier formula: `r ∧ ⋁ transitions`.
    #[default]
    Disjunction,
    /// One successor per satisfiable `r ∧ t`; disabled branches are dropped.
    EnabledOnly,
}

/// Strategy used to certify that the reachable set stopped growing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedPointCheck {
    /// No path of length k visits pairwise distinct states.
    #[default]
    LoopFree,
    /// `cumulative(k) ⇒ cumulative(k-1)` renamed onto step k is valid.
    Implication,
    /// Plain bounded checking.
    Disabled,
}

/// Options for one bounded model checking run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BmcConfig {
    /// Number of steps to unroll; steps `0..bound` are checked.
    pub bound: usize,
    pub branching: BranchingMode,
    pub fixed_point: FixedPointCheck,
    /// Report reachable states where no transition guard is enabled.
    pub check_deadlock: bool,
    /// Overall wall-clock budget in seconds; 0 means unlimited.
    pub timeout_secs: u64,
}

impl Default for BmcConfig {
    fn default() -> Self {
        Self {
            bound: 20,
            branching: BranchingMode::default(),
            fixed_point: FixedPointCheck::default(),
            check_deadlock: true,
            timeout_secs: 0,
        }
    }
}

impl BmcConfig {
    pub fn with_bound(bound: usize) -> Self {
        Self {
            bound,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.bound == 0 {
            return Err(EngineError::InvalidConfig(
                "bound must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
