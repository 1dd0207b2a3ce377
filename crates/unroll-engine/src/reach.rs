//! Reachable-state bookkeeping for an unrolling run.
//!
//! `frontier(k)` holds path formulas over steps `0..=k` describing the ways
//! to arrive at step k. `cumulative(k)` describes every state reachable at or
//! before step k, expressed over the step-k variables:
//!
//! ```text
//! cumulative(0) = init
//! cumulative(k) = cumulative(k-1)[vars_{k-1} -> vars_k] ∨ ⋁ frontier(k)
//! ```

use std::collections::HashMap;
use std::fmt;

use unroll_smt::terms::SmtTerm;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    BoundExhausted,
    UnsafeFound,
    FixedPointFound,
    Unknown,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Termination::BoundExhausted => "bound exhausted",
            Termination::UnsafeFound => "unsafe state found",
            Termination::FixedPointFound => "fixed point found",
            Termination::Unknown => "solver gave up",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Stepping(usize),
    Terminated(Termination),
}

#[derive(Debug, Clone)]
pub struct ReachAccumulator {
    phase: Phase,
    frontiers: Vec<Vec<SmtTerm>>,
    cumulative: Vec<SmtTerm>,
}

impl Default for ReachAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl ReachAccumulator {
    pub fn new() -> Self {
        Self {
            phase: Phase::Init,
            frontiers: Vec::new(),
            cumulative: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Step currently being explored, if the run is still stepping.
    pub fn current_step(&self) -> Option<usize> {
        match self.phase {
            Phase::Stepping(k) => Some(k),
            _ => None,
        }
    }

    /// `Init → Stepping(0)` with `frontier(0) = cumulative(0) = init`.
    pub fn seed(&mut self, init: SmtTerm) -> Result<(), EngineError> {
        match self.phase {
            Phase::Init => {
                self.frontiers.push(vec![init.clone()]);
                self.cumulative.push(init);
                self.phase = Phase::Stepping(0);
                Ok(())
            }
            Phase::Terminated(reason) => Err(EngineError::Terminated(reason)),
            Phase::Stepping(k) => Err(EngineError::MalformedPredicate {
                step: k,
                reason: "initial states seeded twice".into(),
            }),
        }
    }

    /// `Stepping(k) → Stepping(k+1)`: record `frontier(k+1)` and derive
    /// `cumulative(k+1)`. `rename` moves step-k variables onto step k+1.
    pub fn push_step(
        &mut self,
        frontier: Vec<SmtTerm>,
        rename: &HashMap<String, String>,
    ) -> Result<usize, EngineError> {
        let k = match self.phase {
            Phase::Init => return Err(EngineError::NotSeeded),
            Phase::Terminated(reason) => return Err(EngineError::Terminated(reason)),
            Phase::Stepping(k) => k,
        };
        let carried = self.cumulative[k].rename(rename);
        let mut disjuncts = Vec::with_capacity(frontier.len() + 1);
        disjuncts.push(carried);
        disjuncts.extend(frontier.iter().cloned());
        self.cumulative.push(SmtTerm::or(disjuncts).simplify());
        self.frontiers.push(frontier);
        self.phase = Phase::Stepping(k + 1);
        Ok(k + 1)
    }

    pub fn terminate(&mut self, reason: Termination) {
        self.phase = Phase::Terminated(reason);
    }

    pub fn frontier(&self, k: usize) -> Option<&[SmtTerm]> {
        self.frontiers.get(k).map(Vec::as_slice)
    }

    /// `⋁ frontier(k)`, simplified.
    pub fn frontier_disjunction(&self, k: usize) -> Option<SmtTerm> {
        self.frontier(k)
            .map(|f| SmtTerm::or(f.to_vec()).simplify())
    }

    pub fn cumulative(&self, k: usize) -> Option<&SmtTerm> {
        self.cumulative.get(k)
    }

    /// Node count of `cumulative(k)`, or 0 when the step does not exist.
    pub fn formula_size(&self, k: usize) -> usize {
        self.cumulative.get(k).map_or(0, SmtTerm::size)
    }
}
