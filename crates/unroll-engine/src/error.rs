use std::fmt;

use thiserror::Error;

use crate::reach::Termination;

/// Errors raised while unrolling and checking a transition system.
///
/// Inconclusive solver answers are not errors; they surface as
/// [`crate::BmcOutcome::Unknown`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("malformed transition relation at step {step}: {reason}")]
    MalformedTransition { step: usize, reason: String },
    #[error("malformed predicate at step {step}: {reason}")]
    MalformedPredicate { step: usize, reason: String },
    #[error("solver failure at step {step} (formula size {formula_size}): {message}")]
    Solver {
        step: usize,
        formula_size: usize,
        message: String,
    },
    #[error("model assigns no value to `{var}` at step {step}")]
    IncompleteModel { step: usize, var: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("step {step} must be proven safe before advancing past it")]
    UncheckedStep { step: usize },
    #[error("reachability accumulator used before it was seeded")]
    NotSeeded,
    #[error("run already terminated ({0})")]
    Terminated(Termination),
}

impl EngineError {
    pub(crate) fn solver(step: usize, formula_size: usize, err: impl fmt::Display) -> Self {
        EngineError::Solver {
            step,
            formula_size,
            message: err.to_string(),
        }
    }
}
