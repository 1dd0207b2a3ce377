use serde::{Deserialize, Serialize};
use unroll_smt::sorts::SmtSort;
use unroll_smt::terms::SmtTerm;

use crate::error::EngineError;
use crate::state::{StateArena, StateLayout, StepVars};

/// One guarded update between step k and step k+1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub label: String,
    /// Enabling condition over step-k variables.
    pub guard: SmtTerm,
    /// Relation between step-k and step-(k+1) variables.
    pub update: SmtTerm,
}

impl Transition {
    pub fn new(label: impl Into<String>, guard: SmtTerm, update: SmtTerm) -> Self {
        Self {
            label: label.into(),
            guard,
            update,
        }
    }

    pub fn formula(&self) -> SmtTerm {
        SmtTerm::and(vec![self.guard.clone(), self.update.clone()])
    }
}

/// A symbolic transition system described by Rust procedures.
pub trait TransitionSystem {
    fn name(&self) -> &str;

    fn layout(&self) -> Result<StateLayout, EngineError>;

    /// Initial-state predicate over step-0 variables.
    fn init(&self, s0: StepVars) -> SmtTerm;

    /// Guarded updates connecting `cur` to `next`. Must be non-empty.
    fn transitions(&self, cur: StepVars, next: StepVars) -> Vec<Transition>;

    /// Bad-state predicate over the variables of a single step.
    fn bad(&self, s: StepVars) -> SmtTerm;
}

/// Disjunction of all transition formulas.
pub fn transition_relation(transitions: &[Transition]) -> SmtTerm {
    SmtTerm::or(transitions.iter().map(Transition::formula).collect())
}

/// Numeric encoding of counters and other integer-valued state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NumericMode {
    /// Fixed-width bit-vectors; arithmetic wraps, comparisons are unsigned.
    BitVec { width: u32 },
    /// Unbounded mathematical integers.
    Integer,
}

impl Default for NumericMode {
    fn default() -> Self {
        NumericMode::BitVec { width: 64 }
    }
}

impl NumericMode {
    pub fn sort(&self) -> SmtSort {
        match self {
            NumericMode::BitVec { width } => SmtSort::BitVec(*width),
            NumericMode::Integer => SmtSort::Int,
        }
    }

    /// Literal of this sort; bit-vector literals take the value modulo 2^width.
    pub fn lit(&self, value: i64) -> SmtTerm {
        match self {
            NumericMode::BitVec { width } => SmtTerm::bv(value as u64, *width),
            NumericMode::Integer => SmtTerm::int(value),
        }
    }

    /// `value` as a literal payload, or an error when it does not fit this
    /// mode without wrapping.
    pub fn check_fits(&self, value: u64, what: &str) -> Result<i64, EngineError> {
        let fits = match self {
            NumericMode::BitVec { width } if *width < 64 => value < (1u64 << width),
            _ => true,
        };
        match i64::try_from(value) {
            Ok(v) if fits => Ok(v),
            _ => Err(EngineError::InvalidConfig(format!(
                "{what} {value} is not representable in {self:?}"
            ))),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        match self {
            NumericMode::BitVec { width } if *width == 0 || *width > 64 => Err(
                EngineError::InvalidConfig(format!("bit-vector width {width} outside 1..=64")),
            ),
            _ => Ok(()),
        }
    }
}

/// Check that every variable in `term` is allocated and lives at one of the
/// `allowed` steps.
fn check_refs(arena: &StateArena, term: &SmtTerm, allowed: &[usize]) -> Result<(), String> {
    for name in term.vars() {
        let Some((_, step)) = arena.lookup(&name) else {
            return Err(format!("unknown variable `{name}`"));
        };
        if !allowed.contains(&step) {
            return Err(format!(
                "`{name}` refers to step {step}, expected one of {allowed:?}"
            ));
        }
    }
    Ok(())
}

/// Validate the guarded updates generated for step `step`.
pub fn validate_transitions(
    arena: &StateArena,
    step: usize,
    transitions: &[Transition],
) -> Result<(), EngineError> {
    let malformed = |reason: String| EngineError::MalformedTransition { step, reason };
    if transitions.is_empty() {
        return Err(malformed("transition set is empty".into()));
    }
    for t in transitions {
        check_refs(arena, &t.guard, &[step])
            .map_err(|r| malformed(format!("guard of `{}`: {r}", t.label)))?;
        check_refs(arena, &t.update, &[step, step + 1])
            .map_err(|r| malformed(format!("update of `{}`: {r}", t.label)))?;
    }
    Ok(())
}

/// Validate a single-step predicate such as `init` or `bad(k)`.
pub fn validate_predicate(
    arena: &StateArena,
    step: usize,
    what: &str,
    term: &SmtTerm,
) -> Result<(), EngineError> {
    check_refs(arena, term, &[step]).map_err(|r| EngineError::MalformedPredicate {
        step,
        reason: format!("{what}: {r}"),
    })
}
