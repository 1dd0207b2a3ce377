//! Scoped solver queries: bounded safety, fixed-point detection, deadlock
//! detection and branch feasibility.
//!
//! Every query runs inside a [`SolverScope`], so nothing asserted here
//! survives past the call.

use unroll_smt::solver::{Model, SatResult, SmtSolver, SolverScope};
use unroll_smt::sorts::SmtSort;
use unroll_smt::terms::SmtTerm;

use crate::config::FixedPointCheck;
use crate::error::EngineError;
use crate::reach::ReachAccumulator;
use crate::state::StateArena;

#[derive(Debug, Clone)]
pub enum SafetyVerdict {
    /// A bad state is reachable; the model covers every variable of steps `0..=k`.
    Unsafe(Model),
    Safe,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixedPointVerdict {
    Converged,
    Growing,
    Unknown(String),
}

/// Assert `assertions` in a fresh scope and check them, optionally with a
/// model over `model_vars`.
pub(crate) fn scoped_check<S: SmtSolver>(
    solver: &mut S,
    assertions: &[SmtTerm],
    model_vars: Option<&[(String, SmtSort)]>,
    step: usize,
    formula_size: usize,
) -> Result<(SatResult, Option<Model>), EngineError> {
    let err = |e: S::Error| EngineError::solver(step, formula_size, e);
    let mut scope = SolverScope::enter(solver).map_err(err)?;
    for assertion in assertions {
        scope.assert(assertion).map_err(err)?;
    }
    let outcome = match model_vars {
        Some(vars) => {
            let refs: Vec<(&str, &SmtSort)> = vars.iter().map(|(n, s)| (n.as_str(), s)).collect();
            scope.check_sat_with_model(&refs)
        }
        None => scope.check_sat().map(|r| (r, None)),
    }
    .map_err(err)?;
    scope.exit().map_err(err)?;
    Ok(outcome)
}

/// Is `cumulative(k) ∧ bad(k)` satisfiable?
pub fn check_bad<S: SmtSolver>(
    solver: &mut S,
    arena: &StateArena,
    acc: &ReachAccumulator,
    bad: &SmtTerm,
    k: usize,
) -> Result<SafetyVerdict, EngineError> {
    let cumulative = acc.cumulative(k).ok_or(EngineError::NotSeeded)?;
    let size = cumulative.size();
    let vars = arena.model_vars(k);
    let (result, model) = scoped_check(
        solver,
        &[cumulative.clone(), bad.clone()],
        Some(&vars),
        k,
        size,
    )?;
    match result {
        SatResult::Sat => {
            let model = model.ok_or_else(|| {
                EngineError::solver(k, size, "satisfiable query returned no model")
            })?;
            Ok(SafetyVerdict::Unsafe(model))
        }
        SatResult::Unsat => Ok(SafetyVerdict::Safe),
        SatResult::Unknown(reason) => Ok(SafetyVerdict::Unknown(reason)),
    }
}

/// Does the reachable set at step `k` add nothing beyond step `k-1`?
pub fn check_fixed_point<S: SmtSolver>(
    solver: &mut S,
    arena: &StateArena,
    acc: &ReachAccumulator,
    k: usize,
    mode: FixedPointCheck,
) -> Result<FixedPointVerdict, EngineError> {
    if k == 0 || mode == FixedPointCheck::Disabled {
        return Ok(FixedPointVerdict::Growing);
    }
    let query = match mode {
        FixedPointCheck::LoopFree => loop_free_query(arena, acc, k)?,
        FixedPointCheck::Implication => implication_query(arena, acc, k)?,
        FixedPointCheck::Disabled => return Ok(FixedPointVerdict::Growing),
    };
    let size = query.iter().map(SmtTerm::size).sum();
    let (result, _) = scoped_check(solver, &query, None, k, size)?;
    Ok(match result {
        SatResult::Unsat => FixedPointVerdict::Converged,
        SatResult::Sat => FixedPointVerdict::Growing,
        SatResult::Unknown(reason) => FixedPointVerdict::Unknown(reason),
    })
}

/// Some path of length `k` whose states are pairwise distinct.
fn loop_free_query(
    arena: &StateArena,
    acc: &ReachAccumulator,
    k: usize,
) -> Result<Vec<SmtTerm>, EngineError> {
    let paths = acc.frontier_disjunction(k).ok_or(EngineError::NotSeeded)?;
    let vectors: Vec<Vec<SmtTerm>> = (0..=k).map(|i| arena.state_vector(i)).collect();
    let mut query = vec![paths];
    for (i, earlier) in vectors.iter().enumerate() {
        for later in &vectors[i + 1..] {
            let differs = earlier
                .iter()
                .zip(later)
                .map(|(a, b)| a.clone().neq(b.clone()))
                .collect();
            query.push(SmtTerm::or(differs));
        }
    }
    Ok(query)
}

/// Negation of `cumulative(k) ⇒ cumulative(k-1)[vars_{k-1} -> vars_k]`.
fn implication_query(
    arena: &StateArena,
    acc: &ReachAccumulator,
    k: usize,
) -> Result<Vec<SmtTerm>, EngineError> {
    let current = acc.cumulative(k).ok_or(EngineError::NotSeeded)?;
    let previous = acc.cumulative(k - 1).ok_or(EngineError::NotSeeded)?;
    let previous = previous.rename(&arena.rename_map(k - 1, k));
    Ok(vec![current.clone(), previous.not()])
}

/// Is there a state reached at step `k` in which no guard holds?
pub fn check_deadlock<S: SmtSolver>(
    solver: &mut S,
    acc: &ReachAccumulator,
    guards: &[SmtTerm],
    k: usize,
) -> Result<SatResult, EngineError> {
    let paths = acc.frontier_disjunction(k).ok_or(EngineError::NotSeeded)?;
    let stuck = SmtTerm::or(guards.to_vec()).not();
    let size = paths.size() + stuck.size();
    let (result, _) = scoped_check(solver, &[paths, stuck], None, k, size)?;
    Ok(result)
}

/// Is the branch `path ∧ transition` feasible?
pub fn check_branch<S: SmtSolver>(
    solver: &mut S,
    path: &SmtTerm,
    transition: &SmtTerm,
    k: usize,
) -> Result<SatResult, EngineError> {
    let size = path.size() + transition.size();
    let (result, _) = scoped_check(solver, &[path.clone(), transition.clone()], None, k, size)?;
    Ok(result)
}
