//! Monolithic depth queries: is a bad state reachable in exactly `k` steps?

use serde::{Deserialize, Serialize};
use tracing::info;
use unroll_smt::solver::{SatResult, SmtSolver};
use unroll_smt::terms::SmtTerm;

use crate::check::scoped_check;
use crate::counterexample::{extract_trace, Trace};
use crate::error::EngineError;
use crate::state::StateArena;
use crate::system::{transition_relation, validate_predicate, validate_transitions, TransitionSystem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stability {
    #[default]
    Plain,
    /// The bad state must also be a stutter state: one more transition
    /// leaves the state vector unchanged.
    Stable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnrolledOutcome {
    Violation { trace: Trace },
    NoViolation,
    Unknown(String),
}

/// Assert `init`, `depth` copies of the transition relation and `bad(depth)`
/// as one conjunction and check it. Resets the solver.
pub fn check_unrolled<S: SmtSolver, T: TransitionSystem + ?Sized>(
    solver: &mut S,
    system: &T,
    depth: usize,
    stability: Stability,
) -> Result<UnrolledOutcome, EngineError> {
    let last = match stability {
        Stability::Plain => depth,
        Stability::Stable => depth + 1,
    };
    solver.reset().map_err(|e| EngineError::solver(depth, 0, e))?;
    let mut arena = StateArena::new(system.layout()?);
    arena
        .allocate_step(&mut *solver, last)
        .map_err(|e| EngineError::solver(depth, 0, e))?;

    let init = system.init(arena.at(0));
    validate_predicate(&arena, 0, "init", &init)?;
    let mut conjuncts = vec![init];
    for k in 0..last {
        let ts = system.transitions(arena.at(k), arena.at(k + 1));
        validate_transitions(&arena, k, &ts)?;
        conjuncts.push(transition_relation(&ts));
    }
    let bad = system.bad(arena.at(depth));
    validate_predicate(&arena, depth, "bad", &bad)?;
    conjuncts.push(bad);
    if stability == Stability::Stable {
        let now = arena.state_vector(depth);
        let after = arena.state_vector(depth + 1);
        conjuncts.extend(now.into_iter().zip(after).map(|(a, b)| a.eq(b)));
    }

    let formula = SmtTerm::and(conjuncts);
    let size = formula.size();
    info!(depth, formula_size = size, ?stability, "BMC: one-shot depth query");
    let vars = arena.model_vars(last);
    let (result, model) = scoped_check(solver, &[formula], Some(&vars), depth, size)?;
    match result {
        SatResult::Sat => {
            let model = model
                .ok_or_else(|| EngineError::solver(depth, size, "satisfiable query returned no model"))?;
            let trace = extract_trace(system.name(), &arena, &model, depth)?;
            Ok(UnrolledOutcome::Violation { trace })
        }
        SatResult::Unsat => Ok(UnrolledOutcome::NoViolation),
        SatResult::Unknown(reason) => Ok(UnrolledOutcome::Unknown(reason)),
    }
}
