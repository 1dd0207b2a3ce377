use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use unroll_smt::solver::{Model, ModelValue, SatResult, SmtSolver};
use unroll_smt::terms::SmtTerm;

use crate::check::scoped_check;
use crate::error::EngineError;
use crate::state::{step_name, StateArena};
use crate::system::{transition_relation, TransitionSystem};

/// Concrete assignment of every tracked variable at one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceState {
    pub step: usize,
    pub values: IndexMap<String, ModelValue>,
}

/// A path from an initial state to a bad state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trace {
    pub system: String,
    pub states: Vec<TraceState>,
}

impl Trace {
    /// Number of transitions taken.
    pub fn len(&self) -> usize {
        self.states.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn last(&self) -> Option<&TraceState> {
        self.states.last()
    }

    pub fn value(&self, step: usize, var: &str) -> Option<&ModelValue> {
        self.states.get(step)?.values.get(var)
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Counterexample for {} ({} steps):", self.system, self.len())?;
        for state in &self.states {
            let assignments: Vec<String> = state
                .values
                .iter()
                .map(|(var, value)| format!("{var}={value}"))
                .collect();
            writeln!(f, "  step {}: {}", state.step, assignments.join(", "))?;
        }
        Ok(())
    }
}

/// Read the values of every tracked variable at steps `0..=upto` out of a
/// model obtained with completion.
pub fn extract_trace(
    system: &str,
    arena: &StateArena,
    model: &Model,
    upto: usize,
) -> Result<Trace, EngineError> {
    let mut states = Vec::with_capacity(upto + 1);
    for step in 0..=upto {
        let mut values = IndexMap::new();
        for spec in arena.layout().vars() {
            let value = model
                .get(&step_name(&spec.name, step))
                .cloned()
                .ok_or_else(|| EngineError::IncompleteModel {
                    step,
                    var: spec.name.clone(),
                })?;
            values.insert(spec.name.clone(), value);
        }
        states.push(TraceState { step, values });
    }
    Ok(Trace {
        system: system.to_string(),
        states,
    })
}

/// Confirm that `trace` is a real execution of `system` ending in a bad
/// state: `init`, the transition relation of every step, `bad` at the last
/// step and the recorded values are asserted together.
///
/// Resets the solver.
pub fn replay_trace<S: SmtSolver, T: TransitionSystem + ?Sized>(
    solver: &mut S,
    system: &T,
    trace: &Trace,
) -> Result<SatResult, EngineError> {
    let Some(last) = trace.last().map(|s| s.step) else {
        return Err(EngineError::IncompleteModel {
            step: 0,
            var: "<empty trace>".into(),
        });
    };
    solver.reset().map_err(|e| EngineError::solver(last, 0, e))?;
    let mut arena = StateArena::new(system.layout()?);
    arena
        .allocate_step(solver, last)
        .map_err(|e| EngineError::solver(last, 0, e))?;

    let mut assertions = vec![system.init(arena.at(0))];
    for k in 0..last {
        let ts = system.transitions(arena.at(k), arena.at(k + 1));
        assertions.push(transition_relation(&ts));
    }
    assertions.push(system.bad(arena.at(last)));
    for state in &trace.states {
        let at = arena.at(state.step);
        for (var, value) in &state.values {
            assertions.push(at.var(var).eq(value.to_term()));
        }
    }
    let size = assertions.iter().map(SmtTerm::size).sum();
    let (result, _) = scoped_check(solver, &assertions, None, last, size)?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::RecordingSolver;
    use crate::state::StateLayout;
    use std::collections::HashMap;
    use unroll_smt::sorts::SmtSort;

    fn arena() -> StateArena {
        let layout = StateLayout::new()
            .state("x", SmtSort::Int)
            .and_then(|l| l.input("press", SmtSort::Bool))
            .unwrap();
        let mut arena = StateArena::new(layout);
        arena
            .allocate_step(&mut RecordingSolver::default(), 1)
            .unwrap();
        arena
    }

    fn model(pairs: &[(&str, ModelValue)]) -> Model {
        Model {
            values: pairs
                .iter()
                .map(|(n, v)| (n.to_string(), v.clone()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn extract_trace_orders_steps_and_layout() {
        let model = model(&[
            ("x_0", ModelValue::Int(0)),
            ("press_0", ModelValue::Bool(true)),
            ("x_1", ModelValue::Int(1)),
            ("press_1", ModelValue::Bool(false)),
        ]);
        let trace = extract_trace("toy", &arena(), &model, 1).unwrap();
        assert_eq!(trace.len(), 1);
        assert_eq!(trace.value(1, "x"), Some(&ModelValue::Int(1)));
        let keys: Vec<&String> = trace.states[0].values.keys().collect();
        assert_eq!(keys, vec!["x", "press"]);
        assert_eq!(
            trace.to_string(),
            "Counterexample for toy (1 steps):\n  step 0: x=0, press=true\n  step 1: x=1, press=false\n"
        );
    }

    #[test]
    fn missing_value_is_incomplete_model() {
        let model = model(&[("x_0", ModelValue::Int(0)), ("press_0", ModelValue::Bool(true))]);
        let err = extract_trace("toy", &arena(), &model, 1).unwrap_err();
        match err {
            EngineError::IncompleteModel { step, var } => {
                assert_eq!(step, 1);
                assert_eq!(var, "x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
