use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

/// Result of a satisfiability check.
#[derive(Debug, Clone, PartialEq)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown(String),
}

/// A model (variable assignments) extracted from a SAT result.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub values: HashMap<String, ModelValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ModelValue {
    Int(i64),
    Bool(bool),
    BitVec { value: u64, width: u32 },
    Enum { sort: String, variant: String },
}

impl ModelValue {
    /// Literal term denoting this value.
    pub fn to_term(&self) -> SmtTerm {
        match self {
            ModelValue::Int(n) => SmtTerm::int(*n),
            ModelValue::Bool(b) => SmtTerm::bool(*b),
            ModelValue::BitVec { value, width } => SmtTerm::bv(*value, *width),
            ModelValue::Enum { sort, variant } => SmtTerm::enum_lit(sort.clone(), variant.clone()),
        }
    }
}

impl fmt::Display for ModelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelValue::Int(n) => write!(f, "{n}"),
            ModelValue::Bool(b) => write!(f, "{b}"),
            ModelValue::BitVec { value, .. } => write!(f, "{value}"),
            ModelValue::Enum { variant, .. } => write!(f, "{variant}"),
        }
    }
}

impl Model {
    pub fn get(&self, name: &str) -> Option<&ModelValue> {
        self.values.get(name)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ModelValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(ModelValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn get_bv(&self, name: &str) -> Option<u64> {
        match self.values.get(name) {
            Some(ModelValue::BitVec { value, .. }) => Some(*value),
            _ => None,
        }
    }

    pub fn get_enum(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ModelValue::Enum { variant, .. }) => Some(variant.as_str()),
            _ => None,
        }
    }

    /// Numeric value of an `Int` or `BitVec` assignment.
    pub fn get_numeric(&self, name: &str) -> Option<i128> {
        match self.values.get(name) {
            Some(ModelValue::Int(n)) => Some(i128::from(*n)),
            Some(ModelValue::BitVec { value, .. }) => Some(i128::from(*value)),
            _ => None,
        }
    }
}

/// Abstract SMT solver interface.
pub trait SmtSolver {
    type Error: std::error::Error;

    /// Declare a new variable.
    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Self::Error>;

    /// Assert a constraint.
    fn assert(&mut self, term: &SmtTerm) -> Result<(), Self::Error>;

    /// Push a new scope.
    fn push(&mut self) -> Result<(), Self::Error>;

    /// Pop a scope.
    fn pop(&mut self) -> Result<(), Self::Error>;

    /// Check satisfiability.
    fn check_sat(&mut self) -> Result<SatResult, Self::Error>;

    /// Check satisfiability and extract a model if SAT.
    ///
    /// Backends evaluate with model completion, so every requested variable
    /// receives a value even when the assertions leave it unconstrained.
    fn check_sat_with_model(
        &mut self,
        var_names: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), Self::Error>;

    /// Reset the solver state.
    fn reset(&mut self) -> Result<(), Self::Error>;
}

/// A push/pop bracket over a solver.
///
/// Opening the scope pushes; [`SolverScope::exit`] pops and reports pop
/// failures. A scope dropped without `exit` (early return, `?`) still pops,
/// discarding the pop error, so assertions made through the scope never leak
/// into the next query.
pub struct SolverScope<'a, S: SmtSolver> {
    solver: &'a mut S,
    open: bool,
}

impl<'a, S: SmtSolver> SolverScope<'a, S> {
    pub fn enter(solver: &'a mut S) -> Result<Self, S::Error> {
        solver.push()?;
        Ok(Self { solver, open: true })
    }

    pub fn assert(&mut self, term: &SmtTerm) -> Result<(), S::Error> {
        self.solver.assert(term)
    }

    pub fn check_sat(&mut self) -> Result<SatResult, S::Error> {
        self.solver.check_sat()
    }

    pub fn check_sat_with_model(
        &mut self,
        var_names: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), S::Error> {
        self.solver.check_sat_with_model(var_names)
    }

    /// Close the scope, restoring the assertion stack.
    pub fn exit(mut self) -> Result<(), S::Error> {
        self.open = false;
        self.solver.pop()
    }
}

impl<S: SmtSolver> Drop for SolverScope<'_, S> {
    fn drop(&mut self) {
        if self.open {
            let _ = self.solver.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct MockSolver {
        sat_result: SatResult,
        depth: usize,
        check_sat_calls: usize,
        reset_calls: usize,
    }

    impl MockSolver {
        fn new(sat_result: SatResult) -> Self {
            Self {
                sat_result,
                depth: 0,
                check_sat_calls: 0,
                reset_calls: 0,
            }
        }
    }

    impl SmtSolver for MockSolver {
        type Error = io::Error;

        fn declare_var(&mut self, _name: &str, _sort: &SmtSort) -> Result<(), Self::Error> {
            Ok(())
        }

        fn assert(&mut self, _term: &SmtTerm) -> Result<(), Self::Error> {
            Ok(())
        }

        fn push(&mut self) -> Result<(), Self::Error> {
            self.depth += 1;
            Ok(())
        }

        fn pop(&mut self) -> Result<(), Self::Error> {
            if self.depth == 0 {
                return Err(io::Error::other("pop on empty stack"));
            }
            self.depth -= 1;
            Ok(())
        }

        fn check_sat(&mut self) -> Result<SatResult, Self::Error> {
            self.check_sat_calls += 1;
            Ok(self.sat_result.clone())
        }

        fn check_sat_with_model(
            &mut self,
            _var_names: &[(&str, &SmtSort)],
        ) -> Result<(SatResult, Option<Model>), Self::Error> {
            Ok((self.sat_result.clone(), None))
        }

        fn reset(&mut self) -> Result<(), Self::Error> {
            self.reset_calls += 1;
            self.depth = 0;
            Ok(())
        }
    }

    #[test]
    fn model_getters_return_typed_values_only() {
        let mut values = HashMap::new();
        values.insert("x".to_string(), ModelValue::Int(42));
        values.insert("flag".to_string(), ModelValue::Bool(true));
        values.insert("b".to_string(), ModelValue::BitVec { value: 7, width: 8 });
        values.insert(
            "q".to_string(),
            ModelValue::Enum {
                sort: "Mode".into(),
                variant: "on".into(),
            },
        );
        let model = Model { values };

        assert_eq!(model.get_int("x"), Some(42));
        assert_eq!(model.get_bool("flag"), Some(true));
        assert_eq!(model.get_bv("b"), Some(7));
        assert_eq!(model.get_enum("q"), Some("on"));
        assert_eq!(model.get_int("flag"), None);
        assert_eq!(model.get_bool("x"), None);
        assert_eq!(model.get_numeric("b"), Some(7));
        assert_eq!(model.get_numeric("q"), None);
        assert_eq!(model.get_int("missing"), None);
    }

    #[test]
    fn model_value_literal_round_trips_through_term() {
        let value = ModelValue::BitVec {
            value: 300,
            width: 16,
        };
        assert_eq!(value.to_term(), SmtTerm::bv(300, 16));
        assert_eq!(value.to_string(), "300");
    }

    #[test]
    fn scope_exit_pops_once() {
        let mut solver = MockSolver::new(SatResult::Unsat);
        let mut scope = SolverScope::enter(&mut solver).expect("push should succeed");
        assert_eq!(scope.check_sat().expect("check"), SatResult::Unsat);
        scope.exit().expect("pop should succeed");
        assert_eq!(solver.depth, 0);
        assert_eq!(solver.check_sat_calls, 1);
    }

    #[test]
    fn scope_dropped_early_still_pops() {
        fn bail(solver: &mut MockSolver) -> Result<(), io::Error> {
            let mut scope = SolverScope::enter(solver)?;
            scope.assert(&SmtTerm::bool(true))?;
            Err(io::Error::other("early exit"))
        }

        let mut solver = MockSolver::new(SatResult::Sat);
        assert!(bail(&mut solver).is_err());
        assert_eq!(solver.depth, 0, "drop must restore the assertion stack");
    }

    #[test]
    fn reset_is_callable() {
        let mut solver = MockSolver::new(SatResult::Unknown("timeout".to_string()));
        solver.push().expect("push");
        solver.reset().expect("reset should succeed");
        assert_eq!(solver.reset_calls, 1);
        assert_eq!(solver.depth, 0);
    }
}
