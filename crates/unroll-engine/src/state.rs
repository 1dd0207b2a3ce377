//! Per-step symbolic state.
//!
//! Every modeled variable `v` gets one solver constant per unrolled step,
//! named `v_{step}`. The [`StateArena`] owns those names, declares them with
//! the solver on first use and maps each name back to its variable and step.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use unroll_smt::solver::SmtSolver;
use unroll_smt::sorts::SmtSort;
use unroll_smt::terms::SmtTerm;

use crate::error::EngineError;

/// Whether a variable is part of the state vector or an environment input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarRole {
    State,
    /// Unconstrained per-step signal; excluded from state identity.
    Input,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarSpec {
    pub name: String,
    pub sort: SmtSort,
    pub role: VarRole,
}

/// Ordered set of the variables a system tracks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateLayout {
    vars: IndexMap<String, VarSpec>,
}

impl StateLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(self, name: impl Into<String>, sort: SmtSort) -> Result<Self, EngineError> {
        self.with(name.into(), sort, VarRole::State)
    }

    pub fn input(self, name: impl Into<String>, sort: SmtSort) -> Result<Self, EngineError> {
        self.with(name.into(), sort, VarRole::Input)
    }

    fn with(mut self, name: String, sort: SmtSort, role: VarRole) -> Result<Self, EngineError> {
        if name.is_empty() {
            return Err(EngineError::InvalidConfig("variable name must not be empty".into()));
        }
        if self.vars.contains_key(&name) {
            return Err(EngineError::InvalidConfig(format!(
                "variable `{name}` declared twice"
            )));
        }
        self.vars.insert(name.clone(), VarSpec { name, sort, role });
        Ok(self)
    }

    pub fn vars(&self) -> impl Iterator<Item = &VarSpec> {
        self.vars.values()
    }

    pub fn state_vars(&self) -> impl Iterator<Item = &VarSpec> {
        self.vars.values().filter(|v| v.role == VarRole::State)
    }

    pub fn get(&self, name: &str) -> Option<&VarSpec> {
        self.vars.get(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

pub fn step_name(var: &str, step: usize) -> String {
    format!("{var}_{step}")
}

/// Handle for building terms over the variables of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepVars {
    step: usize,
}

impl StepVars {
    pub fn new(step: usize) -> Self {
        Self { step }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Term for `var` at this step. Unknown names are caught by validation.
    pub fn var(&self, var: &str) -> SmtTerm {
        SmtTerm::var(step_name(var, self.step))
    }

    pub fn next(&self) -> StepVars {
        StepVars::new(self.step + 1)
    }
}

/// Arena of per-step variables, allocated lazily and declared once.
#[derive(Debug, Clone)]
pub struct StateArena {
    layout: StateLayout,
    allocated: usize,
    index: HashMap<String, (usize, usize)>,
}

impl StateArena {
    pub fn new(layout: StateLayout) -> Self {
        Self {
            layout,
            allocated: 0,
            index: HashMap::new(),
        }
    }

    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    /// Number of steps allocated so far; steps `0..allocated_steps()` exist.
    pub fn allocated_steps(&self) -> usize {
        self.allocated
    }

    pub fn is_allocated(&self, step: usize) -> bool {
        step < self.allocated
    }

    /// Declare the variables of `step`, and of any lower step still missing.
    /// Already allocated steps are left untouched.
    pub fn allocate_step<S: SmtSolver>(&mut self, solver: &mut S, step: usize) -> Result<(), S::Error> {
        while self.allocated <= step {
            let k = self.allocated;
            for (idx, spec) in self.layout.vars.values().enumerate() {
                let name = step_name(&spec.name, k);
                solver.declare_var(&name, &spec.sort)?;
                self.index.insert(name, (idx, k));
            }
            self.allocated += 1;
        }
        Ok(())
    }

    pub fn at(&self, step: usize) -> StepVars {
        StepVars::new(step)
    }

    /// Variable and step a declared name belongs to.
    pub fn lookup(&self, name: &str) -> Option<(&VarSpec, usize)> {
        let &(idx, step) = self.index.get(name)?;
        let (_, spec) = self.layout.vars.get_index(idx)?;
        Some((spec, step))
    }

    /// State-role terms of `step`, in layout order.
    pub fn state_vector(&self, step: usize) -> Vec<SmtTerm> {
        let at = self.at(step);
        self.layout.state_vars().map(|v| at.var(&v.name)).collect()
    }

    /// Substitution moving every variable from step `from` to step `to`.
    pub fn rename_map(&self, from: usize, to: usize) -> HashMap<String, String> {
        self.layout
            .vars()
            .map(|v| (step_name(&v.name, from), step_name(&v.name, to)))
            .collect()
    }

    /// Names and sorts of all variables of steps `0..=upto`, step-major.
    pub fn model_vars(&self, upto: usize) -> Vec<(String, SmtSort)> {
        (0..=upto)
            .flat_map(|k| {
                self.layout
                    .vars()
                    .map(move |v| (step_name(&v.name, k), v.sort.clone()))
            })
            .collect()
    }
}
