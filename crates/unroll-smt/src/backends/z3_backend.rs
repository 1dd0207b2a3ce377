use std::collections::HashMap;

use thiserror::Error;
use z3::ast::{Ast, Bool, Datatype, Int, BV};
use z3::{FuncDecl, Params, SatResult as Z3SatResult, Sort, Symbol};

pub use z3::{Config, Context};

use crate::solver::{Model, ModelValue, SatResult, SmtSolver};
use crate::sorts::{EnumSort, SmtSort};
use crate::terms::SmtTerm;

#[derive(Debug, Error)]
pub enum Z3Error {
    #[error("Z3 error: {0}")]
    Internal(String),
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),
    #[error("Unknown enum sort or variant: {0}")]
    UnknownEnum(String),
    #[error("Sort mismatch: {0}")]
    SortMismatch(String),
}

/// An enumerated sort registered with the context. Z3 sorts outlive
/// `reset()`, so the registry is kept across resets.
struct Z3Enum<'ctx> {
    sort: Sort<'ctx>,
    spec: EnumSort,
    consts: Vec<FuncDecl<'ctx>>,
}

pub struct Z3Solver<'ctx> {
    ctx: &'ctx Context,
    solver: z3::Solver<'ctx>,
    vars: HashMap<String, Z3Term<'ctx>>,
    enums: HashMap<String, Z3Enum<'ctx>>,
    params: Option<Params<'ctx>>,
}

impl<'ctx> Z3Solver<'ctx> {
    pub fn new(ctx: &'ctx Context) -> Self {
        Self {
            ctx,
            solver: z3::Solver::new(ctx),
            vars: HashMap::new(),
            enums: HashMap::new(),
            params: None,
        }
    }

    /// Solver whose every query gives up after `timeout_secs`, answering
    /// unknown. Zero disables the limit.
    pub fn with_timeout_secs(ctx: &'ctx Context, timeout_secs: u64) -> Self {
        let mut solver = Self::new(ctx);
        if timeout_secs == 0 {
            return solver;
        }
        let mut params = Params::new(ctx);
        let timeout_ms = timeout_secs.saturating_mul(1000).min(u64::from(u32::MAX));
        params.set_u32("timeout", timeout_ms as u32);
        solver.solver.set_params(&params);
        solver.params = Some(params);
        solver
    }

    fn register_enum(&mut self, spec: &EnumSort) -> Result<(), Z3Error> {
        if let Some(existing) = self.enums.get(&spec.name) {
            if existing.spec != *spec {
                return Err(Z3Error::SortMismatch(format!(
                    "enum sort {} redeclared with different variants",
                    spec.name
                )));
            }
            return Ok(());
        }
        let names: Vec<Symbol> = spec
            .variants
            .iter()
            .map(|v| Symbol::String(v.clone()))
            .collect();
        let (sort, consts, _testers) =
            Sort::enumeration(self.ctx, Symbol::String(spec.name.clone()), &names);
        self.enums.insert(
            spec.name.clone(),
            Z3Enum {
                sort,
                spec: spec.clone(),
                consts,
            },
        );
        Ok(())
    }

    fn enum_const(&self, sort: &str, variant: &str) -> Result<Datatype<'ctx>, Z3Error> {
        let entry = self
            .enums
            .get(sort)
            .ok_or_else(|| Z3Error::UnknownEnum(sort.to_string()))?;
        let idx = entry
            .spec
            .index_of(variant)
            .ok_or_else(|| Z3Error::UnknownEnum(format!("{sort}::{variant}")))?;
        entry.consts[idx]
            .apply(&[])
            .as_datatype()
            .ok_or_else(|| Z3Error::Internal(format!("{sort}::{variant} is not a datatype")))
    }

    fn translate_term(&self, term: &SmtTerm) -> Result<Z3Term<'ctx>, Z3Error> {
        let ctx = self.ctx;
        match term {
            SmtTerm::Var(name) => self
                .vars
                .get(name)
                .cloned()
                .ok_or_else(|| Z3Error::UnknownVariable(name.clone())),
            SmtTerm::IntLit(n) => Ok(Z3Term::Int(Int::from_i64(ctx, *n))),
            SmtTerm::BvLit { value, width } => Ok(Z3Term::Bv(BV::from_u64(ctx, *value, *width))),
            SmtTerm::BoolLit(b) => Ok(Z3Term::Bool(Bool::from_bool(ctx, *b))),
            SmtTerm::EnumLit { sort, variant } => Ok(Z3Term::Enum(self.enum_const(sort, variant)?)),
            SmtTerm::Add(lhs, rhs) => match self.translate_pair(lhs, rhs)? {
                (Z3Term::Int(l), Z3Term::Int(r)) => Ok(Z3Term::Int(Int::add(ctx, &[&l, &r]))),
                (Z3Term::Bv(l), Z3Term::Bv(r)) => Ok(Z3Term::Bv(l.bvadd(&r))),
                _ => Err(Z3Error::SortMismatch("Add".into())),
            },
            SmtTerm::Sub(lhs, rhs) => match self.translate_pair(lhs, rhs)? {
                (Z3Term::Int(l), Z3Term::Int(r)) => Ok(Z3Term::Int(Int::sub(ctx, &[&l, &r]))),
                (Z3Term::Bv(l), Z3Term::Bv(r)) => Ok(Z3Term::Bv(l.bvsub(&r))),
                _ => Err(Z3Error::SortMismatch("Sub".into())),
            },
            SmtTerm::Mul(lhs, rhs) => match self.translate_pair(lhs, rhs)? {
                (Z3Term::Int(l), Z3Term::Int(r)) => Ok(Z3Term::Int(Int::mul(ctx, &[&l, &r]))),
                (Z3Term::Bv(l), Z3Term::Bv(r)) => Ok(Z3Term::Bv(l.bvmul(&r))),
                _ => Err(Z3Error::SortMismatch("Mul".into())),
            },
            SmtTerm::Mod(lhs, rhs) => match self.translate_pair(lhs, rhs)? {
                (Z3Term::Int(l), Z3Term::Int(r)) => Ok(Z3Term::Int(l.modulo(&r))),
                (Z3Term::Bv(l), Z3Term::Bv(r)) => Ok(Z3Term::Bv(l.bvurem(&r))),
                _ => Err(Z3Error::SortMismatch("Mod".into())),
            },
            SmtTerm::Eq(lhs, rhs) => {
                let (l, r) = self.translate_pair(lhs, rhs)?;
                Ok(Z3Term::Bool(l.eq(&r)?))
            }
            SmtTerm::Lt(lhs, rhs) => match self.translate_pair(lhs, rhs)? {
                (Z3Term::Int(l), Z3Term::Int(r)) => Ok(Z3Term::Bool(l.lt(&r))),
                (Z3Term::Bv(l), Z3Term::Bv(r)) => Ok(Z3Term::Bool(l.bvult(&r))),
                _ => Err(Z3Error::SortMismatch("Lt".into())),
            },
            SmtTerm::Le(lhs, rhs) => match self.translate_pair(lhs, rhs)? {
                (Z3Term::Int(l), Z3Term::Int(r)) => Ok(Z3Term::Bool(l.le(&r))),
                (Z3Term::Bv(l), Z3Term::Bv(r)) => Ok(Z3Term::Bool(l.bvule(&r))),
                _ => Err(Z3Error::SortMismatch("Le".into())),
            },
            SmtTerm::Gt(lhs, rhs) => match self.translate_pair(lhs, rhs)? {
                (Z3Term::Int(l), Z3Term::Int(r)) => Ok(Z3Term::Bool(l.gt(&r))),
                (Z3Term::Bv(l), Z3Term::Bv(r)) => Ok(Z3Term::Bool(l.bvugt(&r))),
                _ => Err(Z3Error::SortMismatch("Gt".into())),
            },
            SmtTerm::Ge(lhs, rhs) => match self.translate_pair(lhs, rhs)? {
                (Z3Term::Int(l), Z3Term::Int(r)) => Ok(Z3Term::Bool(l.ge(&r))),
                (Z3Term::Bv(l), Z3Term::Bv(r)) => Ok(Z3Term::Bool(l.bvuge(&r))),
                _ => Err(Z3Error::SortMismatch("Ge".into())),
            },
            SmtTerm::Distinct(terms) => {
                let translated = terms
                    .iter()
                    .map(|t| self.translate_term(t))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut pairs = Vec::new();
                for (i, a) in translated.iter().enumerate() {
                    for b in &translated[i + 1..] {
                        pairs.push(a.eq(b)?.not());
                    }
                }
                let refs: Vec<&Bool> = pairs.iter().collect();
                Ok(Z3Term::Bool(Bool::and(ctx, &refs)))
            }
            SmtTerm::And(terms) => {
                let bools = self.translate_bools(terms)?;
                let refs: Vec<&Bool> = bools.iter().collect();
                Ok(Z3Term::Bool(Bool::and(ctx, &refs)))
            }
            SmtTerm::Or(terms) => {
                let bools = self.translate_bools(terms)?;
                let refs: Vec<&Bool> = bools.iter().collect();
                Ok(Z3Term::Bool(Bool::or(ctx, &refs)))
            }
            SmtTerm::Not(inner) => {
                let b = self.translate_term(inner)?.into_bool()?;
                Ok(Z3Term::Bool(b.not()))
            }
            SmtTerm::Implies(lhs, rhs) => {
                let l = self.translate_term(lhs)?.into_bool()?;
                let r = self.translate_term(rhs)?.into_bool()?;
                Ok(Z3Term::Bool(l.implies(&r)))
            }
            SmtTerm::Ite(cond, then, els) => {
                let c = self.translate_term(cond)?.into_bool()?;
                match self.translate_pair(then, els)? {
                    (Z3Term::Int(t), Z3Term::Int(e)) => Ok(Z3Term::Int(c.ite(&t, &e))),
                    (Z3Term::Bool(t), Z3Term::Bool(e)) => Ok(Z3Term::Bool(c.ite(&t, &e))),
                    (Z3Term::Bv(t), Z3Term::Bv(e)) => Ok(Z3Term::Bv(c.ite(&t, &e))),
                    (Z3Term::Enum(t), Z3Term::Enum(e)) => Ok(Z3Term::Enum(c.ite(&t, &e))),
                    _ => Err(Z3Error::SortMismatch("Ite".into())),
                }
            }
        }
    }

    fn translate_pair(
        &self,
        lhs: &SmtTerm,
        rhs: &SmtTerm,
    ) -> Result<(Z3Term<'ctx>, Z3Term<'ctx>), Z3Error> {
        Ok((self.translate_term(lhs)?, self.translate_term(rhs)?))
    }

    fn translate_bools(&self, terms: &[SmtTerm]) -> Result<Vec<Bool<'ctx>>, Z3Error> {
        terms
            .iter()
            .map(|t| self.translate_term(t).and_then(|z| z.into_bool()))
            .collect()
    }

    fn eval_var(&self, model: &z3::Model<'ctx>, name: &str, sort: &SmtSort) -> Option<ModelValue> {
        match (self.vars.get(name)?, sort) {
            (Z3Term::Int(v), SmtSort::Int) => {
                model.eval(v, true).and_then(|val| val.as_i64()).map(ModelValue::Int)
            }
            (Z3Term::Bool(v), SmtSort::Bool) => {
                model.eval(v, true).and_then(|val| val.as_bool()).map(ModelValue::Bool)
            }
            (Z3Term::Bv(v), SmtSort::BitVec(width)) => model
                .eval(v, true)
                .and_then(|val| val.as_u64())
                .map(|value| ModelValue::BitVec {
                    value,
                    width: *width,
                }),
            (Z3Term::Enum(v), SmtSort::Enum(spec)) => {
                let val = model.eval(v, true)?;
                let printed = val.to_string();
                let printed = printed.trim_matches('|');
                spec.index_of(printed).map(|idx| ModelValue::Enum {
                    sort: spec.name.clone(),
                    variant: spec.variants[idx].clone(),
                })
            }
            _ => None,
        }
    }
}

#[derive(Clone)]
enum Z3Term<'ctx> {
    Int(Int<'ctx>),
    Bool(Bool<'ctx>),
    Bv(BV<'ctx>),
    Enum(Datatype<'ctx>),
}

impl<'ctx> Z3Term<'ctx> {
    fn into_bool(self) -> Result<Bool<'ctx>, Z3Error> {
        match self {
            Z3Term::Bool(b) => Ok(b),
            _ => Err(Z3Error::SortMismatch("expected Bool".into())),
        }
    }

    fn eq(&self, other: &Z3Term<'ctx>) -> Result<Bool<'ctx>, Z3Error> {
        match (self, other) {
            (Z3Term::Int(l), Z3Term::Int(r)) => Ok(l._eq(r)),
            (Z3Term::Bool(l), Z3Term::Bool(r)) => Ok(l._eq(r)),
            (Z3Term::Bv(l), Z3Term::Bv(r)) => Ok(l._eq(r)),
            (Z3Term::Enum(l), Z3Term::Enum(r)) => Ok(l._eq(r)),
            _ => Err(Z3Error::SortMismatch("Eq".into())),
        }
    }
}

impl<'ctx> SmtSolver for Z3Solver<'ctx> {
    type Error = Z3Error;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Z3Error> {
        let ctx = self.ctx;
        let term = match sort {
            SmtSort::Int => Z3Term::Int(Int::new_const(ctx, name)),
            SmtSort::Bool => Z3Term::Bool(Bool::new_const(ctx, name)),
            SmtSort::BitVec(width) => Z3Term::Bv(BV::new_const(ctx, name, *width)),
            SmtSort::Enum(spec) => {
                self.register_enum(spec)?;
                let entry = self
                    .enums
                    .get(&spec.name)
                    .ok_or_else(|| Z3Error::UnknownEnum(spec.name.clone()))?;
                Z3Term::Enum(Datatype::new_const(ctx, name, &entry.sort))
            }
        };
        self.vars.insert(name.to_string(), term);
        Ok(())
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), Z3Error> {
        let z3_term = self.translate_term(term)?.into_bool()?;
        self.solver.assert(&z3_term);
        Ok(())
    }

    fn push(&mut self) -> Result<(), Z3Error> {
        self.solver.push();
        Ok(())
    }

    fn pop(&mut self) -> Result<(), Z3Error> {
        self.solver.pop(1);
        Ok(())
    }

    fn check_sat(&mut self) -> Result<SatResult, Z3Error> {
        match self.solver.check() {
            Z3SatResult::Sat => Ok(SatResult::Sat),
            Z3SatResult::Unsat => Ok(SatResult::Unsat),
            Z3SatResult::Unknown => Ok(SatResult::Unknown(self.unknown_reason())),
        }
    }

    fn check_sat_with_model(
        &mut self,
        var_names: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), Z3Error> {
        match self.solver.check() {
            Z3SatResult::Sat => {
                let z3_model = self
                    .solver
                    .get_model()
                    .ok_or_else(|| Z3Error::Internal("SAT but no model available".into()))?;
                let mut values = HashMap::new();
                for &(name, sort) in var_names {
                    if let Some(value) = self.eval_var(&z3_model, name, sort) {
                        values.insert(name.to_string(), value);
                    }
                }
                Ok((SatResult::Sat, Some(Model { values })))
            }
            Z3SatResult::Unsat => Ok((SatResult::Unsat, None)),
            Z3SatResult::Unknown => Ok((SatResult::Unknown(self.unknown_reason()), None)),
        }
    }

    fn reset(&mut self) -> Result<(), Z3Error> {
        self.solver.reset();
        // Z3 may drop per-solver parameters on reset; reapply timeout if configured.
        if let Some(params) = &self.params {
            self.solver.set_params(params);
        }
        self.vars.clear();
        Ok(())
    }
}

impl Z3Solver<'_> {
    fn unknown_reason(&self) -> String {
        self.solver
            .get_reason_unknown()
            .unwrap_or_else(|| "Z3 returned unknown".into())
    }
}
