//! SMT term language and solver integration for unrolling-based model
//! checking.
//!
//! Terms are built solver-agnostically as [`terms::SmtTerm`] over the sorts
//! in [`sorts::SmtSort`] (booleans, integers, fixed-width bit-vectors and
//! finite enumerations) and discharged through the [`solver::SmtSolver`]
//! trait, with an in-process Z3 backend and a cvc5 subprocess backend.

pub mod backends;
pub mod solver;
pub mod sorts;
pub mod terms;
