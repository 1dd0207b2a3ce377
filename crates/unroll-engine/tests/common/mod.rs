#![allow(dead_code)]

use unroll_engine::systems::{CounterParams, CounterSystem, Divisor, GcdParams, GcdSystem};
use unroll_engine::{run_bmc, BmcConfig, BmcOutcome, EngineError, NumericMode, TransitionSystem};
use unroll_smt::backends::z3_backend::{Config, Context, Z3Solver};
use unroll_smt::solver::ModelValue;

/// Run `f` against a fresh Z3 solver.
pub fn with_z3<R>(f: impl FnOnce(&mut Z3Solver<'_>) -> R) -> R {
    let ctx = Context::new(&Config::new());
    let mut solver = Z3Solver::new(&ctx);
    f(&mut solver)
}

pub fn run_z3<T: TransitionSystem + ?Sized>(
    system: &T,
    config: &BmcConfig,
) -> Result<BmcOutcome, EngineError> {
    with_z3(|solver| run_bmc(solver, system, config))
}

pub fn counter(threshold: u64, numeric: NumericMode) -> CounterSystem {
    CounterSystem::new(CounterParams {
        threshold,
        numeric,
        ..CounterParams::default()
    })
    .expect("valid counter parameters")
}

pub fn small_counter(threshold: u64) -> CounterSystem {
    CounterSystem::new(CounterParams {
        cap: 3,
        threshold,
        numeric: NumericMode::Integer,
    })
    .expect("valid counter parameters")
}

pub fn gcd(divisor: Divisor, numeric: NumericMode) -> GcdSystem {
    GcdSystem::new(GcdParams {
        x0: Some(12),
        y0: Some(18),
        divisor,
        numeric,
    })
    .expect("valid gcd parameters")
}

/// Integer view of an `Int` or `BitVec` value.
pub fn numeric(value: Option<&ModelValue>) -> i128 {
    match value {
        Some(ModelValue::Int(n)) => i128::from(*n),
        Some(ModelValue::BitVec { value, .. }) => i128::from(*value),
        other => panic!("expected a numeric value, got {other:?}"),
    }
}

pub fn variant(value: Option<&ModelValue>) -> &str {
    match value {
        Some(ModelValue::Enum { variant, .. }) => variant,
        other => panic!("expected an enum value, got {other:?}"),
    }
}
