use criterion::{black_box, criterion_group, criterion_main, Criterion};
use unroll_engine::systems::{CounterParams, CounterSystem, Divisor, GcdParams, GcdSystem};
use unroll_engine::unrolled::{check_unrolled, Stability};
use unroll_engine::{run_bmc, BmcConfig, BranchingMode, NumericMode};
use unroll_smt::backends::z3_backend::{Config, Context, Z3Solver};

fn counter(threshold: u64, numeric: NumericMode) -> CounterSystem {
    CounterSystem::new(CounterParams {
        threshold,
        numeric,
        ..CounterParams::default()
    })
    .unwrap()
}

fn gcd(divisor: Divisor) -> GcdSystem {
    GcdSystem::new(GcdParams {
        divisor,
        ..GcdParams::default()
    })
    .unwrap()
}

// ---------------------------------------------------------------------------
// Incremental runs
// ---------------------------------------------------------------------------

fn bench_counter_unsafe_bv64(c: &mut Criterion) {
    let system = counter(10, NumericMode::default());
    let config = BmcConfig::with_bound(12);
    c.bench_function("bmc_counter_unsafe_bv64", |b| {
        b.iter(|| {
            let ctx = Context::new(&Config::new());
            let mut solver = Z3Solver::new(&ctx);
            run_bmc(&mut solver, black_box(&system), black_box(&config)).unwrap()
        })
    });
}

fn bench_counter_fixed_point_int(c: &mut Criterion) {
    let system = counter(11, NumericMode::Integer);
    let config = BmcConfig::with_bound(13);
    c.bench_function("bmc_counter_fixed_point_int", |b| {
        b.iter(|| {
            let ctx = Context::new(&Config::new());
            let mut solver = Z3Solver::new(&ctx);
            run_bmc(&mut solver, black_box(&system), black_box(&config)).unwrap()
        })
    });
}

fn bench_gcd_branching_modes(c: &mut Criterion) {
    let system = gcd(Divisor::Fixed(6));
    for (name, branching) in [
        ("bmc_gcd_disjunction", BranchingMode::Disjunction),
        ("bmc_gcd_enabled_only", BranchingMode::EnabledOnly),
    ] {
        let config = BmcConfig {
            branching,
            ..BmcConfig::with_bound(10)
        };
        c.bench_function(name, |b| {
            b.iter(|| {
                let ctx = Context::new(&Config::new());
                let mut solver = Z3Solver::new(&ctx);
                run_bmc(&mut solver, black_box(&system), black_box(&config)).unwrap()
            })
        });
    }
}

// ---------------------------------------------------------------------------
// Monolithic depth query
// ---------------------------------------------------------------------------

fn bench_gcd_unrolled_depth3(c: &mut Criterion) {
    let system = gcd(Divisor::Fixed(2));
    c.bench_function("unrolled_gcd_depth3", |b| {
        b.iter(|| {
            let ctx = Context::new(&Config::new());
            let mut solver = Z3Solver::new(&ctx);
            check_unrolled(&mut solver, black_box(&system), 3, Stability::Plain).unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_counter_unsafe_bv64,
    bench_counter_fixed_point_int,
    bench_gcd_branching_modes,
    bench_gcd_unrolled_depth3
);
criterion_main!(benches);
