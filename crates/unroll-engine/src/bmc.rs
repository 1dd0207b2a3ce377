use std::fmt;
use std::time::Instant;

use tracing::{debug, info, warn};
use unroll_smt::solver::{SatResult, SmtSolver};
use unroll_smt::terms::SmtTerm;

use crate::check::{self, FixedPointVerdict, SafetyVerdict};
use crate::config::{BmcConfig, BranchingMode};
use crate::counterexample::{extract_trace, Trace};
use crate::error::EngineError;
use crate::reach::{Phase, ReachAccumulator, Termination};
use crate::state::StateArena;
use crate::system::{transition_relation, validate_predicate, validate_transitions, TransitionSystem};
use crate::timeout::{deadline_exceeded, deadline_from_timeout_secs, earliest, OVERALL_TIMEOUT_REASON};

/// Final verdict of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BmcOutcome {
    /// A bad state is reachable in `step` transitions.
    Unsafe { step: usize, trace: Trace },
    /// The reachable set stopped growing at `step` without reaching a bad
    /// state: the system is safe for any number of steps.
    FixedPoint { step: usize },
    /// Steps `0..explored` are safe; no fixed point was found.
    BoundExhausted { explored: usize },
    Unknown {
        step: usize,
        reason: String,
        formula_size: usize,
    },
}

impl BmcOutcome {
    pub fn is_unsafe(&self) -> bool {
        matches!(self, BmcOutcome::Unsafe { .. })
    }

    pub fn trace(&self) -> Option<&Trace> {
        match self {
            BmcOutcome::Unsafe { trace, .. } => Some(trace),
            _ => None,
        }
    }
}

impl fmt::Display for BmcOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BmcOutcome::Unsafe { step, trace } => {
                writeln!(f, "RESULT: UNSAFE")?;
                writeln!(f, "Bad state reached at step {step}.")?;
                write!(f, "{trace}")
            }
            BmcOutcome::FixedPoint { step } => {
                writeln!(f, "RESULT: SAFE")?;
                write!(f, "Reachable states converged at step {step}.")
            }
            BmcOutcome::BoundExhausted { explored } => {
                writeln!(f, "RESULT: SAFE (bounded)")?;
                write!(f, "No bad state within {explored} steps; no fixed point found.")
            }
            BmcOutcome::Unknown {
                step,
                reason,
                formula_size,
            } => {
                writeln!(f, "RESULT: UNKNOWN")?;
                write!(f, "Gave up at step {step} (formula size {formula_size}): {reason}")
            }
        }
    }
}

/// Result of extending the reachable set by one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Stepped(usize),
    Unknown(String),
}

/// One unrolling run over a transition system.
///
/// The run owns the per-step variables and the reachable-state formulas;
/// every solver query it issues is scoped, so the solver only accumulates
/// declarations.
pub struct BmcRun<'a, S: SmtSolver, T: TransitionSystem + ?Sized> {
    solver: &'a mut S,
    system: &'a T,
    config: BmcConfig,
    arena: StateArena,
    acc: ReachAccumulator,
    /// Last step whose bad check answered UNSAT.
    proven_safe: Option<usize>,
}

impl<'a, S: SmtSolver, T: TransitionSystem + ?Sized> BmcRun<'a, S, T> {
    /// Reset `solver` and seed the run with the initial states at step 0.
    pub fn new(solver: &'a mut S, system: &'a T, config: BmcConfig) -> Result<Self, EngineError> {
        config.validate()?;
        solver.reset().map_err(|e| EngineError::solver(0, 0, e))?;
        let mut arena = StateArena::new(system.layout()?);
        arena
            .allocate_step(&mut *solver, 0)
            .map_err(|e| EngineError::solver(0, 0, e))?;
        let init = system.init(arena.at(0));
        validate_predicate(&arena, 0, "init", &init)?;
        let mut acc = ReachAccumulator::new();
        acc.seed(init)?;
        Ok(Self {
            solver,
            system,
            config,
            arena,
            acc,
            proven_safe: None,
        })
    }

    /// Step under exploration, or `None` once the run has terminated.
    pub fn step(&self) -> Option<usize> {
        self.acc.current_step()
    }

    pub fn phase(&self) -> Phase {
        self.acc.phase()
    }

    pub fn arena(&self) -> &StateArena {
        &self.arena
    }

    pub fn accumulator(&self) -> &ReachAccumulator {
        &self.acc
    }

    fn current(&self) -> Result<usize, EngineError> {
        match self.acc.phase() {
            Phase::Stepping(k) => Ok(k),
            Phase::Init => Err(EngineError::NotSeeded),
            Phase::Terminated(reason) => Err(EngineError::Terminated(reason)),
        }
    }

    /// Can a bad state be reached at or before the current step?
    pub fn check_bad(&mut self) -> Result<SafetyVerdict, EngineError> {
        let k = self.current()?;
        let bad = self.system.bad(self.arena.at(k));
        validate_predicate(&self.arena, k, "bad", &bad)?;
        let verdict = check::check_bad(&mut *self.solver, &self.arena, &self.acc, &bad, k)?;
        if matches!(verdict, SafetyVerdict::Safe) {
            self.proven_safe = Some(k);
        }
        Ok(verdict)
    }

    /// Has the reachable set stopped growing at the current step?
    pub fn check_fixed_point(&mut self) -> Result<FixedPointVerdict, EngineError> {
        let k = self.current()?;
        check::check_fixed_point(&mut *self.solver, &self.arena, &self.acc, k, self.config.fixed_point)
    }

    /// Extend the reachable set from step k to step k+1.
    ///
    /// Step k must have passed [`BmcRun::check_bad`]: the carried part of
    /// `cumulative(k+1)` leaves earlier steps free, so a bad state left
    /// behind at k would later surface with a trace that is not an
    /// execution. An inconclusive feasibility or deadlock query terminates
    /// the run and is reported as [`Advance::Unknown`].
    pub fn advance(&mut self) -> Result<Advance, EngineError> {
        let k = self.current()?;
        if self.proven_safe != Some(k) {
            return Err(EngineError::UncheckedStep { step: k });
        }
        self.arena
            .allocate_step(&mut *self.solver, k + 1)
            .map_err(|e| EngineError::solver(k, self.acc.formula_size(k), e))?;
        let transitions = self
            .system
            .transitions(self.arena.at(k), self.arena.at(k + 1));
        validate_transitions(&self.arena, k, &transitions)?;

        if self.config.check_deadlock {
            let guards: Vec<SmtTerm> = transitions.iter().map(|t| t.guard.clone()).collect();
            match check::check_deadlock(&mut *self.solver, &self.acc, &guards, k)? {
                SatResult::Unsat => {}
                SatResult::Sat => {
                    return Err(EngineError::MalformedTransition {
                        step: k,
                        reason: "a reachable state enables no transition".into(),
                    });
                }
                SatResult::Unknown(reason) => return Ok(self.give_up(reason)),
            }
        }

        let paths = self.acc.frontier(k).ok_or(EngineError::NotSeeded)?.to_vec();
        let frontier = match self.config.branching {
            BranchingMode::Disjunction => {
                let relation = transition_relation(&transitions);
                paths
                    .into_iter()
                    .map(|path| SmtTerm::and(vec![path, relation.clone()]).simplify())
                    .collect()
            }
            BranchingMode::EnabledOnly => {
                let mut enabled = Vec::new();
                for path in &paths {
                    for t in &transitions {
                        let formula = t.formula();
                        match check::check_branch(&mut *self.solver, path, &formula, k)? {
                            SatResult::Sat => {
                                enabled.push(SmtTerm::and(vec![path.clone(), formula]).simplify());
                            }
                            SatResult::Unsat => {
                                debug!(step = k, transition = %t.label, "BMC: branch disabled");
                            }
                            SatResult::Unknown(reason) => return Ok(self.give_up(reason)),
                        }
                    }
                }
                enabled
            }
        };
        debug!(step = k + 1, frontier = frontier.len(), "BMC: frontier extended");
        let next = self.acc.push_step(frontier, &self.arena.rename_map(k, k + 1))?;
        Ok(Advance::Stepped(next))
    }

    fn give_up(&mut self, reason: String) -> Advance {
        self.acc.terminate(Termination::Unknown);
        Advance::Unknown(reason)
    }

    fn unknown(&mut self, step: usize, reason: String) -> BmcOutcome {
        let formula_size = self.acc.formula_size(step);
        warn!(step, formula_size, reason = %reason, "BMC: inconclusive");
        self.acc.terminate(Termination::Unknown);
        BmcOutcome::Unknown {
            step,
            reason,
            formula_size,
        }
    }

    /// Drive the run to a verdict.
    pub fn run(mut self, deadline: Option<Instant>) -> Result<BmcOutcome, EngineError> {
        let deadline = earliest(deadline, deadline_from_timeout_secs(self.config.timeout_secs));
        let bound = self.config.bound;

        for k in 0..bound {
            if deadline_exceeded(deadline) {
                return Ok(self.unknown(k, OVERALL_TIMEOUT_REASON.into()));
            }
            info!(step = k, formula_size = self.acc.formula_size(k), "BMC: checking step");

            match self.check_bad()? {
                SafetyVerdict::Unsafe(model) => {
                    let trace = extract_trace(self.system.name(), &self.arena, &model, k)?;
                    self.acc.terminate(Termination::UnsafeFound);
                    info!(step = k, "BMC: UNSAFE - counterexample found");
                    return Ok(BmcOutcome::Unsafe { step: k, trace });
                }
                SafetyVerdict::Unknown(reason) => return Ok(self.unknown(k, reason)),
                SafetyVerdict::Safe => debug!(step = k, "BMC: step safe"),
            }

            if k >= 1 {
                match self.check_fixed_point()? {
                    FixedPointVerdict::Converged => {
                        self.acc.terminate(Termination::FixedPointFound);
                        info!(step = k, "BMC: SAFE - fixed point reached");
                        return Ok(BmcOutcome::FixedPoint { step: k });
                    }
                    FixedPointVerdict::Unknown(reason) => return Ok(self.unknown(k, reason)),
                    FixedPointVerdict::Growing => {}
                }
            }

            if k + 1 < bound {
                if deadline_exceeded(deadline) {
                    return Ok(self.unknown(k, OVERALL_TIMEOUT_REASON.into()));
                }
                if let Advance::Unknown(reason) = self.advance()? {
                    let formula_size = self.acc.formula_size(k);
                    warn!(step = k, formula_size, reason = %reason, "BMC: inconclusive");
                    return Ok(BmcOutcome::Unknown {
                        step: k,
                        reason,
                        formula_size,
                    });
                }
            }
        }

        self.acc.terminate(Termination::BoundExhausted);
        info!(explored = bound, "BMC: bound exhausted");
        Ok(BmcOutcome::BoundExhausted { explored: bound })
    }
}

/// Unroll `system` until a counterexample, a fixed point or `config.bound`.
pub fn run_bmc<S: SmtSolver, T: TransitionSystem + ?Sized>(
    solver: &mut S,
    system: &T,
    config: &BmcConfig,
) -> Result<BmcOutcome, EngineError> {
    run_bmc_with_deadline(solver, system, config, None)
}

pub fn run_bmc_with_deadline<S: SmtSolver, T: TransitionSystem + ?Sized>(
    solver: &mut S,
    system: &T,
    config: &BmcConfig,
    deadline: Option<Instant>,
) -> Result<BmcOutcome, EngineError> {
    BmcRun::new(solver, system, config.clone())?.run(deadline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FixedPointCheck;
    use crate::state::tests::RecordingSolver;
    use crate::state::{StateLayout, StepVars};
    use crate::system::Transition;
    use std::time::Duration;
    use unroll_smt::sorts::SmtSort;

    /// `x' = x + 1` from `x = 0`, bad at `x = 3`.
    struct Ticker;

    impl TransitionSystem for Ticker {
        fn name(&self) -> &str {
            "ticker"
        }

        fn layout(&self) -> Result<StateLayout, EngineError> {
            StateLayout::new().state("x", SmtSort::Int)
        }

        fn init(&self, s0: StepVars) -> SmtTerm {
            s0.var("x").eq(SmtTerm::int(0))
        }

        fn transitions(&self, cur: StepVars, next: StepVars) -> Vec<Transition> {
            vec![Transition::new(
                "tick",
                SmtTerm::bool(true),
                next.var("x").eq(cur.var("x").add(SmtTerm::int(1))),
            )]
        }

        fn bad(&self, s: StepVars) -> SmtTerm {
            s.var("x").eq(SmtTerm::int(3))
        }
    }

    fn config(bound: usize) -> BmcConfig {
        BmcConfig {
            fixed_point: FixedPointCheck::Disabled,
            check_deadlock: false,
            ..BmcConfig::with_bound(bound)
        }
    }

    #[test]
    fn all_unsat_exhausts_the_bound() {
        let mut solver = RecordingSolver::default();
        let outcome = run_bmc(&mut solver, &Ticker, &config(4)).unwrap();
        assert_eq!(outcome, BmcOutcome::BoundExhausted { explored: 4 });
        assert_eq!(solver.depth, 0);
        assert_eq!(solver.checks, 4, "one bad check per step");
        // x_0..x_3 declared once each
        assert_eq!(solver.declared.len(), 4);
    }

    #[test]
    fn unknown_is_reported_with_step_and_size() {
        let mut solver = RecordingSolver {
            answers: vec![
                SatResult::Unsat,
                SatResult::Unknown("resource limit".into()),
            ],
            ..RecordingSolver::default()
        };
        let outcome = run_bmc(&mut solver, &Ticker, &config(5)).unwrap();
        match outcome {
            BmcOutcome::Unknown {
                step,
                reason,
                formula_size,
            } => {
                assert_eq!(step, 1);
                assert_eq!(reason, "resource limit");
                assert!(formula_size > 0);
            }
            other => panic!("unexpected outcome: {other}"),
        }
    }

    #[test]
    fn fixed_point_runs_only_after_step_zero() {
        let mut solver = RecordingSolver {
            // bad@0, bad@1, fixed point@1
            answers: vec![SatResult::Unsat, SatResult::Unsat, SatResult::Unsat],
            ..RecordingSolver::default()
        };
        let cfg = BmcConfig {
            fixed_point: FixedPointCheck::LoopFree,
            ..config(5)
        };
        let outcome = run_bmc(&mut solver, &Ticker, &cfg).unwrap();
        assert_eq!(outcome, BmcOutcome::FixedPoint { step: 1 });
        assert_eq!(solver.checks, 3);
    }

    #[test]
    fn expired_deadline_yields_unknown_before_any_query() {
        let mut solver = RecordingSolver::default();
        let past = Instant::now() - Duration::from_secs(1);
        let outcome = run_bmc_with_deadline(&mut solver, &Ticker, &config(3), Some(past)).unwrap();
        match outcome {
            BmcOutcome::Unknown { step, reason, .. } => {
                assert_eq!(step, 0);
                assert_eq!(reason, OVERALL_TIMEOUT_REASON);
            }
            other => panic!("unexpected outcome: {other}"),
        }
        assert_eq!(solver.checks, 0);
    }

    #[test]
    fn terminated_run_refuses_further_work() {
        let mut solver = RecordingSolver::default();
        let mut run = BmcRun::new(&mut solver, &Ticker, config(3)).unwrap();
        assert!(matches!(run.check_bad().unwrap(), SafetyVerdict::Safe));
        assert_eq!(run.advance().unwrap(), Advance::Stepped(1));
        run.acc.terminate(Termination::FixedPointFound);
        assert!(matches!(
            run.check_bad(),
            Err(EngineError::Terminated(Termination::FixedPointFound))
        ));
        assert!(matches!(run.advance(), Err(EngineError::Terminated(_))));
        assert_eq!(run.step(), None);
    }

    #[test]
    fn advance_requires_a_safe_bad_check() {
        let mut solver = RecordingSolver {
            // bad@0 safe, bad@1 unsafe
            answers: vec![SatResult::Unsat, SatResult::Sat],
            ..RecordingSolver::default()
        };
        let mut run = BmcRun::new(&mut solver, &Ticker, config(5)).unwrap();
        assert!(matches!(
            run.advance(),
            Err(EngineError::UncheckedStep { step: 0 })
        ));
        assert!(matches!(run.check_bad().unwrap(), SafetyVerdict::Safe));
        assert_eq!(run.advance().unwrap(), Advance::Stepped(1));
        assert!(matches!(run.check_bad().unwrap(), SafetyVerdict::Unsafe(_)));
        assert!(matches!(
            run.advance(),
            Err(EngineError::UncheckedStep { step: 1 })
        ));
        assert_eq!(run.step(), Some(1));
    }

    #[test]
    fn zero_bound_is_invalid() {
        let mut solver = RecordingSolver::default();
        let err = run_bmc(&mut solver, &Ticker, &BmcConfig::with_bound(0)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn outcome_display_leads_with_result_line() {
        let text = BmcOutcome::FixedPoint { step: 4 }.to_string();
        assert!(text.starts_with("RESULT: SAFE\n"));
        let text = BmcOutcome::BoundExhausted { explored: 3 }.to_string();
        assert!(text.starts_with("RESULT: SAFE (bounded)"));
    }
}
