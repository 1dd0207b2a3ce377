//! Bounded model checking with incremental fixed-point detection.
//!
//! A [`system::TransitionSystem`] is unrolled one step at a time. Each step
//! extends the reachable-state formulas kept by [`reach::ReachAccumulator`],
//! checks the bad-state predicate against everything reachable so far and,
//! once the step is known safe, asks whether the reachable set has stopped
//! growing. The loop ends with a counterexample, a fixed point, an exhausted
//! bound or an inconclusive solver answer (see [`bmc::BmcOutcome`]).

pub mod bmc;
pub mod check;
pub mod config;
pub mod counterexample;
pub mod error;
pub mod reach;
pub mod state;
pub mod system;
pub mod systems;
pub(crate) mod timeout;
pub mod unrolled;

pub use bmc::{run_bmc, run_bmc_with_deadline, BmcOutcome, BmcRun};
pub use config::{BmcConfig, BranchingMode, FixedPointCheck};
pub use counterexample::{extract_trace, replay_trace, Trace, TraceState};
pub use error::EngineError;
pub use system::{NumericMode, Transition, TransitionSystem};
