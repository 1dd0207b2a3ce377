//! Ready-made transition systems.

pub mod counter;
pub mod gcd;

pub use counter::{CounterParams, CounterSystem};
pub use gcd::{Divisor, GcdParams, GcdSystem};
