//! Test-input generation for Euclid's remainder loop.
//!
//! The loop `while (m = x % y) != 0 { x = y; y = m; }` is unrolled `length`
//! times. A model of the unrolling is an input `(x, y)` that runs exactly
//! `length` non-terminating iterations before the remainder hits zero. After
//! each model the input is blocked, so successive models are distinct inputs
//! of the same path length.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use unroll_smt::solver::{Model, SatResult, SmtSolver};
use unroll_smt::sorts::SmtSort;
use unroll_smt::terms::SmtTerm;

use crate::error::OneshotError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Integers constrained to `0 <= v < 2^bits`.
    #[default]
    Integer,
    /// Unsigned bit-vectors of width `bits`.
    BitVec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestGenConfig {
    /// Loop iterations before termination.
    pub length: usize,
    /// Maximum number of inputs to generate.
    pub tests: usize,
    /// Precision of `x`, `y` and `m`.
    pub bits: u32,
    pub encoding: Encoding,
}

impl Default for TestGenConfig {
    fn default() -> Self {
        Self {
            length: 10,
            tests: 3,
            bits: 32,
            encoding: Encoding::Integer,
        }
    }
}

impl TestGenConfig {
    pub fn validate(&self) -> Result<(), OneshotError> {
        if self.tests == 0 {
            return Err(OneshotError::InvalidConfig("tests must be at least 1".into()));
        }
        let max_bits = match self.encoding {
            Encoding::Integer => 62,
            Encoding::BitVec => 64,
        };
        if self.bits == 0 || self.bits > max_bits {
            return Err(OneshotError::InvalidConfig(format!(
                "bits must be in 1..={max_bits} for {:?}, got {}",
                self.encoding, self.bits
            )));
        }
        Ok(())
    }

    fn sort(&self) -> SmtSort {
        match self.encoding {
            Encoding::Integer => SmtSort::Int,
            Encoding::BitVec => SmtSort::BitVec(self.bits),
        }
    }

    fn lit(&self, value: u64) -> SmtTerm {
        match self.encoding {
            Encoding::Integer => SmtTerm::int(value as i64),
            Encoding::BitVec => SmtTerm::bv(value, self.bits),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GeneratedTest {
    pub x: u64,
    pub y: u64,
    /// Final `y`, the greatest common divisor of the inputs.
    pub gcd: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestGenStop {
    /// `tests` inputs were generated.
    Limit,
    /// No further input follows a path of this length.
    Exhausted,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestGenReport {
    pub tests: Vec<GeneratedTest>,
    pub stop: TestGenStop,
}

fn var(name: &str, i: usize) -> SmtTerm {
    SmtTerm::var(format!("{name}_{i}"))
}

/// The unrolled loop: domain assumptions for every iteration, then one
/// step constraint per iteration.
pub fn path_constraints(config: &TestGenConfig) -> Vec<SmtTerm> {
    let zero = config.lit(0);
    let mut out = vec![var("y", 0).gt(zero.clone())];
    if config.encoding == Encoding::Integer {
        let limit = config.lit(1u64 << config.bits);
        for i in 0..=config.length {
            out.push(SmtTerm::and(
                ["x", "y", "m"]
                    .iter()
                    .flat_map(|name| {
                        [
                            var(name, i).ge(zero.clone()),
                            var(name, i).lt(limit.clone()),
                        ]
                    })
                    .collect(),
            ));
        }
    }
    for i in 0..=config.length {
        let remainder = var("m", i).eq(var("x", i).modulo(var("y", i)));
        out.push(if i < config.length {
            SmtTerm::and(vec![
                remainder,
                var("m", i).neq(zero.clone()),
                var("x", i + 1).eq(var("y", i)),
                var("y", i + 1).eq(var("m", i)),
            ])
        } else {
            SmtTerm::and(vec![remainder, var("m", i).eq(zero.clone())])
        });
    }
    out
}

fn read(model: &Model, name: &str) -> Result<u64, OneshotError> {
    model
        .get_numeric(name)
        .and_then(|v| u64::try_from(v).ok())
        .ok_or_else(|| OneshotError::IncompleteModel(name.to_string()))
}

/// Generate up to `config.tests` distinct inputs. Resets the solver.
pub fn generate<S: SmtSolver>(
    solver: &mut S,
    config: &TestGenConfig,
) -> Result<TestGenReport, OneshotError> {
    config.validate()?;
    info!(
        length = config.length,
        tests = config.tests,
        bits = config.bits,
        encoding = ?config.encoding,
        "testgen: unrolling"
    );
    solver.reset().map_err(OneshotError::solver)?;
    let sort = config.sort();
    for i in 0..=config.length {
        for name in ["x", "y", "m"] {
            solver
                .declare_var(&format!("{name}_{i}"), &sort)
                .map_err(OneshotError::solver)?;
        }
    }
    for constraint in path_constraints(config) {
        solver.assert(&constraint).map_err(OneshotError::solver)?;
    }

    let last_y = format!("y_{}", config.length);
    let wanted = [("x_0", &sort), ("y_0", &sort), (last_y.as_str(), &sort)];
    let mut tests = Vec::new();
    while tests.len() < config.tests {
        let model = match solver
            .check_sat_with_model(&wanted)
            .map_err(OneshotError::solver)?
        {
            (SatResult::Sat, Some(model)) => model,
            (SatResult::Sat, None) => {
                return Err(OneshotError::Solver(
                    "satisfiable query returned no model".into(),
                ))
            }
            (SatResult::Unsat, _) => {
                info!(generated = tests.len(), "testgen: no more inputs of this length");
                return Ok(TestGenReport {
                    tests,
                    stop: TestGenStop::Exhausted,
                });
            }
            (SatResult::Unknown(reason), _) => {
                return Ok(TestGenReport {
                    tests,
                    stop: TestGenStop::Unknown(reason),
                })
            }
        };
        let test = GeneratedTest {
            x: read(&model, "x_0")?,
            y: read(&model, "y_0")?,
            gcd: read(&model, &last_y)?,
        };
        debug!(x = test.x, y = test.y, gcd = test.gcd, "testgen: input found");
        // either component may differ
        let block = SmtTerm::or(vec![
            var("x", 0).neq(config.lit(test.x)),
            var("y", 0).neq(config.lit(test.y)),
        ]);
        solver.assert(&block).map_err(OneshotError::solver)?;
        tests.push(test);
    }
    Ok(TestGenReport {
        tests,
        stop: TestGenStop::Limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_demo_script() {
        let config = TestGenConfig::default();
        assert_eq!((config.length, config.tests, config.bits), (10, 3, 32));
        assert_eq!(config.encoding, Encoding::Integer);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_precision_and_zero_tests() {
        let wide_int = TestGenConfig {
            bits: 63,
            ..TestGenConfig::default()
        };
        assert!(matches!(
            wide_int.validate(),
            Err(OneshotError::InvalidConfig(_))
        ));
        let wide_bv = TestGenConfig {
            bits: 64,
            encoding: Encoding::BitVec,
            ..TestGenConfig::default()
        };
        assert!(wide_bv.validate().is_ok());
        let none = TestGenConfig {
            tests: 0,
            ..TestGenConfig::default()
        };
        assert!(none.validate().is_err());
    }

    #[test]
    fn integer_unrolling_bounds_every_variable() {
        let config = TestGenConfig {
            length: 2,
            bits: 4,
            ..TestGenConfig::default()
        };
        let constraints = path_constraints(&config);
        // y_0 > 0, three domain blocks, three steps
        assert_eq!(constraints.len(), 1 + 3 + 3);
        assert!(constraints[1].vars().contains("m_0"));
        let SmtTerm::And(last) = &constraints[6] else {
            panic!("expected a conjunction");
        };
        assert_eq!(last[1], SmtTerm::var("m_2").eq(SmtTerm::int(0)));
    }

    #[test]
    fn bit_vector_unrolling_skips_domain_assumptions() {
        let config = TestGenConfig {
            length: 2,
            bits: 8,
            encoding: Encoding::BitVec,
            ..TestGenConfig::default()
        };
        let constraints = path_constraints(&config);
        assert_eq!(constraints.len(), 1 + 3);
        assert_eq!(constraints[0], SmtTerm::var("y_0").gt(SmtTerm::bv(0, 8)));
    }

    #[test]
    fn config_json_uses_snake_case_encoding() {
        let config: TestGenConfig =
            serde_json::from_str(r#"{"length": 5, "bits": 16, "encoding": "bit_vec"}"#).unwrap();
        assert_eq!(config.length, 5);
        assert_eq!(config.tests, 3);
        assert_eq!(config.encoding, Encoding::BitVec);
    }
}
