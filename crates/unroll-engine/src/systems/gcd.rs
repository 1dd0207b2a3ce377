//! Euclid's algorithm by repeated subtraction.
//!
//! The claimed divisor `g` is carried as an unchanging state variable. A bad
//! state is a terminated run (`y = 0`) whose result `x` differs from `g`.

use serde::{Deserialize, Serialize};
use unroll_smt::terms::SmtTerm;

use crate::error::EngineError;
use crate::state::{StateLayout, StepVars};
use crate::system::{NumericMode, Transition, TransitionSystem};

/// Which divisor the run is expected to end with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Divisor {
    Fixed(i64),
    /// Any positive common divisor of the inputs.
    AnyCommonDivisor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcdParams {
    /// Initial `x`; `None` leaves it symbolic and positive.
    pub x0: Option<i64>,
    /// Initial `y`; `None` leaves it symbolic and positive.
    pub y0: Option<i64>,
    pub divisor: Divisor,
    pub numeric: NumericMode,
}

impl Default for GcdParams {
    fn default() -> Self {
        Self {
            x0: Some(12),
            y0: Some(18),
            divisor: Divisor::Fixed(6),
            numeric: NumericMode::Integer,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GcdSystem {
    params: GcdParams,
}

impl GcdSystem {
    pub fn new(params: GcdParams) -> Result<Self, EngineError> {
        params.numeric.validate()?;
        let literal = |what: &str, v: Option<i64>| match v {
            Some(v) if v <= 0 => Err(EngineError::InvalidConfig(format!(
                "{what} must be positive, got {v}"
            ))),
            Some(v) => params.numeric.check_fits(v.unsigned_abs(), what).map(|_| ()),
            None => Ok(()),
        };
        literal("x0", params.x0)?;
        literal("y0", params.y0)?;
        if let Divisor::Fixed(g) = params.divisor {
            literal("divisor", Some(g))?;
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &GcdParams {
        &self.params
    }

    fn lit(&self, value: i64) -> SmtTerm {
        self.params.numeric.lit(value)
    }

    fn start(&self, s0: StepVars, var: &str, value: Option<i64>) -> SmtTerm {
        match value {
            Some(v) => s0.var(var).eq(self.lit(v)),
            None => s0.var(var).gt(self.lit(0)),
        }
    }
}

impl TransitionSystem for GcdSystem {
    fn name(&self) -> &str {
        "gcd"
    }

    fn layout(&self) -> Result<StateLayout, EngineError> {
        let sort = self.params.numeric.sort();
        StateLayout::new()
            .state("x", sort.clone())?
            .state("y", sort.clone())?
            .state("g", sort)
    }

    fn init(&self, s0: StepVars) -> SmtTerm {
        let divisor = match self.params.divisor {
            Divisor::Fixed(g) => s0.var("g").eq(self.lit(g)),
            Divisor::AnyCommonDivisor => SmtTerm::and(vec![
                s0.var("g").gt(self.lit(0)),
                s0.var("x").modulo(s0.var("g")).eq(self.lit(0)),
                s0.var("y").modulo(s0.var("g")).eq(self.lit(0)),
            ]),
        };
        SmtTerm::and(vec![
            self.start(s0, "x", self.params.x0),
            self.start(s0, "y", self.params.y0),
            divisor,
        ])
    }

    fn transitions(&self, cur: StepVars, next: StepVars) -> Vec<Transition> {
        let (x, y) = (cur.var("x"), cur.var("y"));
        let keep_g = next.var("g").eq(cur.var("g"));
        vec![
            Transition::new(
                "reduce_x",
                x.clone().gt(y.clone()),
                SmtTerm::and(vec![
                    next.var("x").eq(x.clone().sub(y.clone())),
                    next.var("y").eq(y.clone()),
                    keep_g.clone(),
                ]),
            ),
            Transition::new(
                "reduce_y",
                x.clone().le(y.clone()),
                SmtTerm::and(vec![
                    next.var("x").eq(x.clone()),
                    next.var("y").eq(y.sub(x)),
                    keep_g,
                ]),
            ),
        ]
    }

    fn bad(&self, s: StepVars) -> SmtTerm {
        SmtTerm::and(vec![
            s.var("y").eq(self.lit(0)),
            s.var("x").neq(s.var("g")),
        ])
    }
}
