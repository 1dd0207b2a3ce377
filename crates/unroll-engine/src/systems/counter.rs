//! Push-button counter: a two-mode machine that counts while `on`.
//!
//! | from | condition                  | to  | counter   |
//! |------|----------------------------|-----|-----------|
//! | off  | ¬press                     | off | unchanged |
//! | off  | press                      | on  | unchanged |
//! | on   | ¬press ∧ x < cap           | on  | x + 1     |
//! | on   | press ∨ x ≥ cap            | off | reset to 0|

use serde::{Deserialize, Serialize};
use unroll_smt::sorts::{EnumSort, SmtSort};
use unroll_smt::terms::SmtTerm;

use crate::error::EngineError;
use crate::state::{StateLayout, StepVars};
use crate::system::{NumericMode, Transition, TransitionSystem};

const MODE: &str = "Mode";
const OFF: &str = "off";
const ON: &str = "on";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterParams {
    /// Largest value the counter reaches before switching off.
    pub cap: u64,
    /// Bad states are those with `x >= threshold`.
    pub threshold: u64,
    pub numeric: NumericMode,
}

impl Default for CounterParams {
    fn default() -> Self {
        Self {
            cap: 10,
            threshold: 10,
            numeric: NumericMode::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CounterSystem {
    params: CounterParams,
    cap: i64,
    threshold: i64,
}

impl CounterSystem {
    pub fn new(params: CounterParams) -> Result<Self, EngineError> {
        params.numeric.validate()?;
        let cap = params.numeric.check_fits(params.cap, "cap")?;
        let threshold = params.numeric.check_fits(params.threshold, "threshold")?;
        Ok(Self {
            params,
            cap,
            threshold,
        })
    }

    pub fn params(&self) -> &CounterParams {
        &self.params
    }

    fn mode_sort() -> EnumSort {
        EnumSort::new(MODE, [OFF, ON])
    }

    fn lit(&self, value: i64) -> SmtTerm {
        self.params.numeric.lit(value)
    }
}

fn mode(s: StepVars, variant: &str) -> SmtTerm {
    s.var("q").eq(SmtTerm::enum_lit(MODE, variant))
}

impl TransitionSystem for CounterSystem {
    fn name(&self) -> &str {
        "counter"
    }

    fn layout(&self) -> Result<StateLayout, EngineError> {
        StateLayout::new()
            .state("q", SmtSort::Enum(Self::mode_sort()))?
            .state("x", self.params.numeric.sort())?
            .input("press", SmtSort::Bool)
    }

    fn init(&self, s0: StepVars) -> SmtTerm {
        SmtTerm::and(vec![mode(s0, OFF), s0.var("x").eq(self.lit(0))])
    }

    fn transitions(&self, cur: StepVars, next: StepVars) -> Vec<Transition> {
        let x = cur.var("x");
        let press = cur.var("press");
        let cap = self.lit(self.cap);
        let keep_x = next.var("x").eq(x.clone());
        vec![
            Transition::new(
                "idle",
                SmtTerm::and(vec![mode(cur, OFF), press.clone().not()]),
                SmtTerm::and(vec![mode(next, OFF), keep_x.clone()]),
            ),
            Transition::new(
                "switch_on",
                SmtTerm::and(vec![mode(cur, OFF), press.clone()]),
                SmtTerm::and(vec![mode(next, ON), keep_x]),
            ),
            Transition::new(
                "count",
                SmtTerm::and(vec![
                    mode(cur, ON),
                    press.clone().not(),
                    x.clone().lt(cap.clone()),
                ]),
                SmtTerm::and(vec![
                    mode(next, ON),
                    next.var("x").eq(x.clone().add(self.lit(1))),
                ]),
            ),
            Transition::new(
                "switch_off",
                SmtTerm::and(vec![mode(cur, ON), SmtTerm::or(vec![press, x.ge(cap)])]),
                SmtTerm::and(vec![mode(next, OFF), next.var("x").eq(self.lit(0))]),
            ),
        ]
    }

    fn bad(&self, s: StepVars) -> SmtTerm {
        s.var("x").ge(self.lit(self.threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_match_the_push_button_demo() {
        let params = CounterParams::default();
        assert_eq!(params.cap, 10);
        assert_eq!(params.threshold, 10);
        assert_eq!(params.numeric, NumericMode::BitVec { width: 64 });
    }

    #[test]
    fn layout_tracks_mode_counter_and_input() {
        let system = CounterSystem::new(CounterParams::default()).unwrap();
        let layout = system.layout().unwrap();
        let names: Vec<&str> = layout.vars().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["q", "x", "press"]);
        assert_eq!(layout.state_vars().count(), 2);
    }

    #[test]
    fn cap_must_fit_the_bit_width() {
        let params = CounterParams {
            cap: 300,
            numeric: NumericMode::BitVec { width: 8 },
            ..CounterParams::default()
        };
        assert!(matches!(
            CounterSystem::new(params),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn transitions_read_step_k_and_write_step_k_plus_one() {
        let system = CounterSystem::new(CounterParams::default()).unwrap();
        let ts = system.transitions(StepVars::new(3), StepVars::new(4));
        let labels: Vec<&str> = ts.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["idle", "switch_on", "count", "switch_off"]);
        for t in &ts {
            assert!(t.guard.vars().iter().all(|v| v.ends_with("_3")));
            assert!(t.update.vars().iter().any(|v| v.ends_with("_4")));
        }
    }

    #[test]
    fn params_deserialize_with_integer_mode() {
        let params: CounterParams =
            serde_json::from_str(r#"{"threshold": 11, "numeric": {"kind": "integer"}}"#).unwrap();
        assert_eq!(params.cap, 10);
        assert_eq!(params.threshold, 11);
        assert_eq!(params.numeric, NumericMode::Integer);
    }
}
