use std::collections::{HashMap, HashSet};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};

use thiserror::Error;

use crate::backends::smtlib_printer::{declare_enum, sort_to_smtlib, to_smtlib};
use crate::solver::{Model, ModelValue, SatResult, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

const LOGIC: &str = "(set-logic ALL)";

#[derive(Debug, Error)]
pub enum Cvc5Error {
    #[error("cvc5 I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot start cvc5: {0}")]
    Spawn(String),
    #[error("unexpected cvc5 reply: {0}")]
    Protocol(String),
}

/// Line-oriented pipe to a running cvc5 process.
struct Pipe {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr: BufReader<ChildStderr>,
}

impl Pipe {
    fn spawn(cmd: &str, args: &[String]) -> Result<Self, Cvc5Error> {
        let mut child = Command::new(cmd)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Cvc5Error::Spawn(format!("{cmd}: {e}")))?;
        let missing = |stream: &str| Cvc5Error::Spawn(format!("{cmd}: no {stream} handle"));
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;
        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            stderr: BufReader::new(stderr),
        })
    }

    /// Write a command that produces no output in incremental mode.
    fn send(&mut self, command: &str) -> Result<(), Cvc5Error> {
        writeln!(self.stdin, "{command}")?;
        self.stdin.flush()?;
        Ok(())
    }

    /// Write a command and read its one-line reply.
    fn query(&mut self, command: &str) -> Result<String, Cvc5Error> {
        self.send(command)?;
        let mut reply = String::new();
        if self.stdout.read_line(&mut reply)? == 0 {
            let mut diagnostics = String::new();
            let _ = self.stderr.read_line(&mut diagnostics);
            return Err(Cvc5Error::Protocol(format!(
                "cvc5 closed its output after `{command}`: {}",
                diagnostics.trim()
            )));
        }
        Ok(reply.trim_end().to_string())
    }
}

impl Drop for Pipe {
    fn drop(&mut self) {
        let _ = self.send("(exit)");
        let _ = self.child.wait();
    }
}

/// cvc5 driven as an incremental SMT-LIB2 subprocess.
///
/// Declared sorts are remembered so terms print with bit-vector or integer
/// operators as appropriate, and enum datatypes are declared once per
/// solver session.
pub struct Cvc5Solver {
    pipe: Pipe,
    vars: HashMap<String, SmtSort>,
    enums: HashSet<String>,
}

impl Cvc5Solver {
    pub fn new() -> Result<Self, Cvc5Error> {
        Self::with_command("cvc5", 0)
    }

    /// Per-query limit; `0` means none. An exhausted limit answers `unknown`.
    pub fn with_timeout_secs(timeout_secs: u64) -> Result<Self, Cvc5Error> {
        Self::with_command("cvc5", timeout_secs)
    }

    pub fn with_command(cmd: &str, timeout_secs: u64) -> Result<Self, Cvc5Error> {
        let mut args: Vec<String> = ["--lang", "smt2", "--incremental", "--produce-models"]
            .iter()
            .map(|a| a.to_string())
            .collect();
        if timeout_secs > 0 {
            args.push(format!("--tlimit-per={}", timeout_secs.saturating_mul(1000)));
        }
        let mut pipe = Pipe::spawn(cmd, &args)?;
        pipe.send(LOGIC)?;
        Ok(Self {
            pipe,
            vars: HashMap::new(),
            enums: HashSet::new(),
        })
    }

    fn print(&self, term: &SmtTerm) -> String {
        to_smtlib(term, &|name| self.vars.get(name).cloned())
    }
}

impl SmtSolver for Cvc5Solver {
    type Error = Cvc5Error;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Cvc5Error> {
        if let SmtSort::Enum(spec) = sort {
            if self.enums.insert(spec.name.clone()) {
                self.pipe.send(&declare_enum(spec))?;
            }
        }
        self.pipe
            .send(&format!("(declare-const {name} {})", sort_to_smtlib(sort)))?;
        self.vars.insert(name.to_string(), sort.clone());
        Ok(())
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), Cvc5Error> {
        let printed = self.print(term);
        self.pipe.send(&format!("(assert {printed})"))
    }

    fn push(&mut self) -> Result<(), Cvc5Error> {
        self.pipe.send("(push 1)")
    }

    fn pop(&mut self) -> Result<(), Cvc5Error> {
        self.pipe.send("(pop 1)")
    }

    fn check_sat(&mut self) -> Result<SatResult, Cvc5Error> {
        match self.pipe.query("(check-sat)")?.as_str() {
            "sat" => Ok(SatResult::Sat),
            "unsat" => Ok(SatResult::Unsat),
            "unknown" => {
                let reason = self.pipe.query("(get-info :reason-unknown)")?;
                Ok(SatResult::Unknown(reason_unknown(&reason)))
            }
            other => Err(Cvc5Error::Protocol(other.to_string())),
        }
    }

    fn check_sat_with_model(
        &mut self,
        var_names: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), Cvc5Error> {
        let result = self.check_sat()?;
        if result != SatResult::Sat {
            return Ok((result, None));
        }
        let mut model = Model::default();
        for &(name, sort) in var_names {
            let reply = self.pipe.query(&format!("(get-value ({name}))"))?;
            if let Some(value) = value_of(&reply, name).and_then(|text| parse_value(text, sort)) {
                model.values.insert(name.to_string(), value);
            }
        }
        Ok((SatResult::Sat, Some(model)))
    }

    fn reset(&mut self) -> Result<(), Cvc5Error> {
        self.pipe.send("(reset)")?;
        self.pipe.send(LOGIC)?;
        self.vars.clear();
        self.enums.clear();
        Ok(())
    }
}

/// `(:reason-unknown timeout)` → `timeout`.
fn reason_unknown(reply: &str) -> String {
    let reason = reply
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim_start_matches(":reason-unknown")
        .trim();
    if reason.is_empty() {
        "cvc5 returned unknown".to_string()
    } else {
        format!("cvc5: {reason}")
    }
}

/// Value text of a `((name value))` reply to `get-value`.
fn value_of<'r>(reply: &'r str, name: &str) -> Option<&'r str> {
    let inner = reply.trim().strip_prefix("((")?.strip_suffix("))")?;
    let rest = inner
        .trim_start_matches('|')
        .strip_prefix(name)?
        .trim_start_matches('|');
    Some(rest.trim())
}

fn parse_value(text: &str, sort: &SmtSort) -> Option<ModelValue> {
    match sort {
        SmtSort::Int => match text.strip_prefix("(-") {
            Some(negated) => negated
                .trim_end_matches(')')
                .trim()
                .parse::<i64>()
                .ok()
                .map(|n| ModelValue::Int(-n)),
            None => text.parse().ok().map(ModelValue::Int),
        },
        SmtSort::Bool => text.parse().ok().map(ModelValue::Bool),
        SmtSort::BitVec(width) => {
            let value = if let Some(bits) = text.strip_prefix("#b") {
                u64::from_str_radix(bits, 2).ok()?
            } else if let Some(hex) = text.strip_prefix("#x") {
                u64::from_str_radix(hex, 16).ok()?
            } else {
                text.strip_prefix("(_ bv")?
                    .split_whitespace()
                    .next()?
                    .parse()
                    .ok()?
            };
            Some(ModelValue::BitVec {
                value,
                width: *width,
            })
        }
        SmtSort::Enum(spec) => {
            let variant = text.trim_matches('|');
            spec.index_of(variant).map(|idx| ModelValue::Enum {
                sort: spec.name.clone(),
                variant: spec.variants[idx].clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sorts::EnumSort;

    fn parse(reply: &str, name: &str, sort: &SmtSort) -> Option<ModelValue> {
        value_of(reply, name).and_then(|text| parse_value(text, sort))
    }

    #[test]
    fn integers_including_negated_form() {
        assert_eq!(parse("((x 42))", "x", &SmtSort::Int), Some(ModelValue::Int(42)));
        assert_eq!(parse("((x (- 7)))", "x", &SmtSort::Int), Some(ModelValue::Int(-7)));
        assert_eq!(parse("((y 1))", "x", &SmtSort::Int), None);
    }

    #[test]
    fn booleans_and_quoted_names() {
        assert_eq!(
            parse("((|press_2| true))", "press_2", &SmtSort::Bool),
            Some(ModelValue::Bool(true))
        );
        assert_eq!(parse("((b false))", "b", &SmtSort::Bool), Some(ModelValue::Bool(false)));
    }

    #[test]
    fn bit_vector_spellings() {
        let sort = SmtSort::BitVec(8);
        for reply in ["((x_3 #b00001111))", "((x_3 #x0f))", "((x_3 (_ bv15 8)))"] {
            assert_eq!(
                parse(reply, "x_3", &sort),
                Some(ModelValue::BitVec {
                    value: 15,
                    width: 8
                }),
                "reply {reply}"
            );
        }
    }

    #[test]
    fn enum_values_must_be_declared_variants() {
        let sort = SmtSort::Enum(EnumSort::new("Mode", ["off", "on"]));
        assert_eq!(
            parse("((q on))", "q", &sort),
            Some(ModelValue::Enum {
                sort: "Mode".into(),
                variant: "on".into()
            })
        );
        assert_eq!(parse("((q idle))", "q", &sort), None);
    }

    #[test]
    fn unknown_reason_is_unwrapped() {
        assert_eq!(reason_unknown("(:reason-unknown timeout)"), "cvc5: timeout");
        assert_eq!(reason_unknown("()"), "cvc5 returned unknown");
    }
}
