use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OneshotError {
    #[error("invalid puzzle: {0}")]
    InvalidPuzzle(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("solver failure: {0}")]
    Solver(String),
    #[error("solver gave up: {0}")]
    Inconclusive(String),
    #[error("model assigns no usable value to `{0}`")]
    IncompleteModel(String),
}

impl OneshotError {
    pub(crate) fn solver(err: impl fmt::Display) -> Self {
        OneshotError::Solver(err.to_string())
    }
}
