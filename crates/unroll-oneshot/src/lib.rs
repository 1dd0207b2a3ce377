//! Single-query constraint problems: a finite constraint set, one
//! satisfiability answer, and a model read back into domain values.
//!
//! - [`sudoku`]: 9×9 Sudoku with row, column and box `Distinct` constraints.
//! - [`testgen`]: input generation for Euclid's remainder loop, one path
//!   length at a time, with blocking clauses between models.

pub mod error;
pub mod sudoku;
pub mod testgen;

pub use error::OneshotError;
pub use sudoku::{Grid, Puzzle, SudokuOutcome};
pub use testgen::{Encoding, GeneratedTest, TestGenConfig, TestGenReport, TestGenStop};
