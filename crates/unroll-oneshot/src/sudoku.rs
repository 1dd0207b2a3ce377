//! Sudoku as a single satisfiability query.
//!
//! Cell `(r, c)` is the integer variable `x_{r+1}_{c+1}` ranging over 1..=9.
//! Every row, column and 3×3 box is `Distinct`; givens are pinned.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use unroll_smt::solver::{Model, SatResult, SmtSolver};
use unroll_smt::sorts::SmtSort;
use unroll_smt::terms::SmtTerm;

use crate::error::OneshotError;

/// Row-major 9×9 grid; `0` marks an empty cell in a puzzle.
pub type Grid = [[u8; 9]; 9];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Puzzle {
    cells: Grid,
}

impl Puzzle {
    /// A puzzle without givens; any valid Sudoku solves it.
    pub fn empty() -> Self {
        Self { cells: [[0; 9]; 9] }
    }

    pub fn from_grid(cells: Grid) -> Result<Self, OneshotError> {
        for (r, row) in cells.iter().enumerate() {
            for (c, &v) in row.iter().enumerate() {
                if v > 9 {
                    return Err(OneshotError::InvalidPuzzle(format!(
                        "cell ({}, {}) holds {v}, expected 0..=9",
                        r + 1,
                        c + 1
                    )));
                }
            }
        }
        Ok(Self { cells })
    }

    /// Parse 81 cells in row-major order. Digits `1`-`9` are givens, `0` and
    /// `.` are empty; whitespace is ignored.
    pub fn parse(text: &str) -> Result<Self, OneshotError> {
        let mut cells = [[0u8; 9]; 9];
        let mut n = 0usize;
        for ch in text.chars().filter(|c| !c.is_whitespace()) {
            let value = match ch {
                '.' => 0,
                '0'..='9' => ch as u8 - b'0',
                other => {
                    return Err(OneshotError::InvalidPuzzle(format!(
                        "unexpected character `{other}`"
                    )))
                }
            };
            if n >= 81 {
                return Err(OneshotError::InvalidPuzzle("more than 81 cells".into()));
            }
            cells[n / 9][n % 9] = value;
            n += 1;
        }
        if n != 81 {
            return Err(OneshotError::InvalidPuzzle(format!(
                "expected 81 cells, found {n}"
            )));
        }
        Ok(Self { cells })
    }

    pub fn grid(&self) -> &Grid {
        &self.cells
    }

    /// Non-empty cells as `(row, col, value)`, zero-based.
    pub fn givens(&self) -> impl Iterator<Item = (usize, usize, u8)> + '_ {
        self.cells.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter(|&(_, &v)| v != 0)
                .map(move |(c, &v)| (r, c, v))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SudokuOutcome {
    Solved(Grid),
    Unsatisfiable,
    Unknown(String),
}

fn cell_name(r: usize, c: usize) -> String {
    format!("x_{}_{}", r + 1, c + 1)
}

fn cell(r: usize, c: usize) -> SmtTerm {
    SmtTerm::var(cell_name(r, c))
}

/// Range, row, column, box and given constraints for `puzzle`.
pub fn constraints(puzzle: &Puzzle) -> Vec<SmtTerm> {
    let mut out = Vec::new();
    for r in 0..9 {
        for c in 0..9 {
            out.push(SmtTerm::and(vec![
                SmtTerm::int(1).le(cell(r, c)),
                cell(r, c).le(SmtTerm::int(9)),
            ]));
        }
    }
    for r in 0..9 {
        out.push(SmtTerm::distinct((0..9).map(|c| cell(r, c)).collect()));
    }
    for c in 0..9 {
        out.push(SmtTerm::distinct((0..9).map(|r| cell(r, c)).collect()));
    }
    for br in 0..3 {
        for bc in 0..3 {
            out.push(SmtTerm::distinct(
                (0..9)
                    .map(|i| cell(3 * br + i / 3, 3 * bc + i % 3))
                    .collect(),
            ));
        }
    }
    for (r, c, v) in puzzle.givens() {
        out.push(cell(r, c).eq(SmtTerm::int(i64::from(v))));
    }
    out
}

fn cell_vars() -> Vec<String> {
    (0..81).map(|n| cell_name(n / 9, n % 9)).collect()
}

fn load<S: SmtSolver>(solver: &mut S, puzzle: &Puzzle) -> Result<Vec<String>, OneshotError> {
    solver.reset().map_err(OneshotError::solver)?;
    let names = cell_vars();
    for name in &names {
        solver
            .declare_var(name, &SmtSort::Int)
            .map_err(OneshotError::solver)?;
    }
    for constraint in constraints(puzzle) {
        solver.assert(&constraint).map_err(OneshotError::solver)?;
    }
    Ok(names)
}

fn check<S: SmtSolver>(
    solver: &mut S,
    names: &[String],
) -> Result<(SatResult, Option<Model>), OneshotError> {
    let int = SmtSort::Int;
    let vars: Vec<(&str, &SmtSort)> = names.iter().map(|n| (n.as_str(), &int)).collect();
    solver
        .check_sat_with_model(&vars)
        .map_err(OneshotError::solver)
}

fn read_grid(model: &Model) -> Result<Grid, OneshotError> {
    let mut grid = [[0u8; 9]; 9];
    for (r, row) in grid.iter_mut().enumerate() {
        for (c, slot) in row.iter_mut().enumerate() {
            let name = cell_name(r, c);
            *slot = model
                .get_int(&name)
                .and_then(|v| u8::try_from(v).ok())
                .filter(|v| (1..=9).contains(v))
                .ok_or(OneshotError::IncompleteModel(name))?;
        }
    }
    Ok(grid)
}

/// Solve `puzzle`. Resets the solver.
pub fn solve<S: SmtSolver>(solver: &mut S, puzzle: &Puzzle) -> Result<SudokuOutcome, OneshotError> {
    info!(givens = puzzle.givens().count(), "sudoku: solving");
    let names = load(solver, puzzle)?;
    match check(solver, &names)? {
        (SatResult::Sat, Some(model)) => Ok(SudokuOutcome::Solved(read_grid(&model)?)),
        (SatResult::Sat, None) => Err(OneshotError::Solver(
            "satisfiable query returned no model".into(),
        )),
        (SatResult::Unsat, _) => Ok(SudokuOutcome::Unsatisfiable),
        (SatResult::Unknown(reason), _) => Ok(SudokuOutcome::Unknown(reason)),
    }
}

/// Up to `limit` distinct solutions of `puzzle`, each found after blocking
/// the previous ones. Resets the solver.
pub fn solutions<S: SmtSolver>(
    solver: &mut S,
    puzzle: &Puzzle,
    limit: usize,
) -> Result<Vec<Grid>, OneshotError> {
    let names = load(solver, puzzle)?;
    let mut found = Vec::new();
    while found.len() < limit {
        let grid = match check(solver, &names)? {
            (SatResult::Sat, Some(model)) => read_grid(&model)?,
            (SatResult::Sat, None) => {
                return Err(OneshotError::Solver(
                    "satisfiable query returned no model".into(),
                ))
            }
            (SatResult::Unsat, _) => break,
            (SatResult::Unknown(reason), _) => return Err(OneshotError::Inconclusive(reason)),
        };
        solver
            .assert(&blocking_clause(&grid))
            .map_err(OneshotError::solver)?;
        found.push(grid);
        debug!(found = found.len(), "sudoku: solution blocked");
    }
    Ok(found)
}

/// Some cell differs from `grid`.
fn blocking_clause(grid: &Grid) -> SmtTerm {
    SmtTerm::or(
        (0..81)
            .map(|n| cell(n / 9, n % 9).neq(SmtTerm::int(i64::from(grid[n / 9][n % 9]))))
            .collect(),
    )
}

fn is_permutation(cells: impl Iterator<Item = u8>) -> bool {
    let mut seen = [false; 10];
    for v in cells {
        if !(1..=9).contains(&v) || seen[usize::from(v)] {
            return false;
        }
        seen[usize::from(v)] = true;
    }
    true
}

/// Does `grid` satisfy every Sudoku rule and agree with `puzzle`'s givens?
pub fn is_solution(puzzle: &Puzzle, grid: &Grid) -> bool {
    let rows = (0..9).all(|r| is_permutation((0..9).map(|c| grid[r][c])));
    let cols = (0..9).all(|c| is_permutation((0..9).map(|r| grid[r][c])));
    let boxes = (0..9)
        .all(|b| is_permutation((0..9).map(|i| grid[3 * (b / 3) + i / 3][3 * (b % 3) + i % 3])));
    rows && cols && boxes && puzzle.givens().all(|(r, c, v)| grid[r][c] == v)
}

/// One row per line, cells separated by spaces.
pub fn render(grid: &Grid) -> String {
    grid.iter()
        .map(|row| {
            row.iter()
                .map(u8::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
