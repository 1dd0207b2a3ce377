use unroll_oneshot::sudoku::{is_solution, render, solutions, solve};
use unroll_oneshot::{Puzzle, SudokuOutcome};
use unroll_smt::backends::z3_backend::{Config, Context, Z3Solver};

const CLASSIC: &str = "
    530070000
    600195000
    098000060
    800060003
    400803001
    700020006
    060000280
    000419005
    000080079
";

const CLASSIC_SOLUTION: [[u8; 9]; 9] = [
    [5, 3, 4, 6, 7, 8, 9, 1, 2],
    [6, 7, 2, 1, 9, 5, 3, 4, 8],
    [1, 9, 8, 3, 4, 2, 5, 6, 7],
    [8, 5, 9, 7, 6, 1, 4, 2, 3],
    [4, 2, 6, 8, 5, 3, 7, 9, 1],
    [7, 1, 3, 9, 2, 4, 8, 5, 6],
    [9, 6, 1, 5, 3, 7, 2, 8, 4],
    [2, 8, 7, 4, 1, 9, 6, 3, 5],
    [3, 4, 5, 2, 8, 6, 1, 7, 9],
];

#[test]
fn classic_puzzle_has_its_known_solution() {
    let puzzle = Puzzle::parse(CLASSIC).unwrap();
    let ctx = Context::new(&Config::new());
    let mut solver = Z3Solver::new(&ctx);
    match solve(&mut solver, &puzzle).unwrap() {
        SudokuOutcome::Solved(grid) => {
            assert_eq!(grid, CLASSIC_SOLUTION, "\n{}", render(&grid));
        }
        other => panic!("Expected a solution, got: {other:?}"),
    }
}

#[test]
fn classic_puzzle_solution_is_unique() {
    let puzzle = Puzzle::parse(CLASSIC).unwrap();
    let ctx = Context::new(&Config::new());
    let mut solver = Z3Solver::new(&ctx);
    let found = solutions(&mut solver, &puzzle, 2).unwrap();
    assert_eq!(found, vec![CLASSIC_SOLUTION]);
}

#[test]
fn empty_puzzle_yields_valid_distinct_grids() {
    let puzzle = Puzzle::empty();
    let ctx = Context::new(&Config::new());
    let mut solver = Z3Solver::new(&ctx);
    let found = solutions(&mut solver, &puzzle, 2).unwrap();
    assert_eq!(found.len(), 2);
    assert_ne!(found[0], found[1]);
    assert!(found.iter().all(|grid| is_solution(&puzzle, grid)));
}

#[test]
fn two_ones_in_first_column_is_unsatisfiable() {
    let mut grid = [[0u8; 9]; 9];
    grid[0][0] = 1;
    grid[8][0] = 1;
    let puzzle = Puzzle::from_grid(grid).unwrap();
    let ctx = Context::new(&Config::new());
    let mut solver = Z3Solver::new(&ctx);
    assert_eq!(solve(&mut solver, &puzzle).unwrap(), SudokuOutcome::Unsatisfiable);
    assert!(solutions(&mut solver, &puzzle, 3).unwrap().is_empty());
}

#[test]
fn solver_is_reusable_across_puzzles() {
    let ctx = Context::new(&Config::new());
    let mut solver = Z3Solver::new(&ctx);
    let mut conflicting = [[0u8; 9]; 9];
    conflicting[0][0] = 7;
    conflicting[0][8] = 7;
    let bad = Puzzle::from_grid(conflicting).unwrap();
    assert_eq!(solve(&mut solver, &bad).unwrap(), SudokuOutcome::Unsatisfiable);

    let good = Puzzle::parse(CLASSIC).unwrap();
    assert_eq!(
        solve(&mut solver, &good).unwrap(),
        SudokuOutcome::Solved(CLASSIC_SOLUTION)
    );
}
