//! Unit tests for the step rule.
//!
//! Covers still lifes, oscillators, gliders crossing the torus edge and
//! the alive-cell helpers.

use life_remote::engine;
use life_remote::models::{Cell, Grid};

fn grid_with(width: usize, height: usize, alive: &[(usize, usize)]) -> Grid {
    let cells: Vec<Cell> = alive.iter().map(|&(x, y)| Cell::new(x, y)).collect();
    Grid::from_alive_cells(width, height, &cells).unwrap()
}

fn glider(width: usize, height: usize) -> Grid {
    grid_with(width, height, &[(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)])
}

#[test]
fn all_dead_grid_stays_dead() {
    let grid = Grid::new(16, 16);
    let next = engine::step_n(&grid, 25);
    assert_eq!(next, grid);
    assert_eq!(engine::alive_count(&next), 0);
}

#[test]
fn blinker_has_period_two() {
    let horizontal = grid_with(5, 5, &[(1, 2), (2, 2), (3, 2)]);
    let vertical = grid_with(5, 5, &[(2, 1), (2, 2), (2, 3)]);

    let mut current = horizontal.clone();
    for generation in 1..=10 {
        current = engine::step(&current);
        let expected = if generation % 2 == 1 {
            &vertical
        } else {
            &horizontal
        };
        assert_eq!(&current, expected, "generation {generation}");
    }
}

#[test]
fn glider_keeps_five_cells_and_wraps_home() {
    let start = glider(16, 16);
    let mut current = start.clone();
    for _ in 0..64 {
        current = engine::step(&current);
        assert_eq!(engine::alive_count(&current), 5);
    }
    // Four generations move it one cell diagonally; 64 cross the whole board.
    assert_eq!(current, start);
}

#[test]
fn glider_translates_diagonally() {
    let moved = engine::step_n(&glider(8, 8), 4);
    let expected = grid_with(8, 8, &[(2, 1), (3, 2), (1, 3), (2, 3), (3, 3)]);
    assert_eq!(moved, expected);
}

#[test]
fn neighbours_wrap_across_corners() {
    // A block split over the four corners is still a block.
    let block = grid_with(6, 6, &[(0, 0), (5, 0), (0, 5), (5, 5)]);
    assert_eq!(engine::step(&block), block);
}

#[test]
fn overcrowded_cell_dies() {
    let grid = grid_with(5, 5, &[(2, 2), (1, 1), (2, 1), (3, 1), (1, 2)]);
    let next = engine::step(&grid);
    assert!(!next.is_alive(2, 2));
}

#[test]
fn alive_cells_are_row_major() {
    let grid = grid_with(4, 3, &[(3, 0), (0, 2), (1, 0)]);
    assert_eq!(
        engine::alive_cells(&grid),
        vec![Cell::new(1, 0), Cell::new(3, 0), Cell::new(0, 2)]
    );
}

#[test]
fn step_n_zero_is_identity() {
    let grid = glider(10, 10);
    assert_eq!(engine::step_n(&grid, 0), grid);
}
