//! Game of Life step rule.
//!
//! Everything here is pure: functions take a grid by reference and return
//! new values, so the coordinator can run them with no lock held.

use crate::models::{Cell, Grid, ALIVE, DEAD};

/// Compute the next generation of `grid`.
///
/// Adjacency wraps around both edges. A live cell survives with two or three
/// live neighbours; a dead cell becomes alive with exactly three.
#[must_use]
pub fn step(grid: &Grid) -> Grid {
    let (width, height) = (grid.width(), grid.height());
    let mut next = Vec::with_capacity(width * height);

    for y in 0..height {
        for x in 0..width {
            let neighbours = live_neighbours(grid, x, y);
            let alive = grid.is_alive(x, y);
            let next_alive = matches!((alive, neighbours), (true, 2 | 3) | (false, 3));
            next.push(if next_alive { ALIVE } else { DEAD });
        }
    }

    Grid::from_generation(width, height, next)
}

/// Advance `grid` by `turns` generations.
#[must_use]
pub fn step_n(grid: &Grid, turns: usize) -> Grid {
    let mut current = grid.clone();
    for _ in 0..turns {
        current = step(&current);
    }
    current
}

/// Number of live cells in `grid`.
#[must_use]
pub fn alive_count(grid: &Grid) -> usize {
    grid.cells().iter().filter(|&&c| c == ALIVE).count()
}

/// Live cells in row-major order.
#[must_use]
pub fn alive_cells(grid: &Grid) -> Vec<Cell> {
    let width = grid.width();
    grid.cells()
        .iter()
        .enumerate()
        .filter(|(_, &c)| c == ALIVE)
        .map(|(i, _)| Cell::new(i % width, i / width))
        .collect()
}

fn live_neighbours(grid: &Grid, x: usize, y: usize) -> usize {
    let (width, height) = (grid.width(), grid.height());
    let mut count = 0;
    for dy in -1isize..=1 {
        for dx in -1isize..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let nx = (x + width).wrapping_add_signed(dx) % width;
            let ny = (y + height).wrapping_add_signed(dy) % height;
            if grid.is_alive(nx, ny) {
                count += 1;
            }
        }
    }
    count
}
