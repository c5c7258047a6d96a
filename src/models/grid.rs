//! Cell grid shared by the engine, the coordinator and persistence.

use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

/// Byte value of a live cell.
pub const ALIVE: u8 = 255;
/// Byte value of a dead cell.
pub const DEAD: u8 = 0;

/// Coordinate of a single cell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    /// Column, `0..width`.
    pub x: usize,
    /// Row, `0..height`.
    pub y: usize,
}

impl Cell {
    /// Construct a cell coordinate.
    #[must_use]
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Rectangular toroidal grid, stored row-major with one byte per cell.
///
/// A grid is never mutated once built; the engine allocates a fresh one for
/// every generation so it can be shared freely behind an `Arc`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "GridRepr")]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

#[derive(Deserialize)]
struct GridRepr {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl TryFrom<GridRepr> for Grid {
    type Error = AppError;

    fn try_from(repr: GridRepr) -> Result<Self> {
        Self::from_cells(repr.width, repr.height, repr.cells)
    }
}

/// Number of cells in a `width` by `height` grid.
///
/// # Errors
///
/// Returns `AppError::MalformedParams` if the product overflows `usize`.
pub fn cell_count(width: usize, height: usize) -> Result<usize> {
    width.checked_mul(height).ok_or_else(|| {
        AppError::MalformedParams(format!("grid of {width}x{height} overflows usize"))
    })
}

impl Grid {
    /// All-dead grid of the given size.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        let Some(len) = width.checked_mul(height) else {
            panic!("grid of {width}x{height} overflows usize");
        };
        Self {
            width,
            height,
            cells: vec![DEAD; len],
        }
    }

    /// Zero-sized grid, used in responses when no run is active.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(0, 0)
    }

    /// Build a grid from a row-major byte buffer.
    ///
    /// # Errors
    ///
    /// Returns `AppError::MalformedParams` if `cells.len() != width * height`
    /// or the product overflows.
    pub fn from_cells(width: usize, height: usize, cells: Vec<u8>) -> Result<Self> {
        let len = cell_count(width, height)?;
        if cells.len() != len {
            return Err(AppError::MalformedParams(format!(
                "grid of {width}x{height} needs {len} cells, got {}",
                cells.len()
            )));
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Wrap a buffer the caller has already sized to `width * height`.
    pub(crate) fn from_generation(width: usize, height: usize, cells: Vec<u8>) -> Self {
        debug_assert_eq!(cells.len(), width * height);
        Self {
            width,
            height,
            cells,
        }
    }

    /// Build a grid with exactly the listed cells alive.
    ///
    /// # Errors
    ///
    /// Returns `AppError::MalformedParams` if any cell lies outside the grid
    /// or `width * height` overflows.
    pub fn from_alive_cells(width: usize, height: usize, alive: &[Cell]) -> Result<Self> {
        let mut cells = vec![DEAD; cell_count(width, height)?];
        for cell in alive {
            if cell.x >= width || cell.y >= height {
                return Err(AppError::MalformedParams(format!(
                    "cell ({}, {}) outside {width}x{height} grid",
                    cell.x, cell.y
                )));
            }
            cells[cell.y * width + cell.x] = ALIVE;
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the grid has no cells at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Raw cell value at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate lies outside the grid.
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.cells[y * self.width + x]
    }

    /// Whether the cell at `(x, y)` is alive.
    #[must_use]
    pub fn is_alive(&self, x: usize, y: usize) -> bool {
        self.get(x, y) == ALIVE
    }

    /// Row-major cell bytes.
    #[must_use]
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// One row of cells.
    #[must_use]
    pub fn row(&self, y: usize) -> &[u8] {
        &self.cells[y * self.width..(y + 1) * self.width]
    }
}
