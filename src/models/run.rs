//! Run parameters, lifecycle phases and the values handed back to callers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::grid::Grid;
use crate::{AppError, Result};

/// Parameters fixed for the lifetime of one run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Params {
    /// Total generations requested.
    pub turns: usize,
    /// Grid width in cells.
    pub width: usize,
    /// Grid height in cells.
    pub height: usize,
}

impl Params {
    /// Construct parameters without validating them.
    #[must_use]
    pub const fn new(turns: usize, width: usize, height: usize) -> Self {
        Self {
            turns,
            width,
            height,
        }
    }

    /// Reject non-positive dimensions or turn counts.
    ///
    /// # Errors
    ///
    /// Returns `AppError::MalformedParams` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(AppError::MalformedParams(format!(
                "dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.turns == 0 {
            return Err(AppError::MalformedParams(
                "turns must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Check that `grid` has exactly the dimensions these parameters name.
    ///
    /// # Errors
    ///
    /// Returns `AppError::MalformedParams` on a size mismatch.
    pub fn ensure_matches(&self, grid: &Grid) -> Result<()> {
        if grid.width() != self.width || grid.height() != self.height {
            return Err(AppError::MalformedParams(format!(
                "grid is {}x{} but params name {}x{}",
                grid.width(),
                grid.height(),
                self.width,
                self.height
            )));
        }
        Ok(())
    }
}

/// Phase of the run owned by the coordinator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Turns are advancing.
    Running,
    /// Turn advancement halted at a turn boundary.
    Paused,
    /// Quit requested; the loop stops at the next boundary.
    Quitting,
    /// Loop exited; final snapshot produced.
    Completed,
}

impl RunPhase {
    /// Lower-case label used in logs and on the console.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Quitting => "quitting",
            Self::Completed => "completed",
        }
    }
}

/// Immutable copy of a grid at a committed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Grid as of `current_turn`. Never mutated after the snapshot is taken.
    pub grid: Arc<Grid>,
    /// Number of completed turns the grid reflects.
    pub current_turn: usize,
}

impl Snapshot {
    /// Snapshot of `grid` at `current_turn`.
    #[must_use]
    pub fn new(grid: Arc<Grid>, current_turn: usize) -> Self {
        Self { grid, current_turn }
    }

    /// Zeroed snapshot returned when no run is active.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Arc::new(Grid::empty()), 0)
    }

    /// Persisted name: `"{width}x{height}x{turn}"`.
    #[must_use]
    pub fn label(&self) -> String {
        snapshot_label(self.grid.width(), self.grid.height(), self.current_turn)
    }
}

/// Build the persisted name for a grid of the given size at `turn`.
#[must_use]
pub fn snapshot_label(width: usize, height: usize, turn: usize) -> String {
    format!("{width}x{height}x{turn}")
}

/// Progress of the most recently committed turn.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Progress {
    /// Live cells in the committed grid.
    pub alive_count: usize,
    /// Completed turns.
    pub current_turn: usize,
}
