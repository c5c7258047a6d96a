//! Outward event stream consumed by the controller's event sink.

use serde::Serialize;

use crate::models::grid::Cell;
use crate::models::run::RunPhase;

/// Events emitted by a controller session, in turn order.
///
/// `RunFinished` is emitted exactly once per session and is the last event
/// that concerns the computation; only the terminal `StateChange` follows it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A cell changed state at `turn`.
    CellFlipped {
        /// Turn the flip belongs to.
        turn: usize,
        /// Cell that flipped.
        cell: Cell,
    },
    /// Periodic progress report.
    AliveCellsCount {
        /// Completed turns at the time of the poll.
        turn: usize,
        /// Live cells at that turn.
        count: usize,
    },
    /// The run moved to a new phase.
    StateChange {
        /// Completed turns at the time of the change.
        turn: usize,
        /// Phase entered.
        new_phase: RunPhase,
    },
    /// A snapshot was written by the persistence collaborator.
    SnapshotPersisted {
        /// Turn the snapshot reflects.
        turn: usize,
        /// Name the snapshot was stored under.
        label: String,
    },
    /// The run ended, naturally or by quit.
    RunFinished {
        /// Completed turns.
        turn: usize,
        /// Cells alive in the final grid.
        alive_cells: Vec<Cell>,
    },
}

impl Event {
    /// Turn the event refers to.
    #[must_use]
    pub fn turn(&self) -> usize {
        match self {
            Self::CellFlipped { turn, .. }
            | Self::AliveCellsCount { turn, .. }
            | Self::StateChange { turn, .. }
            | Self::SnapshotPersisted { turn, .. }
            | Self::RunFinished { turn, .. } => *turn,
        }
    }
}
