//! Snapshot persistence and initial-grid loading.
//!
//! The controller only depends on the [`SnapshotStore`] and [`GridSource`]
//! traits. [`pgm::PgmStore`] backs them with PGM image files;
//! [`memory::MemoryStore`] keeps everything in memory.

pub mod memory;
pub mod pgm;

use crate::models::{Grid, Snapshot};
use crate::session::control::BoxFuture;
use crate::Result;

/// Writes snapshots out.
pub trait SnapshotStore: Send + Sync {
    /// Persist `snapshot` and resolve with the label it was stored under,
    /// only once the write has completed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Persistence` if the snapshot cannot be written.
    fn persist<'a>(&'a self, snapshot: &'a Snapshot) -> BoxFuture<'a, Result<String>>;
}

/// Supplies the initial grid of a run.
pub trait GridSource: Send + Sync {
    /// Load the `width × height` starting grid.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Persistence` if no matching grid can be read.
    fn load(&self, width: usize, height: usize) -> BoxFuture<'_, Result<Grid>>;
}

pub use memory::MemoryStore;
pub use pgm::PgmStore;
