//! In-memory store used for tests and dry runs.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::models::{Grid, Snapshot};
use crate::persistence::{GridSource, SnapshotStore};
use crate::session::control::BoxFuture;
use crate::{AppError, Result};

/// Keeps seeded input grids keyed by size, and persisted snapshots in the
/// order they were written.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inputs: Mutex<HashMap<(usize, usize), Grid>>,
    saved: Mutex<Vec<(String, Snapshot)>>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with one input grid.
    #[must_use]
    pub fn with_input(grid: Grid) -> Self {
        let store = Self::new();
        store.insert_input(grid);
        store
    }

    /// Register `grid` as the input for its dimensions.
    pub fn insert_input(&self, grid: Grid) {
        self.inputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((grid.width(), grid.height()), grid);
    }

    /// Labels and snapshots persisted so far, oldest first.
    #[must_use]
    pub fn saved(&self) -> Vec<(String, Snapshot)> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SnapshotStore for MemoryStore {
    fn persist<'a>(&'a self, snapshot: &'a Snapshot) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let label = snapshot.label();
            self.saved
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((label.clone(), snapshot.clone()));
            Ok(label)
        })
    }
}

impl GridSource for MemoryStore {
    fn load(&self, width: usize, height: usize) -> BoxFuture<'_, Result<Grid>> {
        Box::pin(async move {
            self.inputs
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&(width, height))
                .cloned()
                .ok_or_else(|| AppError::Persistence(format!("no {width}x{height} input grid")))
        })
    }
}
