//! Unit tests for PGM-backed persistence and the in-memory store.

use std::sync::Arc;

use life_remote::models::{Cell, Grid, Snapshot};
use life_remote::persistence::{pgm, GridSource, MemoryStore, PgmStore, SnapshotStore};
use life_remote::AppError;

fn sample_grid() -> Grid {
    Grid::from_alive_cells(16, 16, &[Cell::new(0, 0), Cell::new(15, 3), Cell::new(7, 15)]).unwrap()
}

#[tokio::test]
async fn persist_writes_labelled_image() {
    let dir = tempfile::tempdir().unwrap();
    let store = PgmStore::new(dir.path().join("images"), dir.path().join("out"));
    let snapshot = Snapshot::new(Arc::new(sample_grid()), 3);

    let label = store.persist(&snapshot).await.unwrap();

    assert_eq!(label, "16x16x3");
    let written = std::fs::read(dir.path().join("out").join("16x16x3.pgm")).unwrap();
    assert!(written.starts_with(b"P5\n16 16\n255\n"));
    assert_eq!(pgm::decode(&written).unwrap(), sample_grid());
}

#[tokio::test]
async fn load_reads_sized_input() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("16x16.pgm"), pgm::encode(&sample_grid())).unwrap();
    let store = PgmStore::new(dir.path(), dir.path().join("out"));

    let grid = store.load(16, 16).await.unwrap();
    assert_eq!(grid, sample_grid());
}

#[tokio::test]
async fn load_missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = PgmStore::new(dir.path(), dir.path());

    let err = store.load(64, 64).await.unwrap_err();
    assert!(matches!(err, AppError::Persistence(_)), "got {err:?}");
}

#[tokio::test]
async fn load_rejects_mismatched_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("32x32.pgm"), pgm::encode(&sample_grid())).unwrap();
    let store = PgmStore::new(dir.path(), dir.path());

    let err = store.load(32, 32).await.unwrap_err();
    assert!(matches!(err, AppError::Persistence(_)));
}

#[tokio::test]
async fn memory_store_keeps_inputs_and_saves() {
    let store = MemoryStore::with_input(sample_grid());
    assert_eq!(store.load(16, 16).await.unwrap(), sample_grid());
    assert!(store.load(8, 8).await.is_err());

    let snapshot = Snapshot::new(Arc::new(sample_grid()), 9);
    assert_eq!(store.persist(&snapshot).await.unwrap(), "16x16x9");
    let saved = store.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].0, "16x16x9");
    assert_eq!(saved[0].1, snapshot);
}
