//! Binary PGM (`P5`) images as grid storage.
//!
//! One byte per pixel, row-major, max value 255: exactly the in-memory grid
//! layout. Pixels equal to 255 are alive, anything else is dead.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::models::{Grid, Snapshot, ALIVE, DEAD};
use crate::persistence::{GridSource, SnapshotStore};
use crate::session::control::BoxFuture;
use crate::{AppError, Result};

/// Encode `grid` as a binary PGM image.
#[must_use]
pub fn encode(grid: &Grid) -> Vec<u8> {
    let header = format!("P5\n{} {}\n255\n", grid.width(), grid.height());
    let mut out = Vec::with_capacity(header.len() + grid.cells().len());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(grid.cells());
    out
}

/// Decode a binary PGM image into a grid.
///
/// # Errors
///
/// Returns `AppError::Persistence` if the header is not a `P5` header with
/// max value 255, or the raster is shorter than the header promises.
pub fn decode(bytes: &[u8]) -> Result<Grid> {
    let mut pos = 0;
    let magic = next_token(bytes, &mut pos)?;
    if magic != b"P5" {
        return Err(AppError::Persistence(format!(
            "unsupported image magic '{}'",
            String::from_utf8_lossy(magic)
        )));
    }
    let width = parse_number(next_token(bytes, &mut pos)?)?;
    let height = parse_number(next_token(bytes, &mut pos)?)?;
    let maxval = parse_number(next_token(bytes, &mut pos)?)?;
    if maxval != 255 {
        return Err(AppError::Persistence(format!(
            "unsupported max value {maxval}"
        )));
    }
    // Exactly one whitespace byte separates the header from the raster.
    pos += 1;

    let len = width
        .checked_mul(height)
        .ok_or_else(|| AppError::Persistence(format!("image of {width}x{height} is too large")))?;
    let raster = pos
        .checked_add(len)
        .and_then(|end| bytes.get(pos..end))
        .ok_or_else(|| AppError::Persistence(format!("raster shorter than {len} bytes")))?;
    let cells = raster
        .iter()
        .map(|&px| if px == ALIVE { ALIVE } else { DEAD })
        .collect();
    Grid::from_cells(width, height, cells)
}

fn next_token<'a>(bytes: &'a [u8], pos: &mut usize) -> Result<&'a [u8]> {
    loop {
        while bytes.get(*pos).is_some_and(u8::is_ascii_whitespace) {
            *pos += 1;
        }
        if bytes.get(*pos) == Some(&b'#') {
            while bytes.get(*pos).is_some_and(|&b| b != b'\n') {
                *pos += 1;
            }
            continue;
        }
        break;
    }
    let start = *pos;
    while bytes.get(*pos).is_some_and(|b| !b.is_ascii_whitespace()) {
        *pos += 1;
    }
    if start == *pos {
        return Err(AppError::Persistence("truncated image header".into()));
    }
    Ok(&bytes[start..*pos])
}

fn parse_number(token: &[u8]) -> Result<usize> {
    std::str::from_utf8(token)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            AppError::Persistence(format!(
                "invalid header number '{}'",
                String::from_utf8_lossy(token)
            ))
        })
}

/// Reads `<image_dir>/<width>x<height>.pgm` and writes
/// `<out_dir>/<label>.pgm`.
#[derive(Debug, Clone)]
pub struct PgmStore {
    image_dir: PathBuf,
    out_dir: PathBuf,
}

impl PgmStore {
    /// Store reading from `image_dir` and writing into `out_dir`.
    #[must_use]
    pub fn new(image_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            image_dir: image_dir.into(),
            out_dir: out_dir.into(),
        }
    }

    /// Path an input grid of the given size is read from.
    #[must_use]
    pub fn input_path(&self, width: usize, height: usize) -> PathBuf {
        self.image_dir.join(format!("{width}x{height}.pgm"))
    }

    /// Path a snapshot with `label` is written to.
    #[must_use]
    pub fn output_path(&self, label: &str) -> PathBuf {
        self.out_dir.join(format!("{label}.pgm"))
    }

    /// Directory snapshots are written into.
    #[must_use]
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

impl SnapshotStore for PgmStore {
    fn persist<'a>(&'a self, snapshot: &'a Snapshot) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let label = snapshot.label();
            let path = self.output_path(&label);
            tokio::fs::create_dir_all(&self.out_dir).await.map_err(|err| {
                AppError::Persistence(format!(
                    "failed to create {}: {err}",
                    self.out_dir.display()
                ))
            })?;
            tokio::fs::write(&path, encode(&snapshot.grid))
                .await
                .map_err(|err| {
                    AppError::Persistence(format!("failed to write {}: {err}", path.display()))
                })?;
            info!(path = %path.display(), turn = snapshot.current_turn, "snapshot written");
            Ok(label)
        })
    }
}

impl GridSource for PgmStore {
    fn load(&self, width: usize, height: usize) -> BoxFuture<'_, Result<Grid>> {
        Box::pin(async move {
            let path = self.input_path(width, height);
            let bytes = tokio::fs::read(&path).await.map_err(|err| {
                AppError::Persistence(format!("failed to read {}: {err}", path.display()))
            })?;
            let grid = decode(&bytes)?;
            if grid.width() != width || grid.height() != height {
                return Err(AppError::Persistence(format!(
                    "{} is {}x{}, expected {width}x{height}",
                    path.display(),
                    grid.width(),
                    grid.height()
                )));
            }
            debug!(path = %path.display(), "input grid loaded");
            Ok(grid)
        })
    }
}
