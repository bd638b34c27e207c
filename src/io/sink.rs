//! Exporting unique tiles
//!
//! Each prototype is persisted as its own artifact named by its hex
//! fingerprint, so reports can reference tiles by the same key the engine
//! uses. Exporting is best-effort: a failed tile is recorded and logged, and
//! tiles already written stay in place.

use crate::core::error::{Result, TileError};
use crate::tiles::{Fingerprint, ImageSet};
use image::{ImageFormat, RgbaImage};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Destination for unique tiles
pub trait TileSink {
    /// Prepare the destination before the first tile is written.
    ///
    /// A failure here is reported but does not stop the export; every tile
    /// write is still attempted.
    fn prepare(&mut self) -> Result<()> {
        Ok(())
    }

    /// Persist one tile, returning where it was written
    fn write_tile(&mut self, fingerprint: Fingerprint, tile: &RgbaImage) -> Result<PathBuf>;
}

/// Writes tiles as `<dir>/<hex>.png`
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Create a sink writing into `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory tiles are written to
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a tile with this fingerprint is written to
    pub fn tile_path(&self, fingerprint: Fingerprint) -> PathBuf {
        self.dir.join(fingerprint.file_name())
    }
}

impl TileSink for DirectorySink {
    fn prepare(&mut self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            TileError::IoError(format!(
                "Failed to create images directory {}: {}",
                self.dir.display(),
                e
            ))
        })
    }

    fn write_tile(&mut self, fingerprint: Fingerprint, tile: &RgbaImage) -> Result<PathBuf> {
        let path = self.tile_path(fingerprint);

        tile.save_with_format(&path, ImageFormat::Png)
            .map_err(|e| TileError::ExportFailed {
                name: fingerprint.file_name(),
                message: e.to_string(),
            })?;

        Ok(path)
    }
}

/// Keeps tiles in memory; can be told to fail specific fingerprints
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    /// Tiles written so far
    pub tiles: HashMap<Fingerprint, RgbaImage>,
    fail_on: HashSet<Fingerprint>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Make writes of this fingerprint fail
    pub fn failing_on(mut self, fingerprint: Fingerprint) -> Self {
        self.fail_on.insert(fingerprint);
        self
    }
}

impl TileSink for MemorySink {
    fn write_tile(&mut self, fingerprint: Fingerprint, tile: &RgbaImage) -> Result<PathBuf> {
        if self.fail_on.contains(&fingerprint) {
            return Err(TileError::ExportFailed {
                name: fingerprint.file_name(),
                message: "simulated write failure".to_string(),
            });
        }

        self.tiles.insert(fingerprint, tile.clone());
        Ok(PathBuf::from(fingerprint.file_name()))
    }
}

/// A tile that could not be exported
#[derive(Debug, Clone)]
pub struct ExportFailure {
    /// Fingerprint of the tile
    pub fingerprint: Fingerprint,
    /// Why the write failed
    pub message: String,
}

/// Outcome of exporting the unique tiles
#[derive(Debug, Clone, Default)]
pub struct ExportStats {
    /// Tiles successfully written
    pub written: Vec<(Fingerprint, PathBuf)>,
    /// Tiles that failed
    pub failures: Vec<ExportFailure>,
    /// Export stopped early on a shutdown request
    pub interrupted: bool,
}

impl ExportStats {
    /// Whether every tile was written
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && !self.interrupted
    }
}

/// Write every prototype of `set` to `sink` in first-sighting order.
///
/// `on_tile` is called after each attempted tile with the number attempted so
/// far. The shutdown flag is checked between tiles.
pub fn export_prototypes<S, F>(
    set: &ImageSet,
    sink: &mut S,
    shutdown_flag: &AtomicBool,
    mut on_tile: F,
) -> ExportStats
where
    S: TileSink + ?Sized,
    F: FnMut(usize),
{
    let mut stats = ExportStats::default();

    if let Err(e) = sink.prepare() {
        warn!("{}", e);
    }

    for (i, prototype) in set.prototypes().iter().enumerate() {
        if shutdown_flag.load(Ordering::SeqCst) {
            info!(
                "Export interrupted after {} of {} tiles",
                i,
                set.unique_count()
            );
            stats.interrupted = true;
            break;
        }

        match sink.write_tile(prototype.fingerprint, &prototype.image) {
            Ok(path) => {
                debug!("Wrote tile {}", path.display());
                stats.written.push((prototype.fingerprint, path));
            }
            Err(e) => {
                warn!("{}", e);
                stats.failures.push(ExportFailure {
                    fingerprint: prototype.fingerprint,
                    message: e.to_string(),
                });
            }
        }

        on_tile(i + 1);
    }

    info!(
        "Exported {} of {} unique tiles ({} failed)",
        stats.written.len(),
        set.unique_count(),
        stats.failures.len()
    );

    stats
}
