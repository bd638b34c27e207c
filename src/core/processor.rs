//! Single-image processing pipeline
//!
//! Runs one source image through the whole workflow:
//! 1. Load and decode the source (failure ends the run, nothing is written)
//! 2. Deduplicate its tile grid
//! 3. Export every unique tile (per-tile failures are collected)
//! 4. Write the HTML report and, optionally, the JSON report
//!
//! Only a load failure is returned as an error. Export and report problems are
//! logged and recorded in the [`ProcessSummary`], since the dedup result
//! itself is still valid.

use crate::core::config::{Config, OutputConfig};
use crate::core::error::{Result, TileError};
use crate::core::progress::TileProgress;
use crate::io::report::{thumbnail_data_urls, write_html_report, write_json_report, ReportData};
use crate::io::sink::{export_prototypes, DirectorySink, ExportFailure};
use crate::io::source::ImageSource;
use crate::tiles::{DedupOptions, ImageSet, ORIENTATION_COUNT};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

/// Options for processing one image
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Dedup engine options
    pub dedup: DedupOptions,
    /// Where and what to write
    pub output: OutputConfig,
    /// Draw progress bars
    pub show_progress: bool,
}

impl ProcessOptions {
    /// Options described by a configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            dedup: config.to_dedup_options(),
            output: config.output.clone(),
            show_progress: true,
        }
    }

    /// Write into a different output directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output.directory = dir.into();
        self
    }

    /// Enable or disable progress bars
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }
}

/// Outcome of processing one image
#[derive(Debug, Clone, Default)]
pub struct ProcessSummary {
    /// Source image path
    pub input: PathBuf,
    /// Source image width and height
    pub source_dimensions: (u32, u32),
    /// Grid cells processed
    pub cells: usize,
    /// Unique tiles found
    pub unique_tiles: usize,
    /// Cells that reused an earlier tile
    pub duplicate_cells: usize,
    /// Cells per orientation code
    pub orientation_counts: [usize; ORIENTATION_COUNT],
    /// Fingerprint matches whose pixels differed
    pub suspected_collisions: usize,
    /// Tiles written to the images directory
    pub tiles_written: usize,
    /// Tiles that could not be written
    pub export_failures: Vec<ExportFailure>,
    /// Export stopped on a shutdown request
    pub interrupted: bool,
    /// HTML report, when written
    pub report_path: Option<PathBuf>,
    /// JSON report, when written
    pub json_report_path: Option<PathBuf>,
    /// Report errors, if any
    pub report_errors: Vec<String>,
    /// Wall-clock time of the whole run
    pub elapsed: Duration,
}

impl ProcessSummary {
    /// Whether every artifact was produced
    pub fn is_complete(&self) -> bool {
        self.export_failures.is_empty() && !self.interrupted && self.report_errors.is_empty()
    }
}

fn tracker(show: bool, label: &'static str) -> TileProgress {
    if show {
        TileProgress::new(0, label)
    } else {
        TileProgress::hidden(0, label)
    }
}

/// Process one source image end to end.
///
/// Returns an error only when the source cannot be loaded or the tile size is
/// zero; in both cases no artifacts are written.
pub fn process_image<S>(
    source: &S,
    input: &Path,
    options: &ProcessOptions,
    shutdown_flag: &AtomicBool,
) -> Result<ProcessSummary>
where
    S: ImageSource + ?Sized,
{
    let start_time = Instant::now();

    if options.dedup.tile_size == 0 {
        return Err(TileError::InvalidTileSize(0));
    }

    info!("Processing {}", input.display());

    let cell_progress = tracker(options.show_progress, "Fingerprinting cells");
    let set = match ImageSet::load(source, input, &options.dedup, |p| {
        if p.current == 1 {
            cell_progress.set_length(p.total as u64);
        }
        cell_progress.update(p.current, p.unique);
    }) {
        Ok(set) => set,
        Err(e) => {
            cell_progress.finish_with_error("Failed to load source image");
            error!("{}", e);
            return Err(e);
        }
    };
    cell_progress.finish();

    let stats = set.stats();
    let mut summary = ProcessSummary {
        input: input.to_path_buf(),
        source_dimensions: set.source_dimensions(),
        cells: stats.cells,
        unique_tiles: stats.unique_tiles,
        duplicate_cells: stats.duplicate_cells,
        orientation_counts: stats.orientation_counts,
        suspected_collisions: stats.suspected_collisions,
        ..Default::default()
    };

    // Export unique tiles
    let export_progress = tracker(options.show_progress, "Exporting tiles");
    export_progress.set_length(set.unique_count() as u64);
    let mut sink = DirectorySink::new(options.output.images_path());
    let export = export_prototypes(&set, &mut sink, shutdown_flag, |n| {
        export_progress.set_position(n)
    });
    if export.interrupted {
        export_progress.finish_with_error("Interrupted");
    } else {
        export_progress.finish();
    }

    summary.tiles_written = export.written.len();
    summary.export_failures = export.failures;
    summary.interrupted = export.interrupted;

    // Reports
    write_reports(&set, input, &options.output, &mut summary);

    summary.elapsed = start_time.elapsed();
    info!(
        "Finished {}: {} cells, {} unique tiles, {} written in {:?}",
        input.display(),
        summary.cells,
        summary.unique_tiles,
        summary.tiles_written,
        summary.elapsed
    );

    Ok(summary)
}

fn write_reports(set: &ImageSet, input: &Path, output: &OutputConfig, summary: &mut ProcessSummary) {
    let report_path = output.report_path();
    let report_dir = match report_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let data =
        ReportData::from_image_set(set, input, &output.images_dir).with_report_dir(&report_dir);

    let thumbnails = if output.embed_thumbnails {
        match thumbnail_data_urls(set, output.thumbnail_size) {
            Ok(urls) => Some(urls),
            Err(e) => {
                warn!("Falling back to linked thumbnails: {}", e);
                None
            }
        }
    } else {
        None
    };

    match write_html_report(&report_path, &data, thumbnails.as_ref(), output.thumbnail_size) {
        Ok(()) => {
            info!("Wrote report {}", report_path.display());
            summary.report_path = Some(report_path);
        }
        Err(e) => {
            warn!("{}", e);
            summary.report_errors.push(e.to_string());
        }
    }

    if output.json_report {
        let json_path = output.json_report_path();
        match write_json_report(&json_path, &data) {
            Ok(()) => {
                info!("Wrote JSON report {}", json_path.display());
                summary.json_report_path = Some(json_path);
            }
            Err(e) => {
                warn!("{}", e);
                summary.report_errors.push(e.to_string());
            }
        }
    }
}
