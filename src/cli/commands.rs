//! Command handlers
//!
//! This module contains the implementation of all CLI commands.

use crate::cli::progress::{
    format_bytes, format_duration, print_divider, print_error, print_header, print_info,
    print_success, print_warning, TileProgress,
};
use crate::cli::{Args, Commands};
use crate::core::config::{
    get_config_path, init_config, open_config_in_editor, Config, OutputConfig,
};
use crate::core::processor::{process_image, ProcessOptions, ProcessSummary};
use crate::io::source::{ImageSource, PngFileSource};
use crate::sample::{generate, SampleConfig};
use crate::tiles::{GridLayout, Orientation};
use anyhow::{bail, Context, Result};
use log::{error, info, warn};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use walkdir::WalkDir;

/// Run the appropriate command based on CLI arguments
pub fn run_command(args: &Args, config: &Config, shutdown_flag: Arc<AtomicBool>) -> Result<()> {
    match &args.command {
        Some(Commands::Process { input }) => {
            process_single(input, config, &shutdown_flag)?;
        }
        Some(Commands::Batch { dir, recursive }) => {
            batch_process(dir, *recursive, config, &shutdown_flag)?;
        }
        Some(Commands::Info { file }) => {
            show_image_info(file, config)?;
        }
        Some(Commands::GenerateSample {
            file,
            columns,
            rows,
            unique,
            margin,
            seed,
        }) => {
            let sample = SampleConfig {
                columns: *columns,
                rows: *rows,
                tile_size: config.tiles.size,
                unique_tiles: *unique,
                margin: *margin,
                seed: seed.unwrap_or_else(rand::random),
            };
            generate_sample(file, &sample)?;
        }
        Some(Commands::Config { path, reset }) => {
            handle_config_command(*path, *reset)?;
        }
        Some(Commands::GenerateConfig { path }) => {
            generate_config_file(path.clone())?;
        }
        Some(Commands::ShowConfig) => {
            show_config(config);
        }
        None => match &args.input {
            Some(input) => process_single(input, config, &shutdown_flag)?,
            None => {
                bail!("No input image given. Use --input <FILE> or see --help for commands.");
            }
        },
    }

    Ok(())
}

/// Process one image and print its summary
pub fn process_single(input: &Path, config: &Config, shutdown_flag: &AtomicBool) -> Result<()> {
    config.validate()?;
    print_header("Texture Tile Deduplicator");

    let options = ProcessOptions::from_config(config);
    let summary = process_image(&PngFileSource, input, &options, shutdown_flag)
        .with_context(|| format!("Failed to process {}", input.display()))?;

    print_summary(&summary);

    if config.output.open_report {
        if let Some(report) = &summary.report_path {
            if let Err(e) = open::that(report) {
                warn!("Failed to open report {}: {}", report.display(), e);
            }
        }
    }

    Ok(())
}

/// Print the result of processing one image
pub fn print_summary(summary: &ProcessSummary) {
    print_divider();
    print_success(&format!(
        "{} ({}x{})",
        summary.input.display(),
        summary.source_dimensions.0,
        summary.source_dimensions.1
    ));
    print_info(&format!("Texture cells:   {}", summary.cells));
    print_info(&format!("Unique textures: {}", summary.unique_tiles));
    print_info(&format!("Duplicate cells: {}", summary.duplicate_cells));

    for orientation in Orientation::ALL {
        let count = summary.orientation_counts[orientation.code() as usize];
        if count > 0 {
            print_info(&format!("  {:<24} {}", orientation.label(), count));
        }
    }

    print_info(&format!("Tiles written:   {}", summary.tiles_written));
    if summary.suspected_collisions > 0 {
        print_warning(&format!(
            "{} suspected hash collisions (see log)",
            summary.suspected_collisions
        ));
    }
    for failure in &summary.export_failures {
        print_error(&format!(
            "Tile {} not written: {}",
            failure.fingerprint, failure.message
        ));
    }
    if summary.interrupted {
        print_warning("Export interrupted; some tiles were not written");
    }

    if let Some(report) = &summary.report_path {
        print_success(&format!("Report: {}", report.display()));
    }
    if let Some(report) = &summary.json_report_path {
        print_success(&format!("JSON report: {}", report.display()));
    }
    for err in &summary.report_errors {
        print_error(err);
    }

    print_info(&format!("Elapsed: {}", format_duration(summary.elapsed)));
}

/// Find PNG files under `dir`, sorted by path.
///
/// Directories written by an earlier run (the output directory itself, any
/// directory holding a report, and the tile directory next to a report) are
/// not descended into, so tiles from a previous batch are never picked up as
/// new sources.
pub fn find_png_files(dir: &Path, recursive: bool, output: &OutputConfig) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(dir).follow_links(false);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let output_dir = fs::canonicalize(&output.directory).ok();

    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !is_previous_output(entry.path(), output, output_dir.as_deref())
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("png"))
                .unwrap_or(false)
        })
        .collect();

    files.sort();
    files
}

fn is_previous_output(path: &Path, output: &OutputConfig, output_dir: Option<&Path>) -> bool {
    if path.join(&output.report_file).is_file() {
        return true;
    }

    let is_tile_dir = path.file_name() == Some(std::ffi::OsStr::new(&output.images_dir))
        && path
            .parent()
            .map(|parent| parent.join(&output.report_file).is_file())
            .unwrap_or(false);
    if is_tile_dir {
        return true;
    }

    match (output_dir, fs::canonicalize(path)) {
        (Some(output_dir), Ok(path)) => path == output_dir,
        _ => false,
    }
}

/// Output subdirectory for one batch image: its path relative to the batch
/// root, without the extension
pub fn batch_output_dir(root: &Path, file: &Path, output: &Path) -> PathBuf {
    let relative = file.strip_prefix(root).unwrap_or(file);
    output.join(relative.with_extension(""))
}

/// Process every PNG under a directory, each into its own output subdirectory
pub fn batch_process(
    dir: &Path,
    recursive: bool,
    config: &Config,
    shutdown_flag: &AtomicBool,
) -> Result<()> {
    config.validate()?;

    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    print_header("Texture Tile Deduplicator - Batch");

    let files = find_png_files(dir, recursive, &config.output);
    if files.is_empty() {
        print_warning(&format!("No PNG files found in {}", dir.display()));
        return Ok(());
    }
    info!("Found {} PNG files in {}", files.len(), dir.display());

    let base = ProcessOptions::from_config(config).with_progress(false);
    let progress = TileProgress::new(files.len() as u64, "Processing images");

    let results: Vec<(PathBuf, Option<crate::core::error::Result<ProcessSummary>>)> = files
        .par_iter()
        .map(|file| {
            if shutdown_flag.load(Ordering::SeqCst) {
                return (file.clone(), None);
            }

            let options = base
                .clone()
                .with_output_dir(batch_output_dir(dir, file, &config.output.directory));
            let result = process_image(&PngFileSource, file, &options, shutdown_flag);

            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            progress.inc(&name);

            (file.clone(), Some(result))
        })
        .collect();
    progress.finish();

    print_divider();
    let mut failed = 0;
    let mut skipped = 0;
    for (file, result) in &results {
        match result {
            Some(Ok(summary)) => {
                let line = format!(
                    "{}: {} cells, {} unique, {} written",
                    file.display(),
                    summary.cells,
                    summary.unique_tiles,
                    summary.tiles_written
                );
                if summary.is_complete() {
                    print_success(&line);
                } else {
                    print_warning(&line);
                }
            }
            Some(Err(e)) => {
                failed += 1;
                error!("{}", e);
                print_error(&format!("{}: {}", file.display(), e));
            }
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        print_warning(&format!("{} images skipped after shutdown request", skipped));
    }

    if failed > 0 {
        bail!("{} of {} images failed", failed, results.len());
    }

    Ok(())
}

/// Show what a source image would turn into without processing it
pub fn show_image_info(file: &Path, config: &Config) -> Result<()> {
    let image = PngFileSource.load(file)?;
    let (width, height) = (image.width(), image.height());
    let layout = GridLayout::for_dimensions(width, height, config.tiles.size);
    let (ignored_x, ignored_y) = layout.remainder(width, height);
    let size = fs::metadata(file).map(|m| m.len()).unwrap_or(0);

    print_header("Image Info");
    print_info(&format!("File:        {}", file.display()));
    print_info(&format!("Size:        {}", format_bytes(size)));
    print_info(&format!("Dimensions:  {}x{}", width, height));
    print_info(&format!("Color type:  {:?}", image.color()));
    print_info(&format!("Tile size:   {} px", layout.tile_size));
    print_info(&format!(
        "Grid:        {} columns x {} rows ({} cells)",
        layout.columns,
        layout.rows,
        layout.cell_count()
    ));
    if ignored_x > 0 || ignored_y > 0 {
        print_warning(&format!(
            "{} px on the right and {} px at the bottom are not covered by any tile",
            ignored_x, ignored_y
        ));
    }

    Ok(())
}

/// Write a synthetic sample image
pub fn generate_sample(file: &Path, sample: &SampleConfig) -> Result<()> {
    if sample.tile_size == 0 {
        bail!("Tile size must be at least 1 pixel");
    }

    let image = generate(sample)?;
    image.save(file)?;

    print_success(&format!(
        "Wrote {} ({}x{}, {} cells, {} unique tiles, seed {})",
        file.display(),
        image.image.width(),
        image.image.height(),
        image.placements.len(),
        image.expected_unique(),
        sample.seed
    ));

    Ok(())
}

/// Handle the `config` command - open, show path, or reset the config file
pub fn handle_config_command(show_path: bool, reset: bool) -> Result<()> {
    if reset {
        let path = init_config(true)?;
        info!("Created fresh config file at: {}", path.display());
        return Ok(());
    }

    if show_path {
        let path = Config::get_active_config_path();
        println!("{}", path.display());
        if path.exists() {
            info!("Config file exists at: {}", path.display());
        } else {
            info!("Config file would be created at: {}", path.display());
        }
        return Ok(());
    }

    info!("Opening configuration file in default editor...");
    match open_config_in_editor() {
        Ok(path) => {
            info!("Config file: {}", path.display());
            info!("Run 'texture-dedup show-config' to verify your settings.");
        }
        Err(e) => {
            error!("Failed to open config file: {}", e);
            if let Some(path) = get_config_path() {
                info!("You can manually edit the config at: {}", path.display());
            }
        }
    }

    Ok(())
}

/// Generate a configuration file at the specified or default location
pub fn generate_config_file(path: Option<PathBuf>) -> Result<()> {
    let output_path = match path {
        Some(path) => {
            fs::write(&path, Config::generate_default_config())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            path
        }
        None => init_config(false)?,
    };

    info!("Configuration file: {}", output_path.display());
    info!("Edit this file to customize tile size, output and reports.");

    Ok(())
}

/// Show the current configuration settings
pub fn show_config(config: &Config) {
    let config_path = Config::get_active_config_path();
    info!("Configuration file: {}", config_path.display());
    if !config_path.exists() {
        info!("(Using default settings - no config file found)");
    }
    info!("");
    info!("Current Configuration:");
    info!("----------------------");
    info!("[tiles]");
    info!("  size = {}", config.tiles.size);
    info!("");
    info!("[dedup]");
    info!("  parallel = {}", config.dedup.parallel);
    info!("  verify_matches = {}", config.dedup.verify_matches);
    info!("");
    info!("[output]");
    info!("  directory = \"{}\"", config.output.directory.display());
    info!("  images_dir = \"{}\"", config.output.images_dir);
    info!("  report_file = \"{}\"", config.output.report_file);
    info!("  json_report = {}", config.output.json_report);
    info!("  embed_thumbnails = {}", config.output.embed_thumbnails);
    info!("  open_report = {}", config.output.open_report);
    info!("  thumbnail_size = {}", config.output.thumbnail_size);
    info!("");
    info!("[logging]");
    info!("  level = \"{}\"", config.logging.level);
    info!("  log_to_file = {}", config.logging.log_to_file);
    info!("  log_file = \"{}\"", config.logging.log_file.display());

    if let Err(e) = config.validate() {
        warn!("{}", e);
    }
}
