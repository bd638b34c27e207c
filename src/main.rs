//! Texture Tile Deduplicator - CLI Entry Point
//!
//! Splits texture sheets into tiles, keeps the unique ones under rotation and
//! mirroring, and writes the tiles plus a report.
//!
//! This binary is a thin wrapper around the library, handling argument parsing,
//! logging setup, and command dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Builder;
use log::{info, LevelFilter};
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use texture_dedup::cli::{self, Args, DualWriter};
use texture_dedup::core::config::Config;

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(ref config_path) = args.config {
        match Config::load(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Warning: Failed to load config file: {}", e);
                Config::default()
            }
        }
    } else {
        Config::load_default().unwrap_or_else(|e| {
            eprintln!("Warning: {}", e);
            Config::default()
        })
    };

    // Apply CLI overrides to config
    if let Some(ref output) = args.output {
        config.output.directory = output.clone();
    }
    if let Some(tile_size) = args.tile_size {
        config.tiles.size = tile_size;
    }
    if args.parallel {
        config.dedup.parallel = true;
    }
    if args.verify_matches {
        config.dedup.verify_matches = true;
    }
    if args.json_report {
        config.output.json_report = true;
    }
    if args.embed_thumbnails {
        config.output.embed_thumbnails = true;
    }
    if args.open_report {
        config.output.open_report = true;
    }
    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }

    // Set up graceful shutdown handler
    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_flag_clone = shutdown_flag.clone();

    ctrlc::set_handler(move || {
        if shutdown_flag_clone.load(Ordering::SeqCst) {
            eprintln!("\nForce shutdown requested. Exiting immediately...");
            std::process::exit(1);
        } else {
            shutdown_flag_clone.store(true, Ordering::SeqCst);
            eprintln!("\nGraceful shutdown requested. Finishing current tile... (Press Ctrl+C again to force quit)");
        }
    })
    .context("Failed to set Ctrl+C handler")?;

    // Initialize logger
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    if config.logging.log_to_file {
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.logging.log_file)
            .with_context(|| {
                format!(
                    "Failed to open log file {}",
                    config.logging.log_file.display()
                )
            })?;

        Builder::new()
            .filter_level(log_level)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{} {} {}] {}",
                    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                    record.level(),
                    record.target(),
                    record.args()
                )
            })
            .target(env_logger::Target::Pipe(Box::new(DualWriter {
                console: std::io::stderr(),
                file: log_file,
            })))
            .init();

        info!("Logging to file: {}", config.logging.log_file.display());
    } else {
        Builder::from_env(env_logger::Env::default().default_filter_or(&config.logging.level))
            .init();
    }

    info!("{} v{}", texture_dedup::NAME, texture_dedup::VERSION);

    cli::run_command(&args, &config, shutdown_flag)?;

    Ok(())
}
