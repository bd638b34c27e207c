//! Command-line argument definitions
//!
//! This module defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Split texture sheets into tiles and keep only the unique ones
#[derive(Parser, Debug)]
#[command(name = "texture-dedup")]
#[command(author = "Vihaan Reddy M")]
#[command(version = "1.0.0")]
#[command(about = "Find the unique tiles of a texture sheet, treating rotated and mirrored copies as duplicates", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Source PNG to process when no subcommand is given
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output directory for tiles and reports (overrides config)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Tile edge length in pixels (overrides config)
    #[arg(short, long, global = true)]
    pub tile_size: Option<u32>,

    /// Fingerprint tiles on all CPU cores (overrides config)
    #[arg(long, global = true)]
    pub parallel: bool,

    /// Compare pixels of fingerprint matches and report suspected collisions
    #[arg(long, global = true)]
    pub verify_matches: bool,

    /// Also write the report as JSON
    #[arg(long, global = true)]
    pub json_report: bool,

    /// Embed thumbnails in the HTML report instead of linking tile files
    #[arg(long, global = true)]
    pub embed_thumbnails: bool,

    /// Open the HTML report when done
    #[arg(long, global = true)]
    pub open_report: bool,

    /// Log level: error, warn, info, debug, trace (overrides config)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deduplicate the tiles of one source image
    Process {
        /// Source PNG image
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Process every PNG under a directory
    ///
    /// Each image gets its own subdirectory of the output directory, named
    /// after the image file.
    Batch {
        /// Directory to scan for PNG files
        dir: PathBuf,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
    },

    /// Show the dimensions of an image and the tile grid it would produce
    Info {
        /// Source PNG image
        file: PathBuf,
    },

    /// Write a synthetic texture sheet with a known number of unique tiles
    GenerateSample {
        /// Output PNG path
        #[arg(default_value = "sample.png")]
        file: PathBuf,

        /// Cells per row
        #[arg(long, default_value = "8")]
        columns: u32,

        /// Cells per column
        #[arg(long, default_value = "8")]
        rows: u32,

        /// Number of distinct tiles
        #[arg(short, long, default_value = "12")]
        unique: usize,

        /// Extra pixels on the right and bottom edges
        #[arg(long, default_value = "0")]
        margin: u32,

        /// Seed for reproducible generation
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Open the configuration file in your default editor
    ///
    /// If no config file exists, a default one will be created.
    Config {
        /// Show the config file path without opening it
        #[arg(long)]
        path: bool,

        /// Reset config to defaults (creates a fresh config file)
        #[arg(long)]
        reset: bool,
    },

    /// Generate a configuration file at a specific location
    GenerateConfig {
        /// Output path for the config file (defaults to standard location)
        #[arg(long = "to", value_name = "PATH")]
        path: Option<PathBuf>,
    },

    /// Show current configuration
    ShowConfig,
}
