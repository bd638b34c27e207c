//! Texture Tile Deduplicator Library
//!
//! Splits large texture sheets into square tiles and finds the unique ones.
//! Two tiles are the same texture when one is a rotation and/or mirror image
//! of the other, so a sheet with many rotated copies of a few tiles reduces
//! to those few tiles plus a per-cell orientation code.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`tiles`] - Fingerprinting, orientations, grid extraction and the dedup
//!   engine
//! - [`io`] - Source image loading, tile export and reports
//! - [`core`] - Configuration, error handling and the processing pipeline
//! - [`sample`] - Synthetic texture sheets with known answers
//! - [`cli`] - Command-line interface (only used by the binary)
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use texture_dedup::core::config::Config;
//! use texture_dedup::core::processor::{process_image, ProcessOptions};
//! use texture_dedup::io::PngFileSource;
//! use std::path::Path;
//! use std::sync::atomic::AtomicBool;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default()?;
//!     let options = ProcessOptions::from_config(&config).with_output_dir("out");
//!
//!     let shutdown_flag = AtomicBool::new(false);
//!     let summary = process_image(&PngFileSource, Path::new("terrain.png"), &options, &shutdown_flag)?;
//!
//!     println!("{} cells, {} unique tiles", summary.cells, summary.unique_tiles);
//!     Ok(())
//! }
//! ```
//!
//! # Using the engine directly
//!
//! ```rust
//! use image::{Rgba, RgbaImage};
//! use texture_dedup::tiles::{DedupOptions, ImageSet, Orientation};
//!
//! let sheet = RgbaImage::from_pixel(64, 32, Rgba([10, 20, 30, 255]));
//! let set = ImageSet::build(&sheet, &DedupOptions::default().with_tile_size(32));
//!
//! assert_eq!(set.cell_count(), 2);
//! assert_eq!(set.unique_count(), 1);
//! assert_eq!(set.orientations()[1], Orientation::Standard);
//! ```

pub mod cli;
pub mod core;
pub mod io;
pub mod sample;
pub mod tiles;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
