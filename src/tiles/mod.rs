//! Tile deduplication module
//!
//! This module splits a source image into square tiles and finds the unique
//! ones, treating two tiles as equal when one is a rotation and/or mirror
//! image of the other.
//!
//! # Submodules
//!
//! - `hasher` - 64-bit FNV-1a fingerprints of tile pixels
//! - `orientation` - The eight rotations/reflections of a square tile
//! - `grid` - Row-major partitioning of a source image into tiles
//! - `image_set` - The dedup engine and its prototype registry

pub mod grid;
pub mod hasher;
pub mod image_set;
pub mod orientation;

pub use grid::{partition, GridCell, GridLayout, DEFAULT_TILE_SIZE};
pub use hasher::{hash_image, same_pixels, Fingerprint};
pub use image_set::{CellRecord, DedupOptions, DedupProgress, DedupStats, ImageSet, Prototype};
pub use orientation::{variants, Orientation, ORIENTATION_COUNT};
