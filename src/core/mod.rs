//! Core functionality module
//!
//! This module contains the pieces around the tile engine: configuration
//! management, error handling, and the single-image processing pipeline.
//!
//! # Submodules
//!
//! - `config` - Configuration loading, saving, and management
//! - `error` - Error types and result aliases
//! - `processor` - Load, dedup, export and report for one image
//! - `progress` - Progress bars for the fingerprint and export passes

pub mod config;
pub mod error;
pub mod processor;
pub mod progress;
