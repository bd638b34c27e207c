//! Source image providers
//!
//! The dedup engine only needs a decoded, pixel-addressable image. Providers
//! hide where it comes from: [`PngFileSource`] decodes PNG files from disk and
//! [`MemorySource`] serves pre-built images, which lets the pipeline be tested
//! without touching the filesystem.

use crate::core::error::{Result, TileError};
use image::{DynamicImage, ImageFormat, ImageReader};
use log::debug;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};

/// Supplies decoded source images by path
pub trait ImageSource: Send + Sync {
    /// Load and decode the image at `path`.
    ///
    /// Fails with [`TileError::SourceNotFound`], [`TileError::SourceNotReadable`]
    /// or [`TileError::SourceMalformed`].
    fn load(&self, path: &Path) -> Result<DynamicImage>;
}

/// Decodes PNG files from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct PngFileSource;

impl ImageSource for PngFileSource {
    fn load(&self, path: &Path) -> Result<DynamicImage> {
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => TileError::SourceNotFound(path.to_path_buf()),
            ErrorKind::PermissionDenied => TileError::SourceNotReadable(path.to_path_buf()),
            _ => TileError::SourceMalformed {
                path: path.to_path_buf(),
                message: format!("An error occurred while opening the file: {}", e),
            },
        })?;

        let mut reader = ImageReader::new(BufReader::new(file));
        reader.set_format(ImageFormat::Png);

        let image = reader.decode().map_err(|e| TileError::SourceMalformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        debug!(
            "Decoded {} as {:?} ({}x{})",
            path.display(),
            image.color(),
            image.width(),
            image.height()
        );

        Ok(image)
    }
}

/// Serves images registered in memory, keyed by path
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    images: HashMap<PathBuf, DynamicImage>,
}

impl MemorySource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an image under a path
    pub fn with_image(mut self, path: impl Into<PathBuf>, image: DynamicImage) -> Self {
        self.images.insert(path.into(), image);
        self
    }

    /// Register an image under a path
    pub fn insert(&mut self, path: impl Into<PathBuf>, image: DynamicImage) {
        self.images.insert(path.into(), image);
    }
}

impl ImageSource for MemorySource {
    fn load(&self, path: &Path) -> Result<DynamicImage> {
        self.images
            .get(path)
            .cloned()
            .ok_or_else(|| TileError::SourceNotFound(path.to_path_buf()))
    }
}
