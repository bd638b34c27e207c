//! Error types for the texture deduplication tool
//!
//! All failures happen at the I/O boundaries: loading the source image,
//! exporting unique tiles, and writing reports. The dedup engine itself is a
//! pure computation over in-memory pixels and never fails.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the texture deduplication tool
#[derive(Error, Debug)]
pub enum TileError {
    /// The source image file does not exist
    #[error("The source image file {} does not exist.", .0.display())]
    SourceNotFound(PathBuf),

    /// The source image file exists but could not be opened
    #[error("The source image file {} is not readable.", .0.display())]
    SourceNotReadable(PathBuf),

    /// The source image could not be decoded
    #[error("Failed to decode source image '{}': {}", .path.display(), .message)]
    SourceMalformed { path: PathBuf, message: String },

    /// A unique tile could not be written
    #[error("Failed to write tile '{name}': {message}")]
    ExportFailed { name: String, message: String },

    /// The summary report could not be written
    #[error("Failed to write report '{}': {}", .path.display(), .message)]
    ReportFailed { path: PathBuf, message: String },

    /// Tile size must be at least one pixel
    #[error("Invalid tile size {0}: tiles must be at least 1 pixel wide")]
    InvalidTileSize(u32),

    /// Sample generation parameters describe an image that cannot exist
    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    /// General I/O error
    #[error("IO error: {0}")]
    IoError(String),
}

impl TileError {
    /// Whether this error happened while loading the source image.
    ///
    /// Load errors are terminal for a run; no artifacts are produced.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            TileError::SourceNotFound(_)
                | TileError::SourceNotReadable(_)
                | TileError::SourceMalformed { .. }
        )
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, TileError>;

impl From<std::io::Error> for TileError {
    fn from(err: std::io::Error) -> Self {
        TileError::IoError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_classification() {
        assert!(TileError::SourceNotFound(PathBuf::from("a.png")).is_load_error());
        assert!(TileError::SourceNotReadable(PathBuf::from("a.png")).is_load_error());
        assert!(TileError::SourceMalformed {
            path: PathBuf::from("a.png"),
            message: "bad header".to_string(),
        }
        .is_load_error());

        assert!(!TileError::ExportFailed {
            name: "abc.png".to_string(),
            message: "disk full".to_string(),
        }
        .is_load_error());
        assert!(!TileError::IoError("x".to_string()).is_load_error());
    }

    #[test]
    fn test_error_messages() {
        let err = TileError::SourceNotFound(PathBuf::from("missing.png"));
        assert_eq!(
            err.to_string(),
            "The source image file missing.png does not exist."
        );

        let err = TileError::InvalidTileSize(0);
        assert!(err.to_string().contains("Invalid tile size 0"));
    }
}
