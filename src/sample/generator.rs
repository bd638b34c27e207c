//! Synthetic source image generator
//!
//! Builds texture sheets with a known answer: a set of random noise tiles is
//! generated, every tile is placed at least once, and the remaining cells
//! repeat random tiles in random orientations. The returned [`SampleImage`]
//! records which tile and orientation went into each cell.
//!
//! Generation is fully determined by the seed.

use crate::core::error::{Result, TileError};
use crate::tiles::{Orientation, ORIENTATION_COUNT};
use image::{imageops, ImageFormat, Rgba, RgbaImage};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

/// Largest sample image generated, in pixels (1 GiB of RGBA8)
pub const MAX_SAMPLE_PIXELS: u64 = 1 << 28;

/// Configuration for sample generation
#[derive(Debug, Clone)]
pub struct SampleConfig {
    /// Cells per row
    pub columns: u32,
    /// Cells per column
    pub rows: u32,
    /// Tile edge length in pixels
    pub tile_size: u32,
    /// Number of distinct tiles to generate
    pub unique_tiles: usize,
    /// Extra pixels added to the right and bottom edges, never covered by a cell
    pub margin: u32,
    /// RNG seed
    pub seed: u64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            columns: 8,
            rows: 8,
            tile_size: 128,
            unique_tiles: 12,
            margin: 0,
            seed: 42,
        }
    }
}

impl SampleConfig {
    /// Image width, height and cell count, or an error if any of them
    /// overflows
    pub fn dimensions(&self) -> Result<(u32, u32, usize)> {
        if self.tile_size == 0 {
            return Err(TileError::InvalidTileSize(0));
        }

        let overflow = || {
            TileError::InvalidSample(format!(
                "{}x{} cells of {} px with a {} px margin is too large",
                self.columns, self.rows, self.tile_size, self.margin
            ))
        };

        let width = self
            .columns
            .checked_mul(self.tile_size)
            .and_then(|w| w.checked_add(self.margin))
            .ok_or_else(overflow)?;
        let height = self
            .rows
            .checked_mul(self.tile_size)
            .and_then(|h| h.checked_add(self.margin))
            .ok_or_else(overflow)?;
        let cells = (self.columns as usize)
            .checked_mul(self.rows as usize)
            .ok_or_else(overflow)?;

        if width as u64 * height as u64 > MAX_SAMPLE_PIXELS {
            return Err(overflow());
        }

        Ok((width, height, cells))
    }
}

/// What was placed into one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Index into [`SampleImage::tiles`]
    pub tile: usize,
    /// Orientation the tile was drawn in
    pub orientation: Orientation,
}

/// A generated source image and its ground truth
#[derive(Debug, Clone)]
pub struct SampleImage {
    /// The composed source image
    pub image: RgbaImage,
    /// The distinct tiles, unoriented
    pub tiles: Vec<RgbaImage>,
    /// Row-major placements, one per cell
    pub placements: Vec<Placement>,
    /// Configuration used
    pub config: SampleConfig,
}

impl SampleImage {
    /// Number of distinct tiles actually placed
    pub fn expected_unique(&self) -> usize {
        self.tiles.len().min(self.placements.len())
    }

    /// Save the image as PNG
    pub fn save(&self, path: &Path) -> Result<()> {
        self.image
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| {
                TileError::IoError(format!(
                    "Failed to save sample image {}: {}",
                    path.display(),
                    e
                ))
            })
    }
}

/// Generate a sample image
pub fn generate(config: &SampleConfig) -> Result<SampleImage> {
    let (width, height, cells) = config.dimensions()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let ts = config.tile_size;

    let tiles: Vec<RgbaImage> = (0..config.unique_tiles.min(cells))
        .map(|_| noise_tile(&mut rng, ts))
        .collect();

    let mut placements = Vec::with_capacity(cells);
    for index in 0..cells {
        let tile = if index < tiles.len() || tiles.is_empty() {
            index
        } else {
            rng.gen_range(0..tiles.len())
        };
        let orientation = Orientation::from_code(rng.gen_range(0..ORIENTATION_COUNT as u8));
        placements.push(Placement { tile, orientation });
    }

    let mut image = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
    let columns = config.columns as usize;

    for (index, placement) in placements.iter().enumerate() {
        let Some(tile) = tiles.get(placement.tile) else {
            continue;
        };
        let x = (index % columns) as i64 * ts as i64;
        let y = (index / columns) as i64 * ts as i64;
        let drawn = placement.orientation.apply(tile);
        imageops::replace(&mut image, &drawn, x, y);
    }

    debug!("Placements: {:?}", placements);
    info!(
        "Generated {}x{} sample ({} cells, {} distinct tiles, seed {})",
        image.width(),
        image.height(),
        cells,
        tiles.len(),
        config.seed
    );

    Ok(SampleImage {
        image,
        tiles,
        placements,
        config: config.clone(),
    })
}

fn noise_tile(rng: &mut StdRng, size: u32) -> RgbaImage {
    RgbaImage::from_fn(size, size, |_, _| {
        Rgba([rng.gen(), rng.gen(), rng.gen(), rng.gen_range(128..=255)])
    })
}
