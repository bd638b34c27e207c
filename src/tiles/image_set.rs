//! Tile Deduplication Engine
//!
//! Builds the set of unique tiles in a source image. Every grid cell is
//! expanded into its eight orientation variants, each variant is
//! fingerprinted, and the first variant (in orientation-code order) whose
//! fingerprint is already registered decides the cell's prototype and
//! orientation. A cell with no match registers its own untransformed tile as a
//! new prototype with orientation 0.
//!
//! # Architecture
//!
//! The registry uses the same two-part layout as a classic hash index:
//! 1. **Prototypes**: unique tiles in first-sighting order
//! 2. **Lookup**: fingerprint -> position in the prototype list
//!
//! Per-cell results are kept in two parallel arrays indexed by
//! `row * columns + column`: the prototype fingerprint and the orientation
//! code relating the cell to it.
//!
//! # Parallel hashing
//!
//! With [`DedupOptions::parallel`] set, variant generation and fingerprinting
//! run on the rayon pool. Registry resolution still happens afterwards in
//! row-major order, so the outcome is identical to the sequential pass.
//!
//! # Example
//!
//! ```rust,no_run
//! use texture_dedup::tiles::{DedupOptions, ImageSet};
//! use texture_dedup::io::source::PngFileSource;
//! use std::path::Path;
//!
//! let options = DedupOptions::default();
//! let set = ImageSet::load(&PngFileSource, Path::new("terrain.png"), &options, |_| {}).unwrap();
//!
//! println!("{} cells, {} unique tiles", set.cell_count(), set.unique_count());
//! for cell in set.cells() {
//!     println!("({}, {}) -> {} [{}]", cell.x, cell.y, cell.fingerprint, cell.orientation);
//! }
//! ```

use crate::core::error::Result;
use crate::io::source::ImageSource;
use crate::tiles::grid::{extract_tile, partition, GridLayout, DEFAULT_TILE_SIZE};
use crate::tiles::hasher::{hash_image, same_pixels, Fingerprint};
use crate::tiles::orientation::{variants, Orientation, ORIENTATION_COUNT};
use image::{GenericImageView, Rgba, RgbaImage};
use log::{debug, info, trace, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

/// Options for a dedup run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupOptions {
    /// Tile edge length in pixels
    pub tile_size: u32,

    /// Fingerprint cells on the rayon thread pool
    pub parallel: bool,

    /// Compare pixels on every fingerprint match and count mismatches as
    /// suspected hash collisions. The match is still accepted.
    pub verify_matches: bool,
}

impl Default for DedupOptions {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            parallel: false,
            verify_matches: false,
        }
    }
}

impl DedupOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tile size
    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// Enable or disable parallel fingerprinting
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Enable or disable pixel verification of fingerprint matches
    pub fn with_verify_matches(mut self, verify: bool) -> Self {
        self.verify_matches = verify;
        self
    }
}

/// Progress information for a dedup pass
#[derive(Debug, Clone, Copy)]
pub struct DedupProgress {
    /// Cells resolved so far
    pub current: usize,
    /// Total cells in the grid
    pub total: usize,
    /// Unique tiles registered so far
    pub unique: usize,
}

/// A unique tile in the registry
#[derive(Debug, Clone)]
pub struct Prototype {
    /// Fingerprint of the tile in its stored orientation
    pub fingerprint: Fingerprint,
    /// The tile pixels, exactly as first seen
    pub image: RgbaImage,
    /// Cell index where the tile was first seen
    pub first_cell: usize,
    /// Number of cells resolving to this tile
    pub occurrences: usize,
}

/// Resolved view of one grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRecord {
    /// Row-major cell index
    pub index: usize,
    /// Column of the cell
    pub x: u32,
    /// Row of the cell
    pub y: u32,
    /// Prototype this cell resolves to
    pub fingerprint: Fingerprint,
    /// How the cell's tile relates to the prototype
    pub orientation: Orientation,
}

/// Statistics about a dedup pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DedupStats {
    /// Number of grid cells
    pub cells: usize,
    /// Number of unique tiles
    pub unique_tiles: usize,
    /// Cells that matched an existing prototype
    pub duplicate_cells: usize,
    /// Cells per orientation code
    pub orientation_counts: [usize; ORIENTATION_COUNT],
    /// Matches whose pixels differed from the prototype (only counted with
    /// `verify_matches`)
    pub suspected_collisions: usize,
    /// Time taken by the pass (in milliseconds)
    pub build_time_ms: u64,
}

/// A cell after fingerprinting, before registry resolution
struct HashedCell {
    tile: RgbaImage,
    fingerprints: [Fingerprint; ORIENTATION_COUNT],
}

impl HashedCell {
    fn new(tile: RgbaImage) -> Self {
        let fingerprints = variants(&tile).map(|variant| hash_image(&variant));
        Self { tile, fingerprints }
    }
}

/// The set of unique tiles in one source image
#[derive(Debug)]
pub struct ImageSet {
    /// Grid shape; fixed once extraction begins
    layout: GridLayout,

    /// Source image width and height in pixels
    source_dimensions: (u32, u32),

    /// Unique tiles in first-sighting order
    prototypes: Vec<Prototype>,

    /// Fingerprint -> index into `prototypes`
    lookup: HashMap<Fingerprint, usize>,

    /// Per-cell prototype fingerprint
    images: Vec<Fingerprint>,

    /// Per-cell orientation relative to the prototype
    orientations: Vec<Orientation>,

    /// Statistics
    stats: DedupStats,

    /// Options used for this pass
    options: DedupOptions,
}

impl ImageSet {
    /// Create an empty set for a grid layout
    fn empty(layout: GridLayout, source_dimensions: (u32, u32), options: DedupOptions) -> Self {
        let cells = layout.cell_count();
        Self {
            layout,
            source_dimensions,
            prototypes: Vec::new(),
            lookup: HashMap::new(),
            images: Vec::with_capacity(cells),
            orientations: Vec::with_capacity(cells),
            stats: DedupStats::default(),
            options,
        }
    }

    /// Load a source image through `source` and deduplicate it.
    ///
    /// A load failure ends the run before any cell is examined.
    pub fn load<S, F>(
        source: &S,
        path: &Path,
        options: &DedupOptions,
        progress_callback: F,
    ) -> Result<Self>
    where
        S: ImageSource + ?Sized,
        F: Fn(DedupProgress) + Send + Sync,
    {
        let image = source.load(path)?;
        info!(
            "Loaded source image {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );

        Ok(Self::build_with_progress(&image, options, progress_callback))
    }

    /// Deduplicate an in-memory source image
    pub fn build<I>(source: &I, options: &DedupOptions) -> Self
    where
        I: GenericImageView<Pixel = Rgba<u8>> + Sync,
    {
        Self::build_with_progress(source, options, |_| {})
    }

    /// Deduplicate an in-memory source image, reporting progress per cell
    pub fn build_with_progress<I, F>(source: &I, options: &DedupOptions, progress_callback: F) -> Self
    where
        I: GenericImageView<Pixel = Rgba<u8>> + Sync,
        F: Fn(DedupProgress) + Send + Sync,
    {
        let start_time = Instant::now();
        let grid = partition(source, options.tile_size);
        let layout = grid.layout();
        let mut set = Self::empty(layout, source.dimensions(), options.clone());
        let total = layout.cell_count();

        if layout.is_empty() {
            info!(
                "Source image {}x{} is smaller than one {}px tile; no cells to process",
                set.source_dimensions.0, set.source_dimensions.1, options.tile_size
            );
            set.finish_stats(start_time);
            return set;
        }

        info!(
            "Partitioning into {}x{} grid of {}px tiles ({} cells)",
            layout.columns, layout.rows, layout.tile_size, total
        );

        if options.parallel {
            let hashed: Vec<HashedCell> = (0..total)
                .into_par_iter()
                .map(|index| {
                    let (x, y) = layout.coords_of(index);
                    HashedCell::new(extract_tile(source, x, y, layout.tile_size))
                })
                .collect();

            for cell in hashed {
                set.resolve(cell);
                set.report_progress(total, &progress_callback);
            }
        } else {
            for cell in grid {
                trace!("Hashing cell ({}, {})", cell.x, cell.y);
                set.resolve(HashedCell::new(cell.tile));
                set.report_progress(total, &progress_callback);
            }
        }

        set.finish_stats(start_time);

        info!(
            "Dedup complete: {} cells, {} unique tiles, {} duplicates in {}ms",
            set.stats.cells,
            set.stats.unique_tiles,
            set.stats.duplicate_cells,
            set.stats.build_time_ms
        );

        if set.stats.suspected_collisions > 0 {
            warn!(
                "{} fingerprint matches had differing pixels (suspected hash collisions)",
                set.stats.suspected_collisions
            );
        }

        set
    }

    /// Resolve the next cell against the registry.
    ///
    /// The lowest orientation code with a registered fingerprint wins. Without
    /// a match the identity variant becomes a new prototype.
    fn resolve(&mut self, cell: HashedCell) {
        let index = self.images.len();

        let matched = cell
            .fingerprints
            .iter()
            .enumerate()
            .find_map(|(code, fp)| self.lookup.get(fp).map(|&slot| (code, slot)));

        match matched {
            Some((code, slot)) => {
                let orientation = Orientation::from_code(code as u8);

                if self.options.verify_matches {
                    let variant = orientation.apply(&cell.tile);
                    if !same_pixels(&variant, &self.prototypes[slot].image) {
                        let (x, y) = self.layout.coords_of(index);
                        warn!(
                            "Cell ({}, {}) matched {} by fingerprint but pixels differ",
                            x, y, self.prototypes[slot].fingerprint
                        );
                        self.stats.suspected_collisions += 1;
                    }
                }

                let prototype = &mut self.prototypes[slot];
                prototype.occurrences += 1;
                self.images.push(prototype.fingerprint);
                self.orientations.push(orientation);
                self.stats.duplicate_cells += 1;
                self.stats.orientation_counts[code] += 1;
            }
            None => {
                let fingerprint = cell.fingerprints[0];
                debug!("New unique tile {} at cell {}", fingerprint, index);

                self.lookup.insert(fingerprint, self.prototypes.len());
                self.prototypes.push(Prototype {
                    fingerprint,
                    image: cell.tile,
                    first_cell: index,
                    occurrences: 1,
                });
                self.images.push(fingerprint);
                self.orientations.push(Orientation::Standard);
                self.stats.orientation_counts[0] += 1;
            }
        }
    }

    fn report_progress<F>(&self, total: usize, progress_callback: &F)
    where
        F: Fn(DedupProgress),
    {
        progress_callback(DedupProgress {
            current: self.images.len(),
            total,
            unique: self.prototypes.len(),
        });
    }

    fn finish_stats(&mut self, start_time: Instant) {
        self.stats.cells = self.images.len();
        self.stats.unique_tiles = self.prototypes.len();
        self.stats.build_time_ms = start_time.elapsed().as_millis() as u64;
    }

    /// Grid layout of the source image
    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    /// Number of cells per row; `x = index % stride`, `y = index / stride`
    pub fn stride(&self) -> u32 {
        self.layout.columns
    }

    /// Source image width and height in pixels
    pub fn source_dimensions(&self) -> (u32, u32) {
        self.source_dimensions
    }

    /// Options used for this pass
    pub fn options(&self) -> &DedupOptions {
        &self.options
    }

    /// Number of cell records
    pub fn cell_count(&self) -> usize {
        self.images.len()
    }

    /// Number of unique tiles
    pub fn unique_count(&self) -> usize {
        self.prototypes.len()
    }

    /// Whether no cells were extracted
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Per-cell prototype fingerprints, row-major
    pub fn images(&self) -> &[Fingerprint] {
        &self.images
    }

    /// Per-cell orientations, row-major
    pub fn orientations(&self) -> &[Orientation] {
        &self.orientations
    }

    /// Unique tiles in first-sighting order
    pub fn prototypes(&self) -> &[Prototype] {
        &self.prototypes
    }

    /// Look up a unique tile by fingerprint
    pub fn prototype(&self, fingerprint: Fingerprint) -> Option<&Prototype> {
        self.lookup
            .get(&fingerprint)
            .map(|&slot| &self.prototypes[slot])
    }

    /// Whether a fingerprint is registered
    pub fn contains(&self, fingerprint: Fingerprint) -> bool {
        self.lookup.contains_key(&fingerprint)
    }

    /// Resolved record of one cell
    pub fn cell(&self, index: usize) -> Option<CellRecord> {
        let fingerprint = *self.images.get(index)?;
        let (x, y) = self.layout.coords_of(index);

        Some(CellRecord {
            index,
            x,
            y,
            fingerprint,
            orientation: self.orientations[index],
        })
    }

    /// Resolved records of all cells, row-major
    pub fn cells(&self) -> impl Iterator<Item = CellRecord> + '_ {
        (0..self.images.len()).filter_map(move |index| self.cell(index))
    }

    /// Get statistics about the pass
    pub fn stats(&self) -> &DedupStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::imageops;

    const TS: u32 = 128;

    /// Asymmetric tile seeded so distinct seeds give distinct content under
    /// every orientation
    fn pattern(seed: u8) -> RgbaImage {
        RgbaImage::from_fn(TS, TS, |x, y| {
            Rgba([
                (x as u8).wrapping_mul(3).wrapping_add(seed),
                (y as u8).wrapping_mul(5).wrapping_add(seed.wrapping_mul(7)),
                ((x / 4) as u8) ^ ((y / 8) as u8) ^ seed,
                255,
            ])
        })
    }

    fn symmetric(value: u8) -> RgbaImage {
        RgbaImage::from_pixel(TS, TS, Rgba([value, value, value, 255]))
    }

    fn compose(cols: u32, rows: u32, tiles: &[RgbaImage]) -> RgbaImage {
        let mut canvas = RgbaImage::new(cols * TS, rows * TS);
        for (i, tile) in tiles.iter().enumerate() {
            let x = (i as u32 % cols) * TS;
            let y = (i as u32 / cols) * TS;
            imageops::replace(&mut canvas, tile, x as i64, y as i64);
        }
        canvas
    }

    #[test]
    fn test_options_builder() {
        let options = DedupOptions::new()
            .with_tile_size(64)
            .with_parallel(true)
            .with_verify_matches(true);

        assert_eq!(options.tile_size, 64);
        assert!(options.parallel);
        assert!(options.verify_matches);
        assert_eq!(DedupOptions::default().tile_size, 128);
    }

    #[test]
    fn test_quadrant_scenario() {
        let top_left = pattern(1);
        // Rotated clockwise; its counter-clockwise variant (code 1) is top_left
        let top_right = imageops::rotate90(&top_left);
        let image = compose(2, 2, &[top_left, top_right, pattern(2), pattern(3)]);

        let set = ImageSet::build(&image, &DedupOptions::default());

        assert_eq!(set.cell_count(), 4);
        assert_eq!(set.unique_count(), 3);
        assert_eq!(set.stride(), 2);
        assert_eq!(set.images()[0], set.images()[1]);
        assert_eq!(
            set.orientations(),
            &[
                Orientation::Standard,
                Orientation::Rotated90,
                Orientation::Standard,
                Orientation::Standard
            ]
        );
    }

    #[test]
    fn test_partial_grid_scenario() {
        let image = RgbaImage::from_fn(300, 200, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let set = ImageSet::build(&image, &DedupOptions::default());

        assert_eq!(set.layout().columns, 2);
        assert_eq!(set.layout().rows, 1);
        assert_eq!(set.cell_count(), 2);
        assert_eq!(set.source_dimensions(), (300, 200));
    }

    #[test]
    fn test_small_image_has_no_cells() {
        let image = RgbaImage::new(127, 1000);
        let set = ImageSet::build(&image, &DedupOptions::default());

        assert!(set.is_empty());
        assert_eq!(set.unique_count(), 0);
        assert_eq!(set.stats().cells, 0);
    }

    #[test]
    fn test_every_orientation_resolves_to_prototype() {
        let base = pattern(9);
        let mut tiles = vec![base.clone()];
        for orientation in &Orientation::ALL[1..] {
            // A cell whose variant `code` equals the base tile
            tiles.push(orientation.inverse().apply(&base));
        }
        let image = compose(4, 2, &tiles);

        let set = ImageSet::build(&image, &DedupOptions::default());

        assert_eq!(set.unique_count(), 1);
        for (i, cell) in set.cells().enumerate() {
            assert_eq!(cell.orientation, Orientation::ALL[i]);
            assert_eq!(cell.fingerprint, set.prototypes()[0].fingerprint);
        }
        assert_eq!(set.prototypes()[0].occurrences, 8);
        assert_eq!(set.stats().orientation_counts, [1; 8]);
    }

    #[test]
    fn test_symmetric_tile_prefers_lowest_code() {
        let image = compose(3, 1, &[symmetric(40), symmetric(40), symmetric(80)]);
        let set = ImageSet::build(&image, &DedupOptions::default());

        assert_eq!(set.unique_count(), 2);
        assert!(set.orientations().iter().all(|o| *o == Orientation::Standard));
        assert_eq!(set.stats().duplicate_cells, 1);
    }

    #[test]
    fn test_new_prototype_stored_untransformed() {
        let tile = pattern(4);
        let image = compose(1, 1, &[tile.clone()]);
        let set = ImageSet::build(&image, &DedupOptions::default());

        let prototype = &set.prototypes()[0];
        assert_eq!(prototype.image, tile);
        assert_eq!(prototype.fingerprint, hash_image(&tile));
        assert_eq!(prototype.first_cell, 0);
    }

    #[test]
    fn test_every_cell_fingerprint_is_registered() {
        let tiles: Vec<RgbaImage> = (0..6).map(|i| pattern(i % 3)).collect();
        let image = compose(3, 2, &tiles);
        let set = ImageSet::build(&image, &DedupOptions::default());

        assert_eq!(set.unique_count(), 3);
        assert!(set.unique_count() <= set.cell_count());
        for fp in set.images() {
            assert!(set.contains(*fp));
            assert!(set.prototype(*fp).is_some());
        }
    }

    #[test]
    fn test_all_unique_registry_equals_cells() {
        let tiles: Vec<RgbaImage> = (10..16).map(pattern).collect();
        let image = compose(3, 2, &tiles);
        let set = ImageSet::build(&image, &DedupOptions::default());

        assert_eq!(set.unique_count(), set.cell_count());
        assert_eq!(set.stats().duplicate_cells, 0);
    }

    #[test]
    fn test_determinism() {
        let tiles: Vec<RgbaImage> = (0..9).map(|i| pattern(i % 4)).collect();
        let image = compose(3, 3, &tiles);

        let a = ImageSet::build(&image, &DedupOptions::default());
        let b = ImageSet::build(&image, &DedupOptions::default());

        assert_eq!(a.images(), b.images());
        assert_eq!(a.orientations(), b.orientations());
        assert_eq!(a.stride(), b.stride());
        let keys_a: Vec<Fingerprint> = a.prototypes().iter().map(|p| p.fingerprint).collect();
        let keys_b: Vec<Fingerprint> = b.prototypes().iter().map(|p| p.fingerprint).collect();
        assert_eq!(keys_a, keys_b);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let base = pattern(21);
        let mut tiles = Vec::new();
        for i in 0..12u8 {
            let tile = if i % 3 == 0 {
                Orientation::from_code(i).apply(&base)
            } else {
                pattern(i)
            };
            tiles.push(tile);
        }
        let image = compose(4, 3, &tiles);

        let sequential = ImageSet::build(&image, &DedupOptions::default());
        let parallel = ImageSet::build(&image, &DedupOptions::default().with_parallel(true));

        assert_eq!(sequential.images(), parallel.images());
        assert_eq!(sequential.orientations(), parallel.orientations());
        assert_eq!(sequential.unique_count(), parallel.unique_count());
    }

    #[test]
    fn test_cell_records() {
        let image = compose(2, 2, &[pattern(1), pattern(2), pattern(1), pattern(3)]);
        let set = ImageSet::build(&image, &DedupOptions::default());

        let cell = set.cell(2).unwrap();
        assert_eq!((cell.x, cell.y), (0, 1));
        assert_eq!(cell.fingerprint, set.images()[0]);
        assert!(set.cell(4).is_none());
        assert_eq!(set.cells().count(), 4);
    }

    #[test]
    fn test_progress_callback() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let image = compose(3, 1, &[pattern(1), pattern(1), pattern(2)]);
        let calls = AtomicUsize::new(0);
        let last_unique = AtomicUsize::new(0);

        ImageSet::build_with_progress(&image, &DedupOptions::default(), |p| {
            calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(p.total, 3);
            last_unique.store(p.unique, Ordering::SeqCst);
        });

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(last_unique.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_verify_matches_clean_run() {
        let image = compose(2, 1, &[pattern(5), imageops::flip_horizontal(&pattern(5))]);
        let set = ImageSet::build(&image, &DedupOptions::default().with_verify_matches(true));

        assert_eq!(set.unique_count(), 1);
        assert_eq!(set.orientations()[1], Orientation::Mirrored);
        assert_eq!(set.stats().suspected_collisions, 0);
    }

    #[test]
    fn test_verify_matches_ignores_transparent_colour() {
        let mut image = RgbaImage::from_pixel(8, 4, Rgba([40, 80, 120, 255]));
        image.put_pixel(0, 0, Rgba([1, 2, 3, 0]));
        image.put_pixel(4, 0, Rgba([9, 9, 9, 0]));

        let options = DedupOptions::default()
            .with_tile_size(4)
            .with_verify_matches(true);
        let set = ImageSet::build(&image, &options);

        assert_eq!(set.unique_count(), 1);
        assert_eq!(set.orientations()[1], Orientation::Standard);
        assert_eq!(set.stats().suspected_collisions, 0);
    }

    #[test]
    fn test_custom_tile_size() {
        let image = RgbaImage::from_pixel(100, 60, Rgba([1, 2, 3, 255]));
        let set = ImageSet::build(&image, &DedupOptions::default().with_tile_size(20));

        assert_eq!(set.stride(), 5);
        assert_eq!(set.cell_count(), 15);
        assert_eq!(set.unique_count(), 1);
    }
}
