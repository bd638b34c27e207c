//! Partitioning a source image into a grid of square tiles.
//!
//! Only whole tiles are produced. Any trailing columns or rows of pixels that
//! do not fill a tile are never visited.

use image::{GenericImageView, Rgba, RgbaImage};

/// Default tile edge length in pixels
pub const DEFAULT_TILE_SIZE: u32 = 128;

/// Shape of a tile grid over a source image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    /// Tile edge length in pixels
    pub tile_size: u32,
    /// Number of tile columns (also the stride of cell indices)
    pub columns: u32,
    /// Number of tile rows
    pub rows: u32,
}

impl GridLayout {
    /// Compute the layout for an image of the given dimensions.
    ///
    /// A `tile_size` of zero yields an empty grid.
    pub fn for_dimensions(width: u32, height: u32, tile_size: u32) -> Self {
        let (columns, rows) = if tile_size == 0 {
            (0, 0)
        } else {
            (width / tile_size, height / tile_size)
        };

        Self {
            tile_size,
            columns,
            rows,
        }
    }

    /// Number of cells in the grid
    pub fn cell_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// Whether the grid has no cells at all
    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }

    /// Row-major index of cell (x, y)
    pub fn index_of(&self, x: u32, y: u32) -> usize {
        y as usize * self.columns as usize + x as usize
    }

    /// Grid coordinates of a row-major cell index
    pub fn coords_of(&self, index: usize) -> (u32, u32) {
        let stride = self.columns.max(1) as usize;
        ((index % stride) as u32, (index / stride) as u32)
    }

    /// Pixel columns and rows left over to the right and bottom of the grid
    pub fn remainder(&self, width: u32, height: u32) -> (u32, u32) {
        (
            width - self.columns * self.tile_size,
            height - self.rows * self.tile_size,
        )
    }
}

/// One extracted grid cell
#[derive(Debug, Clone)]
pub struct GridCell {
    /// Column of the cell
    pub x: u32,
    /// Row of the cell
    pub y: u32,
    /// Owned copy of the cell's pixels
    pub tile: RgbaImage,
}

/// Iterator over the cells of a source image in row-major order
pub struct TileGrid<'a, I> {
    source: &'a I,
    layout: GridLayout,
    next: usize,
}

impl<'a, I> TileGrid<'a, I>
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    /// The layout this grid walks
    pub fn layout(&self) -> GridLayout {
        self.layout
    }
}

impl<'a, I> Iterator for TileGrid<'a, I>
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    type Item = GridCell;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.layout.cell_count() {
            return None;
        }

        let (x, y) = self.layout.coords_of(self.next);
        self.next += 1;

        Some(GridCell {
            x,
            y,
            tile: extract_tile(self.source, x, y, self.layout.tile_size),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.layout.cell_count() - self.next;
        (remaining, Some(remaining))
    }
}

impl<'a, I> ExactSizeIterator for TileGrid<'a, I> where I: GenericImageView<Pixel = Rgba<u8>> {}

/// Partition a source image into whole `tile_size` tiles.
///
/// Cells are produced row by row, left to right. Images smaller than one tile
/// in either dimension produce no cells.
pub fn partition<I>(source: &I, tile_size: u32) -> TileGrid<'_, I>
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    let (width, height) = source.dimensions();

    TileGrid {
        source,
        layout: GridLayout::for_dimensions(width, height, tile_size),
        next: 0,
    }
}

/// Copy the pixels of cell (x, y) out of the source image
pub fn extract_tile<I>(source: &I, x: u32, y: u32, tile_size: u32) -> RgbaImage
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    let (left, top) = (x * tile_size, y * tile_size);
    RgbaImage::from_fn(tile_size, tile_size, |px, py| {
        source.get_pixel(left + px, top + py)
    })
}
