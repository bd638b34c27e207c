//! The eight square-tile orientations.
//!
//! An orientation code is a 3-bit value laid out as `mrr`:
//!
//! ```text
//! bit 2  (m)  - the tile was mirrored across its vertical axis first
//! bits 1-0 (rr) - quarter turns counter-clockwise applied afterwards
//! ```
//!
//! Variant `i` of a tile is the tile transformed by orientation `i`. When a
//! cell resolves to a prototype with code `i`, variant `i` of that cell's tile
//! is pixel-identical to the prototype.

use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Number of distinct orientations of a square tile
pub const ORIENTATION_COUNT: usize = 8;

/// One of the eight rotations/reflections of a square tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Orientation {
    Standard = 0,
    Rotated90 = 1,
    Rotated180 = 2,
    Rotated270 = 3,
    Mirrored = 4,
    MirroredRotated90 = 5,
    MirroredRotated180 = 6,
    MirroredRotated270 = 7,
}

impl Orientation {
    /// All orientations in code order; the dedup scan visits them this way.
    pub const ALL: [Orientation; ORIENTATION_COUNT] = [
        Orientation::Standard,
        Orientation::Rotated90,
        Orientation::Rotated180,
        Orientation::Rotated270,
        Orientation::Mirrored,
        Orientation::MirroredRotated90,
        Orientation::MirroredRotated180,
        Orientation::MirroredRotated270,
    ];

    /// Build an orientation from its code. Only the low three bits are read.
    pub fn from_code(code: u8) -> Self {
        Self::ALL[(code & 0x7) as usize]
    }

    /// The `mrr` code of this orientation
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether the tile is mirrored before rotating
    pub fn is_mirrored(self) -> bool {
        self.code() & 0x4 != 0
    }

    /// Counter-clockwise quarter turns applied after the optional mirror
    pub fn quarter_turns(self) -> u8 {
        self.code() & 0x3
    }

    /// Human-readable label used in reports
    pub fn label(self) -> &'static str {
        match self {
            Orientation::Standard => "Standard",
            Orientation::Rotated90 => "Rotated 90°",
            Orientation::Rotated180 => "Rotated 180°",
            Orientation::Rotated270 => "Rotated 270°",
            Orientation::Mirrored => "Mirrored",
            Orientation::MirroredRotated90 => "Mirrored+Rotated 90°",
            Orientation::MirroredRotated180 => "Mirrored+Rotated 180°",
            Orientation::MirroredRotated270 => "Mirrored+Rotated 270°",
        }
    }

    /// The orientation that undoes this one.
    ///
    /// Pure rotations invert to the opposite turn count. Every mirrored
    /// orientation is a reflection and therefore its own inverse.
    pub fn inverse(self) -> Self {
        if self.is_mirrored() {
            self
        } else {
            Self::from_code((4 - self.quarter_turns()) & 0x3)
        }
    }

    /// Transform a tile by this orientation
    pub fn apply(self, tile: &RgbaImage) -> RgbaImage {
        let mirrored;
        let base = if self.is_mirrored() {
            mirrored = imageops::flip_horizontal(tile);
            &mirrored
        } else {
            tile
        };

        rotate_ccw(base, self.quarter_turns())
    }
}

impl Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<Orientation> for u8 {
    fn from(orientation: Orientation) -> Self {
        orientation.code()
    }
}

impl TryFrom<u8> for Orientation {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        if (code as usize) < ORIENTATION_COUNT {
            Ok(Self::from_code(code))
        } else {
            Err(format!("Invalid orientation code: {}", code))
        }
    }
}

/// Rotate counter-clockwise by `turns` quarter turns.
///
/// `imageops` rotates clockwise, so a counter-clockwise quarter turn is its
/// 270° rotation.
fn rotate_ccw(tile: &RgbaImage, turns: u8) -> RgbaImage {
    match turns & 0x3 {
        0 => tile.clone(),
        1 => imageops::rotate270(tile),
        2 => imageops::rotate180(tile),
        _ => imageops::rotate90(tile),
    }
}

/// Produce all eight variants of a tile, indexed by orientation code.
pub fn variants(tile: &RgbaImage) -> [RgbaImage; ORIENTATION_COUNT] {
    let mirrored = imageops::flip_horizontal(tile);

    [
        tile.clone(),
        rotate_ccw(tile, 1),
        rotate_ccw(tile, 2),
        rotate_ccw(tile, 3),
        rotate_ccw(&mirrored, 0),
        rotate_ccw(&mirrored, 1),
        rotate_ccw(&mirrored, 2),
        rotate_ccw(&mirrored, 3),
    ]
}
