//! Pixel content fingerprinting
//!
//! Every tile is reduced to a 64-bit FNV-1a fingerprint of its pixels. The
//! channel encoding follows the 16-bit, alpha-premultiplied pixel model: each
//! 8-bit channel is widened to 16 bits (`c * 0x101`), colour channels are
//! scaled by alpha, and every value is written as four big-endian bytes. Two
//! tiles that look the same under that model always share a fingerprint, and
//! fingerprints stay stable across runs.
//!
//! Fingerprints are NOT collision-free. The registry built on top of them
//! accepts that risk.

use fnv::FnvHasher;
use image::{GenericImageView, Rgba};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::Hasher;

/// 64-bit content fingerprint of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Lower-case hex without zero padding, used to name exported tiles
    pub fn to_hex(self) -> String {
        format!("{:x}", self.0)
    }

    /// Parse a hex string produced by [`Fingerprint::to_hex`]
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.is_empty() || hex.len() > 16 {
            return None;
        }
        u64::from_str_radix(hex, 16).ok().map(Fingerprint)
    }

    /// File name of the exported artifact for this fingerprint
    pub fn file_name(self) -> String {
        format!("{}.png", self.to_hex())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Fingerprint::from_hex(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("Invalid fingerprint: {}", s)))
    }
}

/// Widen one RGBA8 pixel to premultiplied 16-bit channels held in `u32`s.
///
/// `r = (r8 * 0x101) * a8 / 0xff`, likewise for g and b; `a = a8 * 0x101`.
pub fn premultiplied_channels(pixel: Rgba<u8>) -> [u32; 4] {
    let [r, g, b, a] = pixel.0;
    let alpha = a as u32;
    let widen = |c: u8| (c as u32 * 0x101) * alpha / 0xff;

    [widen(r), widen(g), widen(b), alpha * 0x101]
}

/// Whether two images hold the same content under the hashing channel model.
///
/// Pixels are compared after premultiplication, so fully transparent pixels
/// match whatever their colour.
pub fn same_pixels<A, B>(a: &A, b: &B) -> bool
where
    A: GenericImageView<Pixel = Rgba<u8>>,
    B: GenericImageView<Pixel = Rgba<u8>>,
{
    if a.dimensions() != b.dimensions() {
        return false;
    }

    let (width, height) = a.dimensions();
    (0..height).all(|y| {
        (0..width).all(|x| {
            premultiplied_channels(a.get_pixel(x, y)) == premultiplied_channels(b.get_pixel(x, y))
        })
    })
}

/// Compute the fingerprint of an image's pixel content.
///
/// Pixels are visited row-major starting from the view's own origin.
pub fn hash_image<I>(image: &I) -> Fingerprint
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    let mut hasher = FnvHasher::default();
    let (width, height) = image.dimensions();

    for y in 0..height {
        for x in 0..width {
            for channel in premultiplied_channels(image.get_pixel(x, y)) {
                hasher.write(&channel.to_be_bytes());
            }
        }
    }

    Fingerprint(hasher.finish())
}
