//! Ordered dithering with an 8×8 Bayer matrix.
//!
//! No error is propagated, so every pixel is independent of its neighbors.

use crate::image::{clamp_channel, RgbaImage};
use crate::palette::ColorMode;
use crate::quantize::closest;

/// 8×8 Bayer threshold matrix, values 0..=63, indexed `[y % 8][x % 8]`.
pub const BAYER_8X8: [[u8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

/// Channel offset applied at `(x, y)`.
#[inline]
pub fn threshold_offset(x: usize, y: usize, strength: f64) -> f64 {
    let threshold = BAYER_8X8[y % 8][x % 8] as f64;
    (threshold / 64.0 * 255.0 - 127.5) * strength
}

/// Perturb and quantize one pixel.
#[inline]
pub fn dither_pixel(rgb: [u8; 3], x: usize, y: usize, strength: f64, mode: ColorMode) -> [u8; 3] {
    let offset = threshold_offset(x, y, strength);
    let [r, g, b] = rgb.map(|c| clamp_channel(c as f64 + offset));
    closest(r, g, b, mode).rgb()
}

pub(crate) fn bayer(source: &RgbaImage, strength: f64, mode: ColorMode) -> RgbaImage {
    let mut output = source.clone();
    for y in 0..source.height() {
        for x in 0..source.width() {
            output.set_rgb(x, y, dither_pixel(source.rgb(x, y), x, y, strength, mode));
        }
    }
    output
}
