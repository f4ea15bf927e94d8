//! CIE Lab colour space (D65 reference white)

use super::lut::srgb8_to_linear;

/// D65 reference white in XYZ.
const WHITE_X: f64 = 0.95047;
const WHITE_Y: f64 = 1.0;
const WHITE_Z: f64 = 1.08883;

/// Lightness weight of the palette distance.
const WEIGHT_L: f64 = 0.2;
/// Chroma weight of the palette distance (applied to both a and b).
const WEIGHT_AB: f64 = 3.0;

/// A color in CIE Lab space.
///
/// `l` is in 0..=100 for in-gamut colors, `a` and `b` roughly -128..=127.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lab {
    /// Lightness
    pub l: f64,
    /// Green-red axis
    pub a: f64,
    /// Blue-yellow axis
    pub b: f64,
}

impl Lab {
    #[inline]
    pub fn new(l: f64, a: f64, b: f64) -> Self {
        Self { l, a, b }
    }

    /// Convert an 8-bit sRGB triple to Lab.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        let r = srgb8_to_linear(r);
        let g = srgb8_to_linear(g);
        let b = srgb8_to_linear(b);

        // Linear sRGB -> XYZ (D65)
        let x = r * 0.4124 + g * 0.3576 + b * 0.1805;
        let y = r * 0.2126 + g * 0.7152 + b * 0.0722;
        let z = r * 0.0193 + g * 0.1192 + b * 0.9505;

        let fx = lab_f(x / WHITE_X);
        let fy = lab_f(y / WHITE_Y);
        let fz = lab_f(z / WHITE_Z);

        Self {
            l: 116.0 * fy - 16.0,
            a: 500.0 * (fx - fy),
            b: 200.0 * (fy - fz),
        }
    }

    /// Weighted Euclidean distance used for palette matching.
    ///
    /// `sqrt(0.2·ΔL² + 3·Δa² + 3·Δb²)`. Chroma differences dominate so that
    /// saturated inputs snap to the chromatic inks rather than to a grey of
    /// similar lightness.
    #[inline]
    pub fn weighted_distance(self, other: Lab) -> f64 {
        let dl = self.l - other.l;
        let da = self.a - other.a;
        let db = self.b - other.b;
        (WEIGHT_L * dl * dl + WEIGHT_AB * da * da + WEIGHT_AB * db * db).sqrt()
    }
}

#[inline]
fn lab_f(t: f64) -> f64 {
    if t > 0.008856 {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

/// Rec. 601 luma of an 8-bit RGB triple, 0.0..=255.0.
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

/// Rec. 601 luma scaled by 1000, in exact integer arithmetic.
///
/// Thresholds compare against this so that grey `n` lands exactly on `n * 1000`.
#[inline]
pub fn luma_milli(r: u8, g: u8, b: u8) -> u32 {
    299 * r as u32 + 587 * g as u32 + 114 * b as u32
}
