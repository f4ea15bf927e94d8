//! Dithering algorithms.
//!
//! Four error diffusion kernels plus ordered Bayer dithering and a plain
//! quantize-only mode. Every algorithm reads a source [`RgbaImage`] and
//! returns a new, palette-quantized image; the source is never modified, so a
//! caller can re-run the pipeline with different settings on the same input.
//!
//! # Error diffusion
//!
//! All kernels share one loop ([`diffuse`]): pixels are visited in raster
//! order, quantized with [`closest`], and `(original - quantized) * strength`
//! is spread to unvisited neighbors in a scratch copy. Kernels differ only in
//! their weights and their [`PassMode`].
//!
//! # Example
//!
//! ```
//! use epd_image::{dither, ColorMode, DitherAlgorithm, RgbaImage};
//!
//! let grey = RgbaImage::filled(8, 8, [128, 128, 128, 255]);
//! let out = dither::apply(&grey, DitherAlgorithm::FloydSteinberg, 1.0, ColorMode::TwoColor);
//! assert_eq!(out.width(), 8);
//! ```

mod bayer;
mod kernel;

pub use kernel::*;

use std::fmt;
use std::str::FromStr;

use crate::image::{clamp_channel, RgbaImage};
use crate::palette::ColorMode;
use crate::quantize::closest;

/// Dither algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DitherAlgorithm {
    /// Floyd-Steinberg error diffusion, two passes.
    #[default]
    FloydSteinberg,
    /// Atkinson error diffusion (75% propagation), single pass.
    Atkinson,
    /// Stucki error diffusion, two passes.
    Stucki,
    /// Jarvis-Judice-Ninke error diffusion, two passes.
    #[cfg_attr(feature = "serde", serde(alias = "jarvis"))]
    JarvisJudiceNinke,
    /// Ordered 8×8 Bayer dithering.
    Bayer,
    /// Quantize each pixel directly.
    None,
}

impl DitherAlgorithm {
    pub const ALL: [DitherAlgorithm; 6] = [
        DitherAlgorithm::FloydSteinberg,
        DitherAlgorithm::Atkinson,
        DitherAlgorithm::Stucki,
        DitherAlgorithm::JarvisJudiceNinke,
        DitherAlgorithm::Bayer,
        DitherAlgorithm::None,
    ];

    /// Diffusion kernel, for the error diffusion algorithms.
    pub fn kernel(self) -> Option<&'static DiffusionKernel> {
        match self {
            DitherAlgorithm::FloydSteinberg => Some(&FLOYD_STEINBERG),
            DitherAlgorithm::Atkinson => Some(&ATKINSON),
            DitherAlgorithm::Stucki => Some(&STUCKI),
            DitherAlgorithm::JarvisJudiceNinke => Some(&JARVIS_JUDICE_NINKE),
            DitherAlgorithm::Bayer | DitherAlgorithm::None => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DitherAlgorithm::FloydSteinberg => "floyd_steinberg",
            DitherAlgorithm::Atkinson => "atkinson",
            DitherAlgorithm::Stucki => "stucki",
            DitherAlgorithm::JarvisJudiceNinke => "jarvis_judice_ninke",
            DitherAlgorithm::Bayer => "bayer",
            DitherAlgorithm::None => "none",
        }
    }
}

impl fmt::Display for DitherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an algorithm name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAlgorithmError(pub String);

impl fmt::Display for ParseAlgorithmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown dither algorithm '{}'", self.0)
    }
}

impl std::error::Error for ParseAlgorithmError {}

impl FromStr for DitherAlgorithm {
    type Err = ParseAlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "floyd_steinberg" | "floydsteinberg" | "fs" => Ok(DitherAlgorithm::FloydSteinberg),
            "atkinson" => Ok(DitherAlgorithm::Atkinson),
            "stucki" => Ok(DitherAlgorithm::Stucki),
            "jarvis_judice_ninke" | "jarvis" | "jjn" => Ok(DitherAlgorithm::JarvisJudiceNinke),
            "bayer" | "ordered" => Ok(DitherAlgorithm::Bayer),
            "none" | "off" => Ok(DitherAlgorithm::None),
            _ => Err(ParseAlgorithmError(s.to_string())),
        }
    }
}

/// Lowest accepted error/perturbation strength.
pub const MIN_STRENGTH: f64 = 0.0;
/// Highest accepted error/perturbation strength.
pub const MAX_STRENGTH: f64 = 5.0;
/// Lowest accepted contrast factor.
pub const MIN_CONTRAST: f64 = 0.5;
/// Highest accepted contrast factor.
pub const MAX_CONTRAST: f64 = 2.0;

/// Per-invocation image processing settings.
///
/// Values outside the accepted ranges are clamped by the builder methods.
///
/// ```
/// use epd_image::{ColorMode, DitherAlgorithm, DitherConfig};
///
/// let config = DitherConfig::new(ColorMode::SixColor)
///     .algorithm(DitherAlgorithm::Atkinson)
///     .strength(9.0)
///     .contrast(1.2);
/// assert_eq!(config.strength, 5.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DitherConfig {
    pub algorithm: DitherAlgorithm,
    /// Error (or Bayer perturbation) multiplier, 0.0..=5.0
    pub strength: f64,
    /// Contrast factor applied before dithering, 0.5..=2.0
    pub contrast: f64,
    pub color_mode: ColorMode,
}

impl Default for DitherConfig {
    fn default() -> Self {
        Self {
            algorithm: DitherAlgorithm::default(),
            strength: 1.0,
            contrast: 1.0,
            color_mode: ColorMode::default(),
        }
    }
}

impl DitherConfig {
    pub fn new(color_mode: ColorMode) -> Self {
        Self {
            color_mode,
            ..Self::default()
        }
    }

    #[inline]
    pub fn algorithm(mut self, algorithm: DitherAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    #[inline]
    pub fn strength(mut self, strength: f64) -> Self {
        self.strength = strength.clamp(MIN_STRENGTH, MAX_STRENGTH);
        self
    }

    #[inline]
    pub fn contrast(mut self, contrast: f64) -> Self {
        self.contrast = contrast.clamp(MIN_CONTRAST, MAX_CONTRAST);
        self
    }

    #[inline]
    pub fn color_mode(mut self, mode: ColorMode) -> Self {
        self.color_mode = mode;
        self
    }
}

/// Dither `source` into the palette of `mode`.
///
/// Returns a new image whose every pixel is a palette color; alpha is copied
/// from the source.
pub fn apply(
    source: &RgbaImage,
    algorithm: DitherAlgorithm,
    strength: f64,
    mode: ColorMode,
) -> RgbaImage {
    match algorithm {
        DitherAlgorithm::Bayer => bayer::bayer(source, strength, mode),
        DitherAlgorithm::None => quantize_only(source, mode),
        _ => match algorithm.kernel() {
            Some(kernel) => diffuse(source, kernel, strength, mode),
            None => quantize_only(source, mode),
        },
    }
}

/// Map every pixel to its nearest palette color.
pub fn quantize_only(source: &RgbaImage, mode: ColorMode) -> RgbaImage {
    let mut output = source.clone();
    for y in 0..source.height() {
        for x in 0..source.width() {
            let [r, g, b] = source.rgb(x, y);
            output.set_rgb(x, y, closest(r, g, b, mode).rgb());
        }
    }
    output
}

/// Core error diffusion loop parameterized by kernel.
pub fn diffuse(
    source: &RgbaImage,
    kernel: &DiffusionKernel,
    strength: f64,
    mode: ColorMode,
) -> RgbaImage {
    let width = source.width();
    let height = source.height();
    let divisor = kernel.divisor as f64;

    // Error accumulates here; `output` only ever receives palette colors
    let mut scratch = source.clone();
    let mut output = source.clone();

    for y in 0..height {
        for x in 0..width {
            let current = scratch.rgb(x, y);
            let [r, g, b] = current;
            let quantized = closest(r, g, b, mode).rgb();

            if kernel.pass_mode == PassMode::Immediate {
                output.set_rgb(x, y, quantized);
            }

            let error = [0usize, 1, 2].map(|c| (current[c] as f64 - quantized[c] as f64) * strength);

            for &(dx, dy, weight) in kernel.entries {
                let nx = x as i64 + dx as i64;
                let ny = y + dy as usize;
                if nx < 0 || nx as usize >= width || ny >= height {
                    continue;
                }
                let nx = nx as usize;
                let share = weight as f64 / divisor;
                let neighbor = scratch.rgb(nx, ny);
                let adjusted = [0usize, 1, 2].map(|c| clamp_channel(neighbor[c] as f64 + error[c] * share));
                scratch.set_rgb(nx, ny, adjusted);
            }
        }
    }

    if kernel.pass_mode == PassMode::Deferred {
        for y in 0..height {
            for x in 0..width {
                let [r, g, b] = scratch.rgb(x, y);
                output.set_rgb(x, y, closest(r, g, b, mode).rgb());
            }
        }
    }

    output
}
