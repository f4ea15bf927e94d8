// Generated LUT tables and pixel-index loops read better as written
#![allow(clippy::excessive_precision, clippy::needless_range_loop)]

//! epd-image: palette quantization, dithering and bit-packing for e-paper
//! display controllers
//!
//! Turns an arbitrary RGBA raster into the exact byte payload a panel
//! controller expects, and back into a preview.
//!
//! # Quick Start
//!
//! ```
//! use epd_image::{process, ColorMode, DitherAlgorithm, DitherConfig, RgbaImage};
//!
//! let source = RgbaImage::filled(16, 8, [128, 128, 128, 255]);
//! let config = DitherConfig::new(ColorMode::ThreeColor)
//!     .algorithm(DitherAlgorithm::FloydSteinberg)
//!     .strength(1.0);
//!
//! let out = process(&source, &config);
//! assert_eq!(out.encoded.bytes().len(), 2 * 2 * 8);
//! assert_eq!(out.encoded.decode().unwrap(), out.preview);
//! ```
//!
//! # Pipeline
//!
//! ```text
//! RGBA source
//!     |
//!     v
//! contrast            ((c - 128) * factor + 128, clamped)
//!     |
//!     v
//! dither              (error diffusion / Bayer / none, nearest color in weighted Lab)
//!     |
//!     v
//! quantized preview   (every pixel is a palette color)
//!     |
//!     v
//! pack                (mode-specific wire layout, see [`pack`])
//! ```
//!
//! # Color Modes
//!
//! | Mode        | Inks                                       |
//! |-------------|--------------------------------------------|
//! | two-color   | black, white                               |
//! | three-color | black, white, red                          |
//! | four-color  | black, white, red, yellow                  |
//! | six-color   | black, white, red, yellow, blue, green     |
//!
//! # Color Matching
//!
//! Distances are computed in CIE Lab (D65) with lightness weighted down and
//! chroma weighted up:
//!
//! ```text
//! d = sqrt(0.2 * dL² + 3 * da² + 3 * db²)
//! ```
//!
//! Small palettes on e-paper are mostly separated by hue, so a pure
//! lightness difference should not beat a hue match. Three-color mode skips
//! Lab entirely and uses a red test followed by a luma split; modes with a
//! blue ink pin dark saturated blues to it.

mod color;
pub mod dither;
mod error;
mod image;
pub mod pack;
mod palette;
mod pipeline;
mod quantize;


pub use color::{luminance, srgb8_to_linear, Lab};
pub use dither::{DitherAlgorithm, DitherConfig, ParseAlgorithmError};
pub use error::ImageError;
pub use image::RgbaImage;
pub use pack::{encoded_len, pack, unpack};
pub use palette::{
    ColorMode, PaletteEntry, ParseModeError, FOUR_COLOR, SIX_COLOR, THREE_COLOR, TWO_COLOR,
};
pub use pipeline::{encode, process, EncodedImage, Processed};
pub use quantize::closest;
