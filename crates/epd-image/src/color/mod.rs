//! Colour science for palette matching
//!
//! Input pixels are 8-bit sRGB. Palette matching happens in CIE Lab (D65),
//! reached through the usual chain:
//!
//! ```text
//! sRGB (8-bit) --gamma decode (LUT)--> linear RGB --matrix--> XYZ --> Lab
//! ```
//!
//! # Example
//!
//! ```
//! use epd_image::Lab;
//!
//! let white = Lab::from_rgb8(255, 255, 255);
//! assert!((white.l - 100.0).abs() < 0.01);
//! ```

mod lab;
mod lut;

pub use lab::{luma_milli, luminance, Lab};
pub use lut::srgb8_to_linear;
