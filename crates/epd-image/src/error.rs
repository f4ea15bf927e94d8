//! Error type for image construction and payload decoding.
//!
//! Quantization and dithering never fail on a well-formed [`RgbaImage`](crate::RgbaImage);
//! errors only arise at the boundaries where buffers come from outside.

use std::fmt;

use crate::palette::ColorMode;

/// Error type for the epd-image public API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    /// Width or height is zero
    EmptyImage {
        width: usize,
        height: usize,
    },
    /// RGBA buffer length does not match `width * height * 4`
    BufferLength {
        expected: usize,
        actual: usize,
    },
    /// Encoded payload length does not match the layout for the given size and mode
    PayloadLength {
        mode: ColorMode,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::EmptyImage { width, height } => {
                write!(f, "image dimensions must be non-zero, got {}x{}", width, height)
            }
            ImageError::BufferLength { expected, actual } => {
                write!(
                    f,
                    "RGBA buffer length mismatch: expected {} bytes, got {}",
                    expected, actual
                )
            }
            ImageError::PayloadLength {
                mode,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "{} payload length mismatch: expected {} bytes, got {}",
                    mode, expected, actual
                )
            }
        }
    }
}

impl std::error::Error for ImageError {}
