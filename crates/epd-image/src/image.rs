//! RGBA pixel buffer.

use crate::error::ImageError;

/// A `width × height` grid of 8-bit RGBA samples, row-major, top-left origin.
///
/// # Example
///
/// ```
/// use epd_image::RgbaImage;
///
/// let mut image = RgbaImage::filled(2, 2, [255, 255, 255, 255]);
/// image.set_rgb(1, 0, [255, 0, 0]);
/// assert_eq!(image.pixel(1, 0), [255, 0, 0, 255]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl RgbaImage {
    /// Wrap an existing RGBA buffer.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::EmptyImage { width, height });
        }
        let expected = width * height * 4;
        if data.len() != expected {
            return Err(ImageError::BufferLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Create an image with every pixel set to `rgba`.
    ///
    /// Zero dimensions produce an empty buffer; callers that accept external
    /// sizes should go through [`RgbaImage::new`].
    pub fn filled(width: usize, height: usize, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(width * height * 4)
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw RGBA bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    fn offset(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height, "pixel ({x},{y}) out of bounds");
        (y * self.width + x) * 4
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    #[inline]
    pub fn rgb(&self, x: usize, y: usize) -> [u8; 3] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Overwrite the color channels of a pixel, keeping its alpha.
    #[inline]
    pub fn set_rgb(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        let i = self.offset(x, y);
        self.data[i..i + 3].copy_from_slice(&rgb);
    }

    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, rgba: [u8; 4]) {
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&rgba);
    }

    /// Stretch each color channel around mid-grey: `(c - 128) * factor + 128`.
    ///
    /// Alpha is untouched. Results are clamped to 0..=255.
    pub fn adjust_contrast(&mut self, factor: f64) {
        for px in self.data.chunks_exact_mut(4) {
            for c in &mut px[..3] {
                *c = clamp_channel((*c as f64 - 128.0) * factor + 128.0);
            }
        }
    }
}

/// Clamp a working channel value into a byte.
///
/// Rounds half to even, matching a clamped 8-bit canvas buffer.
#[inline]
pub(crate) fn clamp_channel(value: f64) -> u8 {
    value.clamp(0.0, 255.0).round_ties_even() as u8
}
