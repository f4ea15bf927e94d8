//! End-to-end image processing: contrast, dither, pack.

use crate::dither::{self, DitherConfig};
use crate::error::ImageError;
use crate::image::RgbaImage;
use crate::pack::{self, plane_len};
use crate::palette::ColorMode;

/// A packed payload ready for transfer, with the geometry it was packed for.
///
/// Only built by the pipeline or by [`EncodedImage::from_bytes`], so the
/// payload length always matches `(width, height, mode)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    mode: ColorMode,
    width: usize,
    height: usize,
    bytes: Vec<u8>,
}

impl EncodedImage {
    /// Wrap an existing payload, checking its length against the layout.
    pub fn from_bytes(
        bytes: Vec<u8>,
        width: usize,
        height: usize,
        mode: ColorMode,
    ) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::EmptyImage { width, height });
        }
        let expected = pack::encoded_len(width, height, mode);
        if bytes.len() != expected {
            return Err(ImageError::PayloadLength {
                mode,
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            mode,
            width,
            height,
            bytes,
        })
    }

    #[inline]
    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Payload length in bytes. Never zero.
    #[allow(clippy::len_without_is_empty)]
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// The payload split into the planes the controller receives separately.
    ///
    /// Three-color payloads yield `[bw, red]`; every other mode is one plane.
    pub fn planes(&self) -> Vec<&[u8]> {
        match self.mode {
            ColorMode::ThreeColor => {
                let (bw, red) = self.bytes.split_at(plane_len(self.width, self.height));
                vec![bw, red]
            }
            _ => vec![&self.bytes[..]],
        }
    }

    /// Decode back into a preview image.
    pub fn decode(&self) -> Result<RgbaImage, ImageError> {
        pack::unpack(&self.bytes, self.width, self.height, self.mode)
    }
}

/// Output of [`process`]: the quantized preview and its packed form.
#[derive(Debug, Clone)]
pub struct Processed {
    pub preview: RgbaImage,
    pub encoded: EncodedImage,
}

/// Run the full pipeline over `source` without modifying it.
///
/// Contrast is applied to a working copy, the copy is dithered into the
/// palette of `config.color_mode`, and the result is packed.
pub fn process(source: &RgbaImage, config: &DitherConfig) -> Processed {
    let mut working = source.clone();
    if config.contrast != 1.0 {
        working.adjust_contrast(config.contrast);
    }
    let preview = dither::apply(&working, config.algorithm, config.strength, config.color_mode);
    let bytes = pack::pack(&preview, config.color_mode);
    Processed {
        encoded: EncodedImage {
            mode: config.color_mode,
            width: preview.width(),
            height: preview.height(),
            bytes,
        },
        preview,
    }
}

/// Shorthand for `process(source, config).encoded`.
pub fn encode(source: &RgbaImage, config: &DitherConfig) -> EncodedImage {
    process(source, config).encoded
}
