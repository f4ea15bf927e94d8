//! Wire layouts for each [`ColorMode`], and their inverse for previews.
//!
//! | Mode        | Layout                                                    | Length                   |
//! |-------------|-----------------------------------------------------------|--------------------------|
//! | two-color   | 1bpp, row-major, MSB-first, rows padded to a byte          | `ceil(w/8) * h`          |
//! | three-color | BW plane then red plane, each as two-color                 | `2 * ceil(w/8) * h`      |
//! | four-color  | 2bpp, 4 pixels per byte, first pixel in the top bits       | `ceil(w*h/4)`            |
//! | six-color   | 1 code byte per pixel, column-major, bottom row first      | `w * h`                  |
//!
//! The payload length depends only on `(width, height, mode)`, never on pixel
//! content, so transfer sizes are known before packing.
//!
//! [`pack`] and [`unpack`] share their index arithmetic; `unpack(pack(x)) == x`
//! for any palette-quantized `x`.

mod combined;
mod plane;

pub use combined::{combine_planes, split_combined, CODE_BLACK, CODE_RED, CODE_WHITE};
pub use plane::{plane_len, row_bytes};

use crate::color::luma_milli;
use crate::error::ImageError;
use crate::image::RgbaImage;
use crate::palette::{ColorMode, PaletteEntry};
use crate::quantize::closest;

/// Luma (scaled by 1000, see [`crate::luma_milli`]) at or above which a
/// pixel is white in the 1bpp planes.
pub const WHITE_THRESHOLD: u32 = 140_000;

/// Encoded payload length for an image of the given size.
pub fn encoded_len(width: usize, height: usize, mode: ColorMode) -> usize {
    match mode {
        ColorMode::TwoColor => plane_len(width, height),
        ColorMode::ThreeColor => 2 * plane_len(width, height),
        ColorMode::FourColor => (width * height).div_ceil(4),
        ColorMode::SixColor => width * height,
    }
}

/// BW plane bit: 1 for white.
#[inline]
pub fn is_white([r, g, b]: [u8; 3]) -> bool {
    luma_milli(r, g, b) >= WHITE_THRESHOLD
}

/// Red detection used by the three-color red plane.
#[inline]
pub fn is_red([r, g, b]: [u8; 3]) -> bool {
    r > 160 && r > g && r > b
}

/// Four-color packing position of pixel `(x, y)`: `(byte index, shift)`.
#[inline]
fn quad_position(x: usize, y: usize, width: usize) -> (usize, u32) {
    let i = y * width + x;
    (i / 4, 6 - (i % 4) as u32 * 2)
}

/// Six-color packing index of pixel `(x, y)`.
#[inline]
fn column_index(x: usize, y: usize, height: usize) -> usize {
    x * height + (height - 1 - y)
}

/// Serialize a quantized image into the wire layout of `mode`.
pub fn pack(image: &RgbaImage, mode: ColorMode) -> Vec<u8> {
    match mode {
        ColorMode::TwoColor => plane::pack_plane(image, is_white),
        ColorMode::ThreeColor => {
            let mut out = plane::pack_plane(image, is_white);
            out.extend(plane::pack_plane(image, |rgb| !is_red(rgb)));
            out
        }
        ColorMode::FourColor => pack_four_color(image),
        ColorMode::SixColor => pack_six_color(image),
    }
}

fn pack_four_color(image: &RgbaImage) -> Vec<u8> {
    let (width, height) = (image.width(), image.height());
    let mut out = vec![0u8; encoded_len(width, height, ColorMode::FourColor)];
    for y in 0..height {
        for x in 0..width {
            let [r, g, b] = image.rgb(x, y);
            let code = closest(r, g, b, ColorMode::FourColor).code & 0b11;
            let (index, shift) = quad_position(x, y, width);
            out[index] |= code << shift;
        }
    }
    out
}

fn pack_six_color(image: &RgbaImage) -> Vec<u8> {
    let (width, height) = (image.width(), image.height());
    let mut out = vec![0u8; encoded_len(width, height, ColorMode::SixColor)];
    for y in 0..height {
        for x in 0..width {
            let [r, g, b] = image.rgb(x, y);
            out[column_index(x, y, height)] = closest(r, g, b, ColorMode::SixColor).code;
        }
    }
    out
}

/// Reconstruct a preview image from an encoded payload.
///
/// Codes with no palette entry decode as white.
pub fn unpack(
    data: &[u8],
    width: usize,
    height: usize,
    mode: ColorMode,
) -> Result<RgbaImage, ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::EmptyImage { width, height });
    }
    let expected = encoded_len(width, height, mode);
    if data.len() != expected {
        return Err(ImageError::PayloadLength {
            mode,
            expected,
            actual: data.len(),
        });
    }

    let palette = mode.palette();
    let white = mode.white();
    let mut image = RgbaImage::filled(width, height, white.rgba());

    for y in 0..height {
        for x in 0..width {
            let entry: &PaletteEntry = match mode {
                ColorMode::TwoColor => {
                    if plane::bit(data, x, y, width) {
                        white
                    } else {
                        &palette[0]
                    }
                }
                ColorMode::ThreeColor => {
                    let (bw, red) = data.split_at(plane_len(width, height));
                    if !plane::bit(red, x, y, width) {
                        &palette[2]
                    } else if plane::bit(bw, x, y, width) {
                        white
                    } else {
                        &palette[0]
                    }
                }
                ColorMode::FourColor => {
                    let (index, shift) = quad_position(x, y, width);
                    let code = (data[index] >> shift) & 0b11;
                    mode.entry_by_code(code).unwrap_or(white)
                }
                ColorMode::SixColor => {
                    let code = data[column_index(x, y, height)];
                    mode.entry_by_code(code).unwrap_or(white)
                }
            };
            image.set_pixel(x, y, entry.rgba());
        }
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: [u8; 4] = [0, 0, 0, 255];
    const WHITE: [u8; 4] = [255, 255, 255, 255];
    const RED: [u8; 4] = [255, 0, 0, 255];

    #[test]
    fn test_two_color_solid_black() {
        let image = RgbaImage::filled(4, 2, BLACK);
        assert_eq!(pack(&image, ColorMode::TwoColor), vec![0x00, 0x00]);
    }

    #[test]
    fn test_two_color_solid_white() {
        let image = RgbaImage::filled(4, 2, WHITE);
        assert_eq!(pack(&image, ColorMode::TwoColor), vec![0xF0, 0xF0]);
    }

    #[test]
    fn test_two_color_threshold() {
        let mut image = RgbaImage::filled(2, 1, BLACK);
        image.set_rgb(0, 0, [140, 140, 140]);
        image.set_rgb(1, 0, [139, 139, 139]);
        assert_eq!(pack(&image, ColorMode::TwoColor), vec![0x80]);
    }

    #[test]
    fn test_six_color_column_major_bottom_up() {
        let mut image = RgbaImage::filled(2, 2, WHITE);
        image.set_pixel(0, 0, RED);
        let packed = pack(&image, ColorMode::SixColor);
        assert_eq!(packed, vec![0xff, 0x4c, 0xff, 0xff]);
    }

    #[test]
    fn test_six_color_index_formula() {
        // 3 wide, 2 tall: column 2, top row lands at 2*2 + (2-1-0) = 5
        let mut image = RgbaImage::filled(3, 2, WHITE);
        image.set_pixel(2, 0, BLACK);
        let packed = pack(&image, ColorMode::SixColor);
        assert_eq!(packed[5], 0x00);
        assert_eq!(packed.iter().filter(|&&b| b == 0xff).count(), 5);
    }

    #[test]
    fn test_four_color_bit_pairs() {
        // Row: black, white, yellow, red -> 00 01 10 11
        let mut image = RgbaImage::filled(4, 1, BLACK);
        image.set_pixel(1, 0, WHITE);
        image.set_rgb(2, 0, [255, 255, 0]);
        image.set_pixel(3, 0, RED);
        assert_eq!(pack(&image, ColorMode::FourColor), vec![0b00_01_10_11]);
    }

    #[test]
    fn test_three_color_planes() {
        let mut image = RgbaImage::filled(8, 1, WHITE);
        image.set_pixel(0, 0, BLACK);
        image.set_pixel(1, 0, RED);
        let packed = pack(&image, ColorMode::ThreeColor);
        // BW: black and red are both dark; red plane: only pixel 1 cleared
        assert_eq!(packed, vec![0b0011_1111, 0b1011_1111]);
    }

    #[test]
    fn test_three_color_red_wins_on_decode() {
        let data = [0xFF, 0x7F];
        let image = unpack(&data, 8, 1, ColorMode::ThreeColor).unwrap();
        assert_eq!(image.pixel(0, 0), RED);
        assert_eq!(image.pixel(1, 0), WHITE);
    }

    #[test]
    fn test_three_color_light_reds_stay_red() {
        // Bright enough to set the BW bit, still red by the plane rule
        let light_reds = [[250, 120, 120], [200, 150, 150], [161, 160, 160]];
        let mut image = RgbaImage::filled(8, 1, WHITE);
        for (x, rgb) in light_reds.iter().enumerate() {
            assert!(is_white(*rgb) && is_red(*rgb), "{rgb:?}");
            image.set_rgb(x, 0, *rgb);
        }

        let packed = pack(&image, ColorMode::ThreeColor);
        assert_eq!(packed, vec![0xFF, 0b0001_1111]);

        let decoded = unpack(&packed, 8, 1, ColorMode::ThreeColor).unwrap();
        for x in 0..light_reds.len() {
            assert_eq!(decoded.pixel(x, 0), RED, "pixel {x}");
        }
        assert_eq!(decoded.pixel(3, 0), WHITE);
    }

    #[test]
    fn test_unmatched_code_decodes_white() {
        let image = unpack(&[0x42], 1, 1, ColorMode::SixColor).unwrap();
        assert_eq!(image.pixel(0, 0), WHITE);
    }

    #[test]
    fn test_unpack_rejects_wrong_length() {
        assert_eq!(
            unpack(&[0; 3], 2, 2, ColorMode::SixColor),
            Err(ImageError::PayloadLength {
                mode: ColorMode::SixColor,
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_encoded_len() {
        assert_eq!(encoded_len(4, 2, ColorMode::TwoColor), 2);
        assert_eq!(encoded_len(9, 2, ColorMode::ThreeColor), 8);
        assert_eq!(encoded_len(5, 3, ColorMode::FourColor), 4);
        assert_eq!(encoded_len(5, 3, ColorMode::SixColor), 15);
        assert_eq!(encoded_len(400, 300, ColorMode::ThreeColor), 30_000);
    }

    #[test]
    fn test_packed_length_matches_encoded_len() {
        for mode in ColorMode::ALL {
            for (w, h) in [(1, 1), (3, 5), (8, 2), (13, 7)] {
                let image = RgbaImage::filled(w, h, [90, 30, 200, 255]);
                assert_eq!(pack(&image, mode).len(), encoded_len(w, h, mode), "{mode} {w}x{h}");
            }
        }
    }
}
