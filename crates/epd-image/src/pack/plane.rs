//! 1-bit plane layout shared by the two- and three-color modes.
//!
//! Row-major, MSB-first within each byte, every row padded to a whole byte.

use crate::image::RgbaImage;

/// Bytes per row of a 1bpp plane.
#[inline]
pub fn row_bytes(width: usize) -> usize {
    width.div_ceil(8)
}

/// Byte length of a 1bpp plane.
#[inline]
pub fn plane_len(width: usize, height: usize) -> usize {
    row_bytes(width) * height
}

#[inline]
fn bit_position(x: usize, y: usize, width: usize) -> (usize, u8) {
    (y * row_bytes(width) + x / 8, 0x80 >> (x % 8))
}

/// Build a plane where `set(rgb)` decides which pixels get a 1 bit.
///
/// Padding bits are always 0.
pub fn pack_plane(image: &RgbaImage, set: impl Fn([u8; 3]) -> bool) -> Vec<u8> {
    let width = image.width();
    let mut plane = vec![0u8; plane_len(width, image.height())];
    for y in 0..image.height() {
        for x in 0..width {
            if set(image.rgb(x, y)) {
                let (index, mask) = bit_position(x, y, width);
                plane[index] |= mask;
            }
        }
    }
    plane
}

/// Read the bit for pixel `(x, y)` of a plane.
#[inline]
pub fn bit(plane: &[u8], x: usize, y: usize, width: usize) -> bool {
    let (index, mask) = bit_position(x, y, width);
    plane[index] & mask != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_padding() {
        assert_eq!(row_bytes(1), 1);
        assert_eq!(row_bytes(8), 1);
        assert_eq!(row_bytes(9), 2);
        assert_eq!(plane_len(10, 3), 6);
    }

    #[test]
    fn test_msb_first() {
        let mut image = RgbaImage::filled(10, 2, [0, 0, 0, 255]);
        image.set_rgb(0, 0, [255, 255, 255]);
        image.set_rgb(9, 1, [255, 255, 255]);
        let plane = pack_plane(&image, |rgb| rgb[0] > 0);
        assert_eq!(plane, vec![0x80, 0x00, 0x00, 0x40]);
        assert!(bit(&plane, 0, 0, 10));
        assert!(bit(&plane, 9, 1, 10));
        assert!(!bit(&plane, 8, 1, 10));
    }
}
