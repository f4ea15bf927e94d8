//! Nearest-palette color quantization.
//!
//! [`closest`] maps any RGB triple to exactly one palette entry of the
//! requested [`ColorMode`]. The generic path is a weighted Lab search; two
//! mode-specific shortcuts run first because red and blue detection in Lab is
//! unreliable against these panels' inks.

use std::sync::OnceLock;

use crate::color::{luma_milli, Lab};
use crate::palette::{ColorMode, PaletteEntry};

/// Lab values of each palette entry, computed once per mode.
fn palette_lab(mode: ColorMode) -> &'static [Lab] {
    static TABLES: [OnceLock<Vec<Lab>>; 4] = [
        OnceLock::new(),
        OnceLock::new(),
        OnceLock::new(),
        OnceLock::new(),
    ];
    let slot = match mode {
        ColorMode::TwoColor => 0,
        ColorMode::ThreeColor => 1,
        ColorMode::FourColor => 2,
        ColorMode::SixColor => 3,
    };
    TABLES[slot].get_or_init(|| {
        mode.palette()
            .iter()
            .map(|e| Lab::from_rgb8(e.r, e.g, e.b))
            .collect()
    })
}

/// Find the palette entry closest to `(r, g, b)` for `mode`.
///
/// Deterministic and total. On equal distances the entry declared first in
/// the palette wins.
///
/// # Example
///
/// ```
/// use epd_image::{closest, ColorMode};
///
/// assert_eq!(closest(250, 10, 10, ColorMode::SixColor).name, "red");
/// assert_eq!(closest(30, 30, 30, ColorMode::TwoColor).name, "black");
/// ```
pub fn closest(r: u8, g: u8, b: u8, mode: ColorMode) -> &'static PaletteEntry {
    let palette = mode.palette();

    if mode == ColorMode::ThreeColor {
        return closest_three_color(r, g, b, palette);
    }

    // Dark saturated blues drift towards black in Lab; pin them to the blue ink
    if r < 50 && g < 150 && b > 100 {
        if let Some(blue) = mode.entry_by_name("blue") {
            return blue;
        }
    }

    let target = Lab::from_rgb8(r, g, b);
    let labs = palette_lab(mode);
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, lab) in labs.iter().enumerate() {
        let distance = target.weighted_distance(*lab);
        // Strict comparison keeps the first of equal candidates
        if distance < best_distance {
            best_distance = distance;
            best = i;
        }
    }
    &palette[best]
}

/// Three-color panels skip Lab entirely: a red test, then a luma split.
fn closest_three_color(r: u8, g: u8, b: u8, palette: &'static [PaletteEntry]) -> &'static PaletteEntry {
    let (r2, g3, b3) = (2 * r as u32, 3 * g as u32, 3 * b as u32);
    if r > 120 && r2 > g3 && r2 > b3 {
        return &palette[2];
    }
    if luma_milli(r, g, b) < 128_000 {
        &palette[0]
    } else {
        &palette[1]
    }
}
