//! Device color modes.

use std::fmt;
use std::str::FromStr;

use super::tables::{PaletteEntry, FOUR_COLOR, SIX_COLOR, THREE_COLOR, TWO_COLOR};

/// The four color modes the controllers support.
///
/// The mode selects both the palette and the wire layout of the encoded
/// payload (see [`crate::pack`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ColorMode {
    /// Black and white, 1 bit per pixel.
    #[default]
    #[cfg_attr(feature = "serde", serde(alias = "bw", alias = "black_white"))]
    TwoColor,
    /// Black, white and red, two 1bpp planes.
    #[cfg_attr(feature = "serde", serde(alias = "bwr"))]
    ThreeColor,
    /// Black, white, red and yellow, 2 bits per pixel.
    #[cfg_attr(feature = "serde", serde(alias = "bwry"))]
    FourColor,
    /// Six inks, one code byte per pixel, column-major.
    SixColor,
}

impl ColorMode {
    /// All modes, in a stable order.
    pub const ALL: [ColorMode; 4] = [
        ColorMode::TwoColor,
        ColorMode::ThreeColor,
        ColorMode::FourColor,
        ColorMode::SixColor,
    ];

    /// The palette table for this mode.
    pub fn palette(self) -> &'static [PaletteEntry] {
        match self {
            ColorMode::TwoColor => &TWO_COLOR,
            ColorMode::ThreeColor => &THREE_COLOR,
            ColorMode::FourColor => &FOUR_COLOR,
            ColorMode::SixColor => &SIX_COLOR,
        }
    }

    /// Look up an entry by its wire code.
    pub fn entry_by_code(self, code: u8) -> Option<&'static PaletteEntry> {
        self.palette().iter().find(|e| e.code == code)
    }

    /// Look up an entry by ink name.
    pub fn entry_by_name(self, name: &str) -> Option<&'static PaletteEntry> {
        self.palette().iter().find(|e| e.name == name)
    }

    /// White entry of this palette, the decode fallback.
    pub fn white(self) -> &'static PaletteEntry {
        // Every table declares white second
        &self.palette()[1]
    }

    /// Stable identifier used in config files and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            ColorMode::TwoColor => "two_color",
            ColorMode::ThreeColor => "three_color",
            ColorMode::FourColor => "four_color",
            ColorMode::SixColor => "six_color",
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a color mode name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError(pub String);

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown color mode '{}' (expected two_color, three_color, four_color or six_color)",
            self.0
        )
    }
}

impl std::error::Error for ParseModeError {}

impl FromStr for ColorMode {
    type Err = ParseModeError;

    /// Parse a mode name. Case-insensitive; `-` and `_` are interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "two_color" | "bw" | "black_white" => Ok(ColorMode::TwoColor),
            "three_color" | "bwr" => Ok(ColorMode::ThreeColor),
            "four_color" | "bwry" => Ok(ColorMode::FourColor),
            "six_color" => Ok(ColorMode::SixColor),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}
