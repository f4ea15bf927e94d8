//! Static palette tables.
//!
//! Declaration order matters: the quantizer breaks distance ties in favour of
//! the earlier entry.

/// A color the panel can physically render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaletteEntry {
    /// Ink name, used in logs and previews
    pub name: &'static str,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Value the controller expects for this ink
    pub code: u8,
}

impl PaletteEntry {
    const fn new(name: &'static str, r: u8, g: u8, b: u8, code: u8) -> Self {
        Self { name, r, g, b, code }
    }

    /// RGB channels as an array.
    #[inline]
    pub fn rgb(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Opaque RGBA pixel for this ink.
    #[inline]
    pub fn rgba(&self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }
}

const BLACK: PaletteEntry = PaletteEntry::new("black", 0, 0, 0, 0x00);
const WHITE: PaletteEntry = PaletteEntry::new("white", 255, 255, 255, 0x01);
const RED: PaletteEntry = PaletteEntry::new("red", 255, 0, 0, 0x02);

/// Black/white panels.
pub static TWO_COLOR: [PaletteEntry; 2] = [BLACK, WHITE];

/// Black/white/red panels.
pub static THREE_COLOR: [PaletteEntry; 3] = [BLACK, WHITE, RED];

/// Black/white/red/yellow panels (2 bits per pixel on the wire).
pub static FOUR_COLOR: [PaletteEntry; 4] = [
    BLACK,
    WHITE,
    PaletteEntry::new("red", 255, 0, 0, 0x03),
    PaletteEntry::new("yellow", 255, 255, 0, 0x02),
];

/// Six-ink panels. Codes are the 8-bit luma of each ink, which is what the
/// controller's color lookup is keyed on.
pub static SIX_COLOR: [PaletteEntry; 6] = [
    BLACK,
    PaletteEntry::new("white", 255, 255, 255, 0xff),
    PaletteEntry::new("red", 255, 0, 0, 0x4c),
    PaletteEntry::new("yellow", 255, 255, 0, 0xe2),
    PaletteEntry::new("blue", 0, 0, 255, 0x1d),
    PaletteEntry::new("green", 0, 255, 0, 0x96),
];
