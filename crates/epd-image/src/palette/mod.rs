//! Device palettes
//!
//! Each [`ColorMode`] has a fixed table of [`PaletteEntry`] values: the RGB
//! color the panel renders plus the code the controller expects on the wire.

mod mode;
mod tables;

pub use mode::{ColorMode, ParseModeError};
pub use tables::{PaletteEntry, FOUR_COLOR, SIX_COLOR, THREE_COLOR, TWO_COLOR};
