use epd_image::ColorMode;
use serde::Deserialize;

/// How a black/white/red panel takes its planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaneLayout {
    /// BW plane and red plane as two separate writes
    #[default]
    Separate,
    /// Both planes merged into one 2bpp stream
    Combined,
}

/// The panel the link talks to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DriverSpec {
    /// Human-readable panel name, used in logs
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub color_mode: ColorMode,
    pub plane_layout: PlaneLayout,
}

impl Default for DriverSpec {
    fn default() -> Self {
        Self {
            name: "4.2in black/white".to_string(),
            width: 400,
            height: 300,
            color_mode: ColorMode::TwoColor,
            plane_layout: PlaneLayout::Separate,
        }
    }
}

impl DriverSpec {
    /// Whether payloads go out as one merged plane.
    ///
    /// Only two- and three-color payloads have planes to merge.
    pub fn uses_combined_planes(&self, mode: ColorMode) -> bool {
        self.plane_layout == PlaneLayout::Combined
            && matches!(mode, ColorMode::TwoColor | ColorMode::ThreeColor)
    }

    /// Describe every way an image of this size and mode disagrees with the
    /// panel. An empty list means they match.
    pub fn mismatches(&self, width: usize, height: usize, mode: ColorMode) -> Vec<String> {
        let mut found = Vec::new();
        if (width, height) != (self.width, self.height) {
            found.push(format!(
                "image is {}x{} but {} is {}x{}",
                width, height, self.name, self.width, self.height
            ));
        }
        if mode != self.color_mode {
            found.push(format!(
                "dithering for {} but {} is {}",
                mode, self.name, self.color_mode
            ));
        }
        found
    }
}
