use epd_image::{ColorMode, DitherAlgorithm, DitherConfig};
use serde::Deserialize;
use std::path::Path;

use super::driver::DriverSpec;
use crate::error::ConfigError;
use crate::protocol::TransferConfig;

/// Application configuration loaded from YAML
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Connection to the controller bridge
    pub link: LinkConfig,

    /// Panel description
    pub driver: DriverSpec,

    /// Image pipeline settings
    pub dither: DitherSettings,
}

/// Connection and pacing parameters
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// `host:port` of the bridge
    pub address: String,

    /// Largest single write the link accepts, in bytes
    pub transport_unit_size: usize,

    /// Acknowledge every n-th image chunk
    pub interleave_count: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:7070".to_string(),
            transport_unit_size: 244,
            interleave_count: 50,
        }
    }
}

impl LinkConfig {
    /// Validate the pacing parameters.
    pub fn transfer(&self) -> Result<TransferConfig, ConfigError> {
        TransferConfig::new(self.transport_unit_size, self.interleave_count)
    }
}

/// Dither settings as written in the config file
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DitherSettings {
    pub algorithm: DitherAlgorithm,
    pub strength: f64,
    pub contrast: f64,
}

impl Default for DitherSettings {
    fn default() -> Self {
        Self {
            algorithm: DitherAlgorithm::FloydSteinberg,
            strength: 1.0,
            contrast: 1.0,
        }
    }
}

impl DitherSettings {
    /// Pipeline options for `mode`, with strength and contrast clamped.
    pub fn to_config(&self, mode: ColorMode) -> DitherConfig {
        DitherConfig::new(mode)
            .algorithm(self.algorithm)
            .strength(self.strength)
            .contrast(self.contrast)
    }
}

impl AppConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.link.transfer()?;
        if config.driver.width == 0 || config.driver.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "driver dimensions must be non-zero, got {}x{}",
                config.driver.width, config.driver.height
            )));
        }
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&content)?;
        tracing::info!(
            path = %path.display(),
            driver = %config.driver.name,
            mode = %config.driver.color_mode,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is missing
    /// or invalid
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(%e, path = %path.display(), "Failed to load config, using defaults");
                Self::default()
            }
        }
    }

    /// Pipeline options for the configured panel.
    pub fn dither_config(&self) -> DitherConfig {
        self.dither.to_config(self.driver.color_mode)
    }
}
