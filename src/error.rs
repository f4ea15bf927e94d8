use epd_image::ImageError;
use thiserror::Error;

use crate::session::Phase;

/// Failures on the link to the device.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Not connected")]
    NotConnected,

    #[error("Disconnected")]
    Disconnected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Write rejected by device (status 0x{status:02x})")]
    Rejected { status: u8 },

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Whether the link is gone, as opposed to a single write failing.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            TransportError::NotConnected | TransportError::Disconnected | TransportError::Io(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Another operation is already in progress")]
    Busy,

    #[error("{phase} failed: {source}")]
    Transport {
        phase: Phase,
        #[source]
        source: TransportError,
    },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Image worker failed: {0}")]
    Worker(String),
}

/// Failures reading or writing PNG files.
#[derive(Debug, Error)]
pub enum ImageFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PNG decode error: {0}")]
    Decode(#[from] png::DecodingError),

    #[error("PNG encode error: {0}")]
    Encode(#[from] png::EncodingError),

    #[error("Unsupported PNG format: {0}")]
    Unsupported(String),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),
}
