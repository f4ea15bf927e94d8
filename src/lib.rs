//! epd-link - e-paper image encoder and transfer link
//!
//! Dithers images into a panel's palette (via `epd-image`), packs them into
//! the controller's wire layout and streams them over a paced, chunked link.
//! This library exposes modules for integration testing.

pub mod error;
pub mod image_file;
pub mod models;
pub mod protocol;
pub mod session;
pub mod transport;

pub use error::{ConfigError, ImageFileError, SessionError, TransportError};
pub use models::{AppConfig, DriverSpec, PlaneLayout};
pub use session::{DeviceSession, Direction, LogSink, Phase, ProgressSink, SessionState};
pub use transport::{MemoryTransport, StreamTransport, Transport, WriteMode};
