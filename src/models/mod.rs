pub mod config;
pub mod driver;

pub use config::{AppConfig, DitherSettings, LinkConfig};
pub use driver::{DriverSpec, PlaneLayout};
