//! Test fixtures: images, drivers, sessions and a recording sink.

use std::sync::{Arc, Mutex};

use epd_image::{ColorMode, RgbaImage};
use epd_link::models::{DriverSpec, PlaneLayout};
use epd_link::protocol::TransferConfig;
use epd_link::transport::MemoryHandle;
use epd_link::{DeviceSession, Direction, LogSink, MemoryTransport, ProgressSink};

/// Small transport unit so even tiny images span several chunks
pub const UNIT: usize = 20;

/// Acknowledge every 4th chunk
pub const INTERLEAVE: usize = 4;

pub fn transfer() -> TransferConfig {
    TransferConfig::new(UNIT, INTERLEAVE).unwrap()
}

pub fn driver(mode: ColorMode, width: usize, height: usize) -> DriverSpec {
    DriverSpec {
        name: format!("test {width}x{height}"),
        width,
        height,
        color_mode: mode,
        plane_layout: PlaneLayout::Separate,
    }
}

/// Horizontal grey ramp with a red band in the middle rows
pub fn test_image(width: usize, height: usize) -> RgbaImage {
    let mut image = RgbaImage::filled(width, height, [0, 0, 0, 255]);
    for y in 0..height {
        for x in 0..width {
            let v = (x * 255 / (width - 1).max(1)) as u8;
            if y >= height / 3 && y < 2 * height / 3 {
                image.set_rgb(x, y, [230, 20, 20]);
            } else {
                image.set_rgb(x, y, [v, v, v]);
            }
        }
    }
    image
}

/// A session over an in-memory transport, plus its control handle
pub fn memory_session(driver: DriverSpec) -> (Arc<DeviceSession<MemoryTransport>>, MemoryHandle) {
    let transport = MemoryTransport::new();
    let handle = transport.handle();
    (Arc::new(DeviceSession::new(transport, driver, transfer())), handle)
}

/// Sink that records every log line and progress value
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    lines: Arc<Mutex<Vec<(String, Direction)>>>,
    progress: Arc<Mutex<Vec<u8>>>,
}

impl Recorder {
    pub fn lines(&self) -> Vec<(String, Direction)> {
        self.lines.lock().unwrap().clone()
    }

    pub fn progress_values(&self) -> Vec<u8> {
        self.progress.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|(line, _)| line.contains(needle))
    }

    pub fn count(&self, direction: Direction) -> usize {
        self.lines().iter().filter(|(_, d)| *d == direction).count()
    }
}

impl LogSink for Recorder {
    fn log(&self, message: &str, direction: Direction) {
        self.lines
            .lock()
            .unwrap()
            .push((message.to_string(), direction));
    }
}

impl ProgressSink for Recorder {
    fn progress(&self, percent: u8) {
        self.progress.lock().unwrap().push(percent);
    }
}
