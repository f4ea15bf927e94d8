//! Device session: owns the transport and runs one operation at a time.
//!
//! ```text
//! Idle -> Sending(encode -> init -> plane 1 -> plane 2 -> refresh) -> Idle
//! Idle -> Sending(command) -> Idle
//! ```
//!
//! A second operation started while one is in flight fails immediately with
//! [`SessionError::Busy`]. Any failed write aborts the remaining steps; the
//! session is back in `Idle` when the call returns, whether it succeeded,
//! failed, or its future was dropped.

use std::borrow::Cow;
use std::fmt;
use std::sync::Mutex as StdMutex;

use chrono::{DateTime, FixedOffset};
use epd_image::{pack::combine_planes, ColorMode, DitherConfig, EncodedImage, RgbaImage};
use tokio::sync::{watch, Mutex, MutexGuard};

use crate::error::{ConfigError, SessionError, TransportError};
use crate::models::{AppConfig, DriverSpec};
use crate::protocol::{
    command, set_time_payload, Opcode, PlaneFlag, TimeSyncMode, TransferConfig,
};
use crate::transport::{write_chunked, ChunkProgress, Transport, WriteMode};

/// Step of an operation, reported in state and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Running the image pipeline
    Encode,
    Init,
    Plane1,
    Plane2,
    Refresh,
    /// A single device command
    Command(Opcode),
    /// Caller-supplied bytes
    Raw,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Encode => f.write_str("encode"),
            Phase::Init => f.write_str("init"),
            Phase::Plane1 => f.write_str("plane 1"),
            Phase::Plane2 => f.write_str("plane 2"),
            Phase::Refresh => f.write_str("refresh"),
            Phase::Command(op) => write!(f, "{op}"),
            Phase::Raw => f.write_str("raw write"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Sending(Phase),
}

/// Direction of a wire log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Host to device
    Outgoing,
    /// Device to host
    Incoming,
    /// Local status, nothing on the wire
    Local,
}

impl Direction {
    pub fn arrow(self) -> &'static str {
        match self {
            Direction::Outgoing => "⇑",
            Direction::Incoming => "⇓",
            Direction::Local => "",
        }
    }
}

/// Local log line emitted when an operation finds no link.
pub const NOT_CONNECTED: &str = "not connected";

/// Local log line emitted when the link drops during an operation.
pub const DISCONNECTED: &str = "disconnected";

/// Prefix `message` with the arrow for `direction`.
pub fn format_line(message: &str, direction: Direction) -> String {
    match direction.arrow() {
        "" => message.to_string(),
        arrow => format!("{arrow} {message}"),
    }
}

/// Receives transfer progress as a percentage.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, percent: u8);
}

/// Receives one line per wire write, notification and status change.
pub trait LogSink: Send + Sync {
    fn log(&self, message: &str, direction: Direction);
}

impl<F> ProgressSink for F
where
    F: Fn(u8) + Send + Sync,
{
    fn progress(&self, percent: u8) {
        self(percent)
    }
}

impl<F> LogSink for F
where
    F: Fn(&str, Direction) + Send + Sync,
{
    fn log(&self, message: &str, direction: Direction) {
        self(message, direction)
    }
}

/// Sink that forwards everything to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn progress(&self, percent: u8) {
        tracing::debug!(percent, "Progress");
    }
}

impl LogSink for TracingSink {
    fn log(&self, message: &str, direction: Direction) {
        tracing::info!(target: "epd_link::wire", "{}", format_line(message, direction));
    }
}

/// One plane as it goes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaneWrite<'a> {
    pub flag: PlaneFlag,
    pub bytes: Cow<'a, [u8]>,
}

/// Split an encoded payload into the plane writes the controller expects.
///
/// With `combined` set, two- and three-color payloads are merged into a
/// single 2bpp stream; two-color payloads get an all-white red plane.
pub fn plane_writes(encoded: &EncodedImage, combined: bool) -> Vec<PlaneWrite<'_>> {
    match (encoded.mode(), encoded.planes().as_slice()) {
        (ColorMode::TwoColor, &[bw]) if combined => {
            let red = vec![0xFF; bw.len()];
            vec![PlaneWrite {
                flag: PlaneFlag::BlackWhite,
                bytes: Cow::Owned(combine_planes(bw, &red)),
            }]
        }
        (ColorMode::ThreeColor, &[bw, red]) if combined => vec![PlaneWrite {
            flag: PlaneFlag::BlackWhite,
            bytes: Cow::Owned(combine_planes(bw, red)),
        }],
        (ColorMode::TwoColor, _) => vec![borrowed(PlaneFlag::BlackWhite, encoded.bytes())],
        (ColorMode::ThreeColor, &[bw, red]) => vec![
            borrowed(PlaneFlag::BlackWhite, bw),
            borrowed(PlaneFlag::Color, red),
        ],
        _ => vec![borrowed(PlaneFlag::Color, encoded.bytes())],
    }
}

fn borrowed(flag: PlaneFlag, bytes: &[u8]) -> PlaneWrite<'_> {
    PlaneWrite {
        flag,
        bytes: Cow::Borrowed(bytes),
    }
}

fn percent(sent: usize, total: usize) -> u8 {
    if total == 0 {
        100
    } else {
        (sent.min(total) * 100 / total) as u8
    }
}

fn chunk_line(chunk: &ChunkProgress<'_>) -> String {
    format!(
        "{} <{} image bytes> [{}/{}]",
        hex::encode(&chunk.frame[..2]),
        chunk.frame.len() - 2,
        chunk.index + 1,
        chunk.count
    )
}

/// Resets the session state to `Idle` when dropped.
struct StateGuard<'a> {
    state: &'a StdMutex<SessionState>,
}

impl StateGuard<'_> {
    fn enter(&mut self, phase: Phase) {
        tracing::debug!(%phase, "Session phase");
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = SessionState::Sending(phase);
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = SessionState::Idle;
    }
}

/// A connection to one display controller.
pub struct DeviceSession<T> {
    transport: Mutex<T>,
    state: StdMutex<SessionState>,
    connection: watch::Receiver<bool>,
    driver: DriverSpec,
    transfer: TransferConfig,
}

impl<T: Transport> DeviceSession<T> {
    pub fn new(transport: T, driver: DriverSpec, transfer: TransferConfig) -> Self {
        Self {
            connection: transport.connection(),
            transport: Mutex::new(transport),
            state: StdMutex::new(SessionState::Idle),
            driver,
            transfer,
        }
    }

    /// Build a session from the `link` and `driver` sections of a config.
    pub fn from_config(transport: T, config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            transport,
            config.driver.clone(),
            config.link.transfer()?,
        ))
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_connected(&self) -> bool {
        *self.connection.borrow()
    }

    pub fn driver(&self) -> &DriverSpec {
        &self.driver
    }

    pub fn transfer(&self) -> &TransferConfig {
        &self.transfer
    }

    /// Give back the transport.
    pub fn into_transport(self) -> T {
        self.transport.into_inner()
    }

    fn begin(&self) -> Result<(MutexGuard<'_, T>, StateGuard<'_>), SessionError> {
        let transport = self.transport.try_lock().map_err(|_| {
            tracing::warn!("Rejected operation, session busy");
            SessionError::Busy
        })?;
        Ok((transport, StateGuard { state: &self.state }))
    }

    fn fail(&self, phase: Phase, source: TransportError, log: &dyn LogSink) -> SessionError {
        match &source {
            TransportError::NotConnected => log.log(NOT_CONNECTED, Direction::Local),
            e if e.is_disconnect() => log.log(DISCONNECTED, Direction::Local),
            _ => {}
        }
        log.log(&format!("{phase} failed: {source}"), Direction::Local);
        tracing::error!(%phase, error = %source, "Operation aborted");
        SessionError::Transport { phase, source }
    }

    /// One acknowledged write, logged both ways.
    async fn exchange(
        &self,
        transport: &mut T,
        frame: &[u8],
        phase: Phase,
        log: &dyn LogSink,
    ) -> Result<Option<Vec<u8>>, SessionError> {
        log.log(&hex::encode(frame), Direction::Outgoing);
        match transport.write(frame, WriteMode::WithResponse).await {
            Ok(reply) => {
                if let Some(notification) = reply.as_deref().filter(|n| !n.is_empty()) {
                    log.log(&hex::encode(notification), Direction::Incoming);
                }
                Ok(reply)
            }
            Err(source) => Err(self.fail(phase, source, log)),
        }
    }

    /// Dither, pack and transmit an image.
    ///
    /// Size or color mode disagreeing with the configured driver is logged as
    /// a warning and the send goes ahead. Dropping the returned future
    /// cancels the send.
    pub async fn send_image(
        &self,
        image: RgbaImage,
        options: &DitherConfig,
        progress: &dyn ProgressSink,
        log: &dyn LogSink,
    ) -> Result<EncodedImage, SessionError> {
        let (mut transport, mut guard) = self.begin()?;

        for warning in self
            .driver
            .mismatches(image.width(), image.height(), options.color_mode)
        {
            tracing::warn!(driver = %self.driver.name, "{warning}");
            log.log(&format!("warning: {warning}"), Direction::Local);
        }

        if !transport.is_connected() {
            return Err(self.fail(Phase::Init, TransportError::NotConnected, log));
        }

        guard.enter(Phase::Encode);
        let config = *options;
        let encoded = tokio::task::spawn_blocking(move || epd_image::encode(&image, &config))
            .await
            .map_err(|e| SessionError::Worker(e.to_string()))?;

        self.transmit(&mut transport, &mut guard, &encoded, progress, log)
            .await?;
        Ok(encoded)
    }

    /// Transmit an already encoded payload.
    pub async fn send_encoded(
        &self,
        encoded: &EncodedImage,
        progress: &dyn ProgressSink,
        log: &dyn LogSink,
    ) -> Result<(), SessionError> {
        let (mut transport, mut guard) = self.begin()?;
        for warning in self
            .driver
            .mismatches(encoded.width(), encoded.height(), encoded.mode())
        {
            tracing::warn!(driver = %self.driver.name, "{warning}");
            log.log(&format!("warning: {warning}"), Direction::Local);
        }
        self.transmit(&mut transport, &mut guard, encoded, progress, log)
            .await
    }

    async fn transmit(
        &self,
        transport: &mut T,
        guard: &mut StateGuard<'_>,
        encoded: &EncodedImage,
        progress: &dyn ProgressSink,
        log: &dyn LogSink,
    ) -> Result<(), SessionError> {
        let planes = plane_writes(encoded, self.driver.uses_combined_planes(encoded.mode()));
        let total: usize = planes.iter().map(|p| p.bytes.len()).sum();
        let chunks: usize = planes
            .iter()
            .map(|p| self.transfer.chunk_count(p.bytes.len()))
            .sum();
        tracing::info!(
            mode = %encoded.mode(),
            width = encoded.width(),
            height = encoded.height(),
            bytes = total,
            planes = planes.len(),
            chunks,
            "Sending image"
        );

        guard.enter(Phase::Init);
        self.exchange(transport, &command(Opcode::Init, &[]), Phase::Init, log)
            .await?;
        progress.progress(0);

        let mut base = 0;
        for (i, plane) in planes.iter().enumerate() {
            let phase = if i == 0 { Phase::Plane1 } else { Phase::Plane2 };
            guard.enter(phase);
            log.log(
                &format!("{phase}: {} bytes", plane.bytes.len()),
                Direction::Local,
            );

            let result = write_chunked(&mut *transport, &plane.bytes, plane.flag, &self.transfer, |chunk| {
                log.log(&chunk_line(&chunk), Direction::Outgoing);
                if let Some(notification) = chunk.notification {
                    log.log(&hex::encode(notification), Direction::Incoming);
                }
                progress.progress(percent(base + chunk.sent, total));
            })
            .await;

            match result {
                Ok(stats) => {
                    tracing::debug!(%phase, chunks = stats.chunks, acked = stats.acked, "Plane written")
                }
                Err(source) => return Err(self.fail(phase, source, log)),
            }
            base += plane.bytes.len();
        }

        guard.enter(Phase::Refresh);
        self.exchange(transport, &command(Opcode::Refresh, &[]), Phase::Refresh, log)
            .await?;
        progress.progress(100);
        log.log("image sent", Direction::Local);
        tracing::info!(bytes = total, "Image sent");
        Ok(())
    }

    /// Send one command as an acknowledged write, returning any notification.
    pub async fn run_command(
        &self,
        opcode: Opcode,
        payload: &[u8],
        log: &dyn LogSink,
    ) -> Result<Option<Vec<u8>>, SessionError> {
        let (mut transport, mut guard) = self.begin()?;
        let phase = Phase::Command(opcode);
        guard.enter(phase);
        tracing::info!(%opcode, len = payload.len(), "Sending command");
        self.exchange(&mut transport, &command(opcode, payload), phase, log)
            .await
    }

    pub async fn init(&self, log: &dyn LogSink) -> Result<(), SessionError> {
        self.run_command(Opcode::Init, &[], log).await.map(drop)
    }

    pub async fn clear(&self, log: &dyn LogSink) -> Result<(), SessionError> {
        self.run_command(Opcode::Clear, &[], log).await.map(drop)
    }

    pub async fn refresh(&self, log: &dyn LogSink) -> Result<(), SessionError> {
        self.run_command(Opcode::Refresh, &[], log).await.map(drop)
    }

    pub async fn sleep(&self, log: &dyn LogSink) -> Result<(), SessionError> {
        self.run_command(Opcode::Sleep, &[], log).await.map(drop)
    }

    /// Set the controller clock to `now`.
    pub async fn sync_time(
        &self,
        mode: TimeSyncMode,
        now: &DateTime<FixedOffset>,
        log: &dyn LogSink,
    ) -> Result<(), SessionError> {
        let payload = set_time_payload(now, mode).ok_or_else(|| {
            SessionError::InvalidCommand(format!(
                "timestamp {} does not fit in 32 bits",
                now.timestamp()
            ))
        })?;
        log.log(
            &format!("time sync: {}", now.to_rfc3339()),
            Direction::Local,
        );
        self.run_command(Opcode::SetTime, &payload, log)
            .await
            .map(drop)
    }

    pub async fn set_pins(&self, pins: &[u8], log: &dyn LogSink) -> Result<(), SessionError> {
        self.run_command(Opcode::SetPins, pins, log).await.map(drop)
    }

    pub async fn send_cmd(&self, cmd: &[u8], log: &dyn LogSink) -> Result<(), SessionError> {
        self.run_command(Opcode::SendCmd, cmd, log).await.map(drop)
    }

    pub async fn send_data(&self, data: &[u8], log: &dyn LogSink) -> Result<(), SessionError> {
        self.run_command(Opcode::SendData, data, log).await.map(drop)
    }

    pub async fn set_config(&self, config: &[u8], log: &dyn LogSink) -> Result<(), SessionError> {
        self.run_command(Opcode::SetConfig, config, log)
            .await
            .map(drop)
    }

    pub async fn sys_reset(&self, log: &dyn LogSink) -> Result<(), SessionError> {
        self.run_command(Opcode::SysReset, &[], log).await.map(drop)
    }

    pub async fn sys_sleep(&self, log: &dyn LogSink) -> Result<(), SessionError> {
        self.run_command(Opcode::SysSleep, &[], log).await.map(drop)
    }

    pub async fn erase_config(&self, log: &dyn LogSink) -> Result<(), SessionError> {
        self.run_command(Opcode::CfgErase, &[], log).await.map(drop)
    }

    /// Write hex-encoded bytes as-is. Whitespace is ignored.
    pub async fn send_raw(
        &self,
        hex_bytes: &str,
        log: &dyn LogSink,
    ) -> Result<Option<Vec<u8>>, SessionError> {
        let cleaned: String = hex_bytes.chars().filter(|c| !c.is_whitespace()).collect();
        let frame = hex::decode(&cleaned)
            .map_err(|e| SessionError::InvalidCommand(format!("bad hex '{hex_bytes}': {e}")))?;
        if frame.is_empty() {
            return Err(SessionError::InvalidCommand("empty raw write".to_string()));
        }

        let (mut transport, mut guard) = self.begin()?;
        guard.enter(Phase::Raw);
        tracing::info!(len = frame.len(), "Sending raw bytes");
        self.exchange(&mut transport, &frame, Phase::Raw, log).await
    }
}
