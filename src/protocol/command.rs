//! Controller opcodes and command payloads.
//!
//! Every command on the wire is the opcode byte followed by its payload.

use std::fmt;

use chrono::{DateTime, TimeZone};

/// First byte of every write to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Configure the panel's SPI/control pins.
    SetPins = 0x00,
    /// Reset and initialize the panel driver.
    Init = 0x01,
    /// Clear the panel to white.
    Clear = 0x02,
    /// Forward a raw command byte to the panel driver.
    SendCmd = 0x03,
    /// Forward raw data bytes to the panel driver.
    SendData = 0x04,
    /// Refresh the panel from its frame buffer.
    Refresh = 0x05,
    /// Put the panel into deep sleep.
    Sleep = 0x06,
    /// Set the controller clock; see [`set_time_payload`].
    SetTime = 0x20,
    /// Image chunk; see [`crate::protocol::framing`].
    WriteImg = 0x30,
    /// Persist a controller configuration blob.
    SetConfig = 0x90,
    /// Reboot the controller.
    SysReset = 0x91,
    /// Put the controller itself to sleep.
    SysSleep = 0x92,
    /// Erase the persisted configuration.
    CfgErase = 0x99,
}

impl Opcode {
    pub const ALL: [Opcode; 13] = [
        Opcode::SetPins,
        Opcode::Init,
        Opcode::Clear,
        Opcode::SendCmd,
        Opcode::SendData,
        Opcode::Refresh,
        Opcode::Sleep,
        Opcode::SetTime,
        Opcode::WriteImg,
        Opcode::SetConfig,
        Opcode::SysReset,
        Opcode::SysSleep,
        Opcode::CfgErase,
    ];

    #[inline]
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_byte() == byte)
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::SetPins => "SET_PINS",
            Opcode::Init => "INIT",
            Opcode::Clear => "CLEAR",
            Opcode::SendCmd => "SEND_CMD",
            Opcode::SendData => "SEND_DATA",
            Opcode::Refresh => "REFRESH",
            Opcode::Sleep => "SLEEP",
            Opcode::SetTime => "SET_TIME",
            Opcode::WriteImg => "WRITE_IMG",
            Opcode::SetConfig => "SET_CONFIG",
            Opcode::SysReset => "SYS_RESET",
            Opcode::SysSleep => "SYS_SLEEP",
            Opcode::CfgErase => "CFG_ERASE",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Build a command frame: opcode followed by payload.
pub fn command(opcode: Opcode, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(1 + payload.len());
    frame.push(opcode.as_byte());
    frame.extend_from_slice(payload);
    frame
}

/// What the controller shows after a clock sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TimeSyncMode {
    /// Calendar page.
    #[default]
    Calendar = 1,
    /// Clock face, with a full refresh.
    Clock = 2,
}

/// `SET_TIME` payload: big-endian UNIX seconds, timezone offset in whole
/// hours as a signed byte, then the mode byte.
///
/// Returns `None` for instants outside the unsigned 32-bit second range.
pub fn set_time_payload<Tz: TimeZone>(now: &DateTime<Tz>, mode: TimeSyncMode) -> Option<[u8; 6]> {
    use chrono::Offset;

    let seconds = u32::try_from(now.timestamp()).ok()?;
    let offset_hours = (now.offset().fix().local_minus_utc() / 3600) as i8;
    let [a, b, c, d] = seconds.to_be_bytes();
    Some([a, b, c, d, offset_hours as u8, mode as u8])
}
