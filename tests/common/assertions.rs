//! Assertion helpers for tests.

use pretty_assertions::assert_eq;

use epd_link::protocol::{Opcode, PlaneFlag, CONTINUATION, HEADER_OVERHEAD};
use epd_link::transport::RecordedWrite;
use epd_link::WriteMode;

use super::fixtures::INTERLEAVE;

/// `WRITE_IMG` frames belonging to one plane, in order
pub fn plane_frames(writes: &[RecordedWrite], flag: PlaneFlag) -> Vec<&RecordedWrite> {
    writes
        .iter()
        .filter(|w| w.data.first() == Some(&Opcode::WriteImg.as_byte()))
        .filter(|w| w.data[1] & 0x0F == flag as u8)
        .collect()
}

/// Concatenated chunk data of one plane
pub fn reassemble(writes: &[RecordedWrite], flag: PlaneFlag) -> Vec<u8> {
    plane_frames(writes, flag)
        .iter()
        .flat_map(|w| w.data[HEADER_OVERHEAD..].to_vec())
        .collect()
}

/// Assert a write is the given command, acknowledged
pub fn assert_command(write: &RecordedWrite, opcode: Opcode) {
    assert_eq!(
        write.data.first().copied(),
        Some(opcode.as_byte()),
        "Expected {} frame, got {:02x?}",
        opcode,
        write.data
    );
    assert_eq!(write.mode, WriteMode::WithResponse, "{opcode} must be acknowledged");
}

/// Assert chunk headers and ack pacing of one plane
pub fn assert_plane_framing(writes: &[RecordedWrite], flag: PlaneFlag) {
    let frames = plane_frames(writes, flag);
    assert!(!frames.is_empty(), "No frames for {flag:?} plane");

    for (k, frame) in frames.iter().enumerate() {
        let expected_header = if k == 0 {
            flag as u8
        } else {
            flag as u8 | CONTINUATION
        };
        assert_eq!(frame.data[1], expected_header, "Header of chunk {k}");

        let expected_mode = if (k + 1) % INTERLEAVE == 0 {
            WriteMode::WithResponse
        } else {
            WriteMode::WithoutResponse
        };
        assert_eq!(frame.mode, expected_mode, "Write mode of chunk {k}");
    }
}

/// Assert progress never goes backwards and ends at 100
pub fn assert_progress_complete(values: &[u8]) {
    assert!(!values.is_empty(), "No progress reported");
    assert!(
        values.windows(2).all(|w| w[0] <= w[1]),
        "Progress went backwards: {values:?}"
    );
    assert_eq!(values.last().copied(), Some(100));
}
