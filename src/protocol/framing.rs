//! `WRITE_IMG` chunk framing.
//!
//! A plane is cut into chunks that fit one transport unit together with the
//! two-byte prefix:
//!
//! ```text
//! +------+--------+---------------------------+
//! | 0x30 | header | up to (unit - 2) bytes    |
//! +------+--------+---------------------------+
//! header = plane flag (low nibble) | 0xF0 on every chunk after the first
//! ```
//!
//! Every `interleave_count`-th chunk is sent as an acknowledged write, which
//! paces the sender against the controller's receive buffer.

use crate::error::ConfigError;
use crate::protocol::command::Opcode;

/// Opcode byte plus header byte in front of every chunk.
pub const HEADER_OVERHEAD: usize = 2;

/// High nibble set on every chunk but the first of a plane.
pub const CONTINUATION: u8 = 0xF0;

/// Which frame buffer a plane is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PlaneFlag {
    /// Black/white frame buffer.
    BlackWhite = 0x0F,
    /// Color (red, or the whole payload on multi-color panels).
    Color = 0x00,
}

/// Header byte for the chunk at position `index` (0-based) within a plane.
#[inline]
pub fn chunk_header(flag: PlaneFlag, index: usize) -> u8 {
    let header = flag as u8;
    if index == 0 {
        header
    } else {
        header | CONTINUATION
    }
}

/// Validated transfer parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferConfig {
    transport_unit_size: usize,
    interleave_count: usize,
}

impl TransferConfig {
    pub fn new(transport_unit_size: usize, interleave_count: usize) -> Result<Self, ConfigError> {
        if transport_unit_size <= HEADER_OVERHEAD {
            return Err(ConfigError::Invalid(format!(
                "transport_unit_size must exceed {HEADER_OVERHEAD} bytes, got {transport_unit_size}"
            )));
        }
        if interleave_count == 0 {
            return Err(ConfigError::Invalid(
                "interleave_count must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            transport_unit_size,
            interleave_count,
        })
    }

    #[inline]
    pub fn transport_unit_size(&self) -> usize {
        self.transport_unit_size
    }

    #[inline]
    pub fn interleave_count(&self) -> usize {
        self.interleave_count
    }

    /// Payload bytes per chunk.
    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.transport_unit_size - HEADER_OVERHEAD
    }

    /// Number of chunks for a plane of `len` bytes.
    #[inline]
    pub fn chunk_count(&self, len: usize) -> usize {
        len.div_ceil(self.chunk_size())
    }
}

/// One framed chunk of a plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageChunk {
    /// 0-based position within the plane
    pub index: usize,
    /// Complete write: opcode, header, data
    pub frame: Vec<u8>,
    /// Whether this write waits for an acknowledgement
    pub ack: bool,
    /// Plane bytes sent once this chunk is written
    pub sent: usize,
}

impl ImageChunk {
    /// Plane bytes carried by this chunk.
    #[inline]
    pub fn data_len(&self) -> usize {
        self.frame.len() - HEADER_OVERHEAD
    }
}

/// Iterator over the chunks of one plane.
#[derive(Debug, Clone)]
pub struct ImageChunks<'a> {
    pieces: std::iter::Enumerate<std::slice::Chunks<'a, u8>>,
    flag: PlaneFlag,
    interleave_count: usize,
    sent: usize,
}

impl Iterator for ImageChunks<'_> {
    type Item = ImageChunk;

    fn next(&mut self) -> Option<ImageChunk> {
        let (index, data) = self.pieces.next()?;
        let mut frame = Vec::with_capacity(HEADER_OVERHEAD + data.len());
        frame.push(Opcode::WriteImg.as_byte());
        frame.push(chunk_header(self.flag, index));
        frame.extend_from_slice(data);
        self.sent += data.len();
        Some(ImageChunk {
            index,
            frame,
            ack: (index + 1) % self.interleave_count == 0,
            sent: self.sent,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.pieces.size_hint()
    }
}

impl ExactSizeIterator for ImageChunks<'_> {}

/// Split `plane` into `WRITE_IMG` frames.
///
/// An empty plane yields no chunks.
pub fn image_chunks<'a>(
    plane: &'a [u8],
    flag: PlaneFlag,
    transfer: &TransferConfig,
) -> ImageChunks<'a> {
    ImageChunks {
        pieces: plane.chunks(transfer.chunk_size()).enumerate(),
        flag,
        interleave_count: transfer.interleave_count(),
        sent: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(unit: usize, interleave: usize) -> TransferConfig {
        TransferConfig::new(unit, interleave).unwrap()
    }

    #[test]
    fn test_transfer_config_validation() {
        assert!(TransferConfig::new(2, 1).is_err());
        assert!(TransferConfig::new(3, 0).is_err());
        assert_eq!(transfer(3, 1).chunk_size(), 1);
        assert_eq!(transfer(244, 50).chunk_size(), 242);
    }

    #[test]
    fn test_chunk_count() {
        let t = transfer(244, 50);
        assert_eq!(t.chunk_count(0), 0);
        assert_eq!(t.chunk_count(242), 1);
        assert_eq!(t.chunk_count(243), 2);
        assert_eq!(t.chunk_count(30_000), 124);
    }

    #[test]
    fn test_headers() {
        let plane = [0xAB; 10];
        let chunks: Vec<_> = image_chunks(&plane, PlaneFlag::BlackWhite, &transfer(6, 50)).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].frame, vec![0x30, 0x0F, 0xAB, 0xAB, 0xAB, 0xAB]);
        assert_eq!(chunks[1].frame[..2], [0x30, 0xFF]);
        assert_eq!(chunks[2].frame, vec![0x30, 0xFF, 0xAB, 0xAB]);

        let color: Vec<_> = image_chunks(&plane, PlaneFlag::Color, &transfer(6, 50)).collect();
        assert_eq!(color[0].frame[1], 0x00);
        assert_eq!(color[1].frame[1], 0xF0);
    }

    #[test]
    fn test_every_nth_chunk_is_acked() {
        let plane = vec![0u8; 100];
        let chunks: Vec<_> = image_chunks(&plane, PlaneFlag::Color, &transfer(12, 3)).collect();
        assert_eq!(chunks.len(), 10);
        let acked: Vec<usize> = chunks.iter().filter(|c| c.ack).map(|c| c.index).collect();
        assert_eq!(acked, vec![2, 5, 8]);
    }

    #[test]
    fn test_interleave_of_one_acks_everything() {
        let plane = vec![0u8; 9];
        assert!(image_chunks(&plane, PlaneFlag::Color, &transfer(5, 1)).all(|c| c.ack));
    }

    #[test]
    fn test_sent_accumulates_to_plane_length() {
        let plane = vec![1u8; 1000];
        let chunks: Vec<_> = image_chunks(&plane, PlaneFlag::Color, &transfer(244, 50)).collect();
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks.last().map(|c| c.sent), Some(1000));
        assert_eq!(chunks.iter().map(ImageChunk::data_len).sum::<usize>(), 1000);
    }

    #[test]
    fn test_empty_plane() {
        assert_eq!(image_chunks(&[], PlaneFlag::Color, &transfer(10, 1)).count(), 0);
    }
}
