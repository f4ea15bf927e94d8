//! Streaming a plane through `WRITE_IMG` chunks.

use super::{Transport, WriteMode};
use crate::error::TransportError;
use crate::protocol::{image_chunks, PlaneFlag, TransferConfig};

/// Reported after each chunk is written.
#[derive(Debug, Clone, Copy)]
pub struct ChunkProgress<'a> {
    /// 0-based chunk position within the plane
    pub index: usize,
    /// Chunks in the plane
    pub count: usize,
    /// Plane bytes written so far
    pub sent: usize,
    /// The frame as written
    pub frame: &'a [u8],
    /// Whether the write was acknowledged
    pub acked: bool,
    /// Notification attached to the acknowledgement, if any
    pub notification: Option<&'a [u8]>,
}

/// Summary of a finished plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkStats {
    pub chunks: usize,
    pub acked: usize,
    pub bytes: usize,
}

/// Write `plane` as a sequence of `WRITE_IMG` frames.
///
/// Frames go out strictly in order. Every `interleave_count`-th frame is an
/// acknowledged write and is awaited before the next one is issued. The
/// first error aborts the plane.
pub async fn write_chunked<T, F>(
    transport: &mut T,
    plane: &[u8],
    flag: PlaneFlag,
    transfer: &TransferConfig,
    mut on_chunk: F,
) -> Result<ChunkStats, TransportError>
where
    T: Transport + ?Sized,
    F: FnMut(ChunkProgress<'_>) + Send,
{
    let count = transfer.chunk_count(plane.len());
    let mut stats = ChunkStats::default();

    for chunk in image_chunks(plane, flag, transfer) {
        let reply = transport
            .write(&chunk.frame, WriteMode::from_ack(chunk.ack))
            .await?;

        stats.chunks += 1;
        stats.bytes = chunk.sent;
        if chunk.ack {
            stats.acked += 1;
        }
        tracing::trace!(index = chunk.index, count, sent = chunk.sent, ack = chunk.ack, "Chunk written");

        on_chunk(ChunkProgress {
            index: chunk.index,
            count,
            sent: chunk.sent,
            frame: &chunk.frame,
            acked: chunk.ack,
            notification: reply.as_deref().filter(|n| !n.is_empty()),
        });
    }

    Ok(stats)
}
