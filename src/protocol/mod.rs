//! Controller wire protocol: opcodes, command payloads and image chunking.

pub mod command;
pub mod framing;

pub use command::{command, set_time_payload, Opcode, TimeSyncMode};
pub use framing::{
    chunk_header, image_chunks, ImageChunk, ImageChunks, PlaneFlag, TransferConfig, CONTINUATION,
    HEADER_OVERHEAD,
};
