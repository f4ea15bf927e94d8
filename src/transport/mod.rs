//! The link to the controller.
//!
//! A [`Transport`] delivers one device write at a time, optionally waiting
//! for the controller's acknowledgement. Connection state is published on a
//! `watch` channel so in-flight operations can notice a drop while they wait.

pub mod chunked;
pub mod memory;
pub mod stream;

pub use chunked::{write_chunked, ChunkProgress, ChunkStats};
pub use memory::{MemoryHandle, MemoryTransport, RecordedWrite};
pub use stream::{encode_frame, read_frame, StreamTransport, MAX_FRAME_SIZE};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::TransportError;

/// Whether a write waits for the controller to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fire and forget
    WithoutResponse,
    /// Wait for an acknowledgement
    WithResponse,
}

impl WriteMode {
    #[inline]
    pub fn from_ack(ack: bool) -> Self {
        if ack {
            WriteMode::WithResponse
        } else {
            WriteMode::WithoutResponse
        }
    }

    /// Mode byte used by the stream framing.
    #[inline]
    pub fn as_byte(self) -> u8 {
        match self {
            WriteMode::WithoutResponse => 0x00,
            WriteMode::WithResponse => 0x01,
        }
    }
}

/// A link that carries device writes.
#[async_trait]
pub trait Transport: Send {
    /// Deliver `data` as one write.
    ///
    /// With [`WriteMode::WithResponse`] this resolves once the controller has
    /// acknowledged, returning any notification bytes it attached. Writes are
    /// delivered strictly in call order.
    async fn write(
        &mut self,
        data: &[u8],
        mode: WriteMode,
    ) -> Result<Option<Vec<u8>>, TransportError>;

    /// Connection state, `true` while the link is up.
    fn connection(&self) -> watch::Receiver<bool>;

    fn is_connected(&self) -> bool {
        *self.connection().borrow()
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn write(
        &mut self,
        data: &[u8],
        mode: WriteMode,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        (**self).write(data, mode).await
    }

    fn connection(&self) -> watch::Receiver<bool> {
        (**self).connection()
    }
}

/// Resolve once `connection` reports the link down.
pub(crate) async fn disconnected(mut connection: watch::Receiver<bool>) {
    // A dropped sender counts as a disconnect too
    let _ = connection.wait_for(|up| !*up).await;
}
