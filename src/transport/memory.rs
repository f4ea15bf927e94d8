//! In-memory transport for tests and dry runs.
//!
//! Every write is recorded. A [`MemoryHandle`] kept by the caller can drop
//! the link, hold acknowledgements until released, schedule a disconnect
//! after a number of writes and queue device replies.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::{watch, Semaphore};

use super::{disconnected, Transport, WriteMode};
use crate::error::TransportError;

/// One write as the device would have received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub data: Vec<u8>,
    pub mode: WriteMode,
}

#[derive(Debug)]
enum Reply {
    Ack(Vec<u8>),
    Reject(u8),
}

#[derive(Debug, Default)]
struct Shared {
    writes: Vec<RecordedWrite>,
    replies: VecDeque<Reply>,
    disconnect_at: Option<usize>,
    hold_acks: bool,
}

#[derive(Debug, Clone)]
struct Inner {
    shared: Arc<Mutex<Shared>>,
    connected: Arc<watch::Sender<bool>>,
    write_count: Arc<watch::Sender<usize>>,
    released: Arc<Semaphore>,
}

impl Inner {
    fn new() -> Self {
        Self {
            shared: Arc::default(),
            connected: Arc::new(watch::channel(true).0),
            write_count: Arc::new(watch::channel(0).0),
            released: Arc::new(Semaphore::new(0)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Transport that records writes instead of sending them.
#[derive(Debug)]
pub struct MemoryTransport {
    inner: Inner,
}

/// Control side of a [`MemoryTransport`].
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    inner: Inner,
}

impl MemoryTransport {
    /// A connected transport that acknowledges every write immediately.
    pub fn new() -> Self {
        Self {
            inner: Inner::new(),
        }
    }

    pub fn handle(&self) -> MemoryHandle {
        MemoryHandle {
            inner: self.inner.clone(),
        }
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn write(
        &mut self,
        data: &[u8],
        mode: WriteMode,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        if !*self.inner.connected.borrow() {
            return Err(TransportError::NotConnected);
        }

        let (count, drop_link, hold) = {
            let mut shared = self.inner.lock();
            shared.writes.push(RecordedWrite {
                data: data.to_vec(),
                mode,
            });
            let count = shared.writes.len();
            (count, shared.disconnect_at == Some(count), shared.hold_acks)
        };
        self.inner.write_count.send_replace(count);

        if drop_link {
            tracing::debug!(count, "Memory transport dropping link");
            self.inner.connected.send_replace(false);
            return match mode {
                WriteMode::WithResponse => Err(TransportError::Disconnected),
                WriteMode::WithoutResponse => Ok(None),
            };
        }

        if mode == WriteMode::WithoutResponse {
            return Ok(None);
        }

        if hold {
            let connection = self.inner.connected.subscribe();
            tokio::select! {
                permit = self.inner.released.acquire() => match permit {
                    Ok(permit) => permit.forget(),
                    Err(_) => return Err(TransportError::Disconnected),
                },
                _ = disconnected(connection) => return Err(TransportError::Disconnected),
            }
        }

        match self.inner.lock().replies.pop_front() {
            Some(Reply::Reject(status)) => Err(TransportError::Rejected { status }),
            Some(Reply::Ack(notification)) => Ok(Some(notification)),
            None => Ok(Some(Vec::new())),
        }
    }

    fn connection(&self) -> watch::Receiver<bool> {
        self.inner.connected.subscribe()
    }
}

impl MemoryHandle {
    /// Every write so far, in order.
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.inner.lock().writes.clone()
    }

    /// Drain the recorded writes.
    pub fn take_writes(&self) -> Vec<RecordedWrite> {
        std::mem::take(&mut self.inner.lock().writes)
    }

    /// Drop the link now. Pending acknowledged writes fail.
    pub fn disconnect(&self) {
        self.inner.connected.send_replace(false);
    }

    pub fn reconnect(&self) {
        self.inner.lock().disconnect_at = None;
        self.inner.connected.send_replace(true);
    }

    pub fn is_connected(&self) -> bool {
        *self.inner.connected.borrow()
    }

    /// Drop the link once `n` more writes have been recorded.
    pub fn disconnect_after(&self, n: usize) {
        let mut shared = self.inner.lock();
        shared.disconnect_at = Some(shared.writes.len() + n);
    }

    /// While held, acknowledged writes wait for [`MemoryHandle::release_acks`].
    pub fn hold_acks(&self, hold: bool) {
        self.inner.lock().hold_acks = hold;
    }

    /// Let `n` held acknowledgements through.
    pub fn release_acks(&self, n: usize) {
        self.inner.released.add_permits(n);
    }

    /// Attach a notification to the next acknowledgement.
    pub fn push_notification(&self, bytes: impl Into<Vec<u8>>) {
        self.inner.lock().replies.push_back(Reply::Ack(bytes.into()));
    }

    /// Reject the next acknowledged write with `status`.
    pub fn push_rejection(&self, status: u8) {
        self.inner.lock().replies.push_back(Reply::Reject(status));
    }

    /// Resolve once at least `n` writes have been recorded in total.
    pub async fn wait_for_writes(&self, n: usize) {
        let mut count = self.inner.write_count.subscribe();
        let _ = count.wait_for(|c| *c >= n).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_writes_in_order() {
        let mut transport = MemoryTransport::new();
        let handle = transport.handle();

        assert_eq!(transport.write(&[1], WriteMode::WithoutResponse).await.unwrap(), None);
        assert_eq!(
            transport.write(&[2, 3], WriteMode::WithResponse).await.unwrap(),
            Some(vec![])
        );

        let writes = handle.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].data, vec![1]);
        assert_eq!(writes[1].mode, WriteMode::WithResponse);
    }

    #[tokio::test]
    async fn test_not_connected() {
        let mut transport = MemoryTransport::new();
        transport.handle().disconnect();
        assert!(!transport.is_connected());
        let err = transport.write(&[1], WriteMode::WithResponse).await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[tokio::test]
    async fn test_disconnect_after() {
        let mut transport = MemoryTransport::new();
        let handle = transport.handle();
        handle.disconnect_after(2);

        transport.write(&[1], WriteMode::WithoutResponse).await.unwrap();
        let err = transport.write(&[2], WriteMode::WithResponse).await.unwrap_err();
        assert!(matches!(err, TransportError::Disconnected));
        assert!(!handle.is_connected());

        handle.reconnect();
        assert!(transport.write(&[3], WriteMode::WithResponse).await.is_ok());
    }

    #[tokio::test]
    async fn test_held_ack_fails_on_disconnect() {
        let mut transport = MemoryTransport::new();
        let handle = transport.handle();
        handle.hold_acks(true);

        let task = tokio::spawn(async move { transport.write(&[1], WriteMode::WithResponse).await });
        handle.wait_for_writes(1).await;
        handle.disconnect();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, TransportError::Disconnected));
    }

    #[tokio::test]
    async fn test_held_ack_released() {
        let mut transport = MemoryTransport::new();
        let handle = transport.handle();
        handle.hold_acks(true);
        handle.push_notification(vec![0xAB]);

        let task = tokio::spawn(async move { transport.write(&[1], WriteMode::WithResponse).await });
        handle.wait_for_writes(1).await;
        handle.release_acks(1);

        assert_eq!(task.await.unwrap().unwrap(), Some(vec![0xAB]));
    }

    #[tokio::test]
    async fn test_rejection() {
        let mut transport = MemoryTransport::new();
        transport.handle().push_rejection(0x07);
        let err = transport.write(&[1], WriteMode::WithResponse).await.unwrap_err();
        assert!(matches!(err, TransportError::Rejected { status: 0x07 }));
    }
}
