//! Length-prefixed stream transport.
//!
//! Carries device writes over any byte stream, typically a TCP connection to
//! a bridge that relays them to the controller.
//!
//! ```text
//! host -> bridge:  [len: u32 BE] [mode: u8] [device bytes ...]
//! bridge -> host:  [len: u32 BE] [status: u8] [notification ...]
//! ```
//!
//! `mode` is `0x00` for fire-and-forget writes and `0x01` when an
//! acknowledgement is expected. The bridge answers only acknowledged writes;
//! a status of `0x00` means the controller accepted the write.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::watch;

use super::{Transport, WriteMode};
use crate::error::TransportError;

/// Maximum frame payload size (1 MB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Status byte of an accepted write.
pub const STATUS_OK: u8 = 0x00;

/// Encode a message with a 4-byte big-endian length prefix.
pub fn encode_frame(msg: &[u8]) -> Result<Vec<u8>, TransportError> {
    if msg.len() > MAX_FRAME_SIZE {
        return Err(TransportError::Protocol(format!(
            "frame too large: {} bytes (max {MAX_FRAME_SIZE})",
            msg.len()
        )));
    }
    let len = msg.len() as u32;
    let mut frame = Vec::with_capacity(4 + msg.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(msg);
    Ok(frame)
}

/// Read one frame.
///
/// Returns `Ok(None)` on a clean end of stream before the length prefix.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, TransportError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut prefix = [0u8; 4];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(TransportError::Protocol(format!(
            "frame too large: {len} bytes (max {MAX_FRAME_SIZE})"
        )));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            TransportError::Disconnected
        } else {
            e.into()
        }
    })?;
    Ok(Some(body))
}

/// [`Transport`] over a byte stream.
pub struct StreamTransport<S> {
    reader: ReadHalf<S>,
    writer: WriteHalf<S>,
    connected: watch::Sender<bool>,
}

impl StreamTransport<TcpStream> {
    /// Connect to a bridge over TCP.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        if let Ok(peer) = stream.peer_addr() {
            tracing::info!(%peer, "Connected to bridge");
        }
        Ok(Self::new(stream))
    }
}

impl<S: AsyncRead + AsyncWrite> StreamTransport<S> {
    pub fn new(stream: S) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader,
            writer,
            connected: watch::channel(true).0,
        }
    }

    fn mark_down(&self, reason: &TransportError) {
        mark_down(&self.connected, reason);
    }
}

fn mark_down(connected: &watch::Sender<bool>, reason: &dyn std::fmt::Display) {
    if *connected.borrow() {
        tracing::warn!(%reason, "Bridge link lost");
    }
    connected.send_replace(false);
}

/// Armed while a write is on the wire. Dropped armed, the stream position is
/// unknown (partial frame, or an acknowledgement nobody will read), so the
/// link is marked down.
struct InFlight<'a> {
    connected: &'a watch::Sender<bool>,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn arm(connected: &'a watch::Sender<bool>) -> Self {
        Self {
            connected,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            mark_down(self.connected, &"write cancelled mid-flight");
        }
    }
}

async fn exchange<S: AsyncRead + AsyncWrite>(
    reader: &mut ReadHalf<S>,
    writer: &mut WriteHalf<S>,
    data: &[u8],
    mode: WriteMode,
) -> Result<Option<Vec<u8>>, TransportError> {
    let mut msg = Vec::with_capacity(1 + data.len());
    msg.push(mode.as_byte());
    msg.extend_from_slice(data);
    let frame = encode_frame(&msg)?;

    writer.write_all(&frame).await?;
    writer.flush().await?;

    if mode == WriteMode::WithoutResponse {
        return Ok(None);
    }

    let reply = read_frame(reader)
        .await?
        .ok_or(TransportError::Disconnected)?;
    match reply.split_first() {
        None => Err(TransportError::Protocol("empty acknowledgement".to_string())),
        Some((&STATUS_OK, notification)) => Ok(Some(notification.to_vec())),
        Some((&status, _)) => Err(TransportError::Rejected { status }),
    }
}

#[async_trait]
impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send,
{
    /// Dropping the future mid-write takes the link down instead of leaving
    /// a stale acknowledgement in the stream.
    async fn write(
        &mut self,
        data: &[u8],
        mode: WriteMode,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        if !*self.connected.borrow() {
            return Err(TransportError::NotConnected);
        }
        let in_flight = InFlight::arm(&self.connected);
        let result = exchange(&mut self.reader, &mut self.writer, data, mode).await;
        in_flight.disarm();

        if let Err(e) = &result {
            if e.is_disconnect() {
                self.mark_down(e);
            }
        }
        result
    }

    fn connection(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_frame() {
        assert_eq!(encode_frame(b"\x01\x05").unwrap(), vec![0, 0, 0, 2, 1, 5]);
        assert!(encode_frame(&vec![0; MAX_FRAME_SIZE + 1]).is_err());
    }

    #[tokio::test]
    async fn test_read_frame() {
        let bytes = [0u8, 0, 0, 3, 7, 8, 9];
        let mut reader = &bytes[..];
        assert_eq!(read_frame(&mut reader).await.unwrap(), Some(vec![7, 8, 9]));
        assert_eq!(read_frame(&mut reader).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_frame_truncated_body() {
        let bytes = [0u8, 0, 0, 5, 1];
        let mut reader = &bytes[..];
        let err = read_frame(&mut reader).await.unwrap_err();
        assert!(matches!(err, TransportError::Disconnected));
    }

    #[tokio::test]
    async fn test_unacknowledged_write_is_framed_with_mode() {
        let (client, mut bridge) = tokio::io::duplex(64);
        let mut transport = StreamTransport::new(client);

        let reply = transport
            .write(&[0x30, 0x0F, 0xAA], WriteMode::WithoutResponse)
            .await
            .unwrap();
        assert_eq!(reply, None);
        assert_eq!(
            read_frame(&mut bridge).await.unwrap(),
            Some(vec![0x00, 0x30, 0x0F, 0xAA])
        );
    }

    #[tokio::test]
    async fn test_acknowledged_write() {
        let (client, mut bridge) = tokio::io::duplex(64);
        let mut transport = StreamTransport::new(client);

        let device = tokio::spawn(async move {
            let frame = read_frame(&mut bridge).await.unwrap().unwrap();
            bridge.write_all(&encode_frame(&[STATUS_OK, 0xBE, 0xEF]).unwrap()).await.unwrap();
            frame
        });

        let reply = transport.write(&[0x01], WriteMode::WithResponse).await.unwrap();
        assert_eq!(reply, Some(vec![0xBE, 0xEF]));
        assert_eq!(device.await.unwrap(), vec![0x01, 0x01]);
    }

    #[tokio::test]
    async fn test_rejected_write() {
        let (client, mut bridge) = tokio::io::duplex(64);
        let mut transport = StreamTransport::new(client);

        tokio::spawn(async move {
            let _ = read_frame(&mut bridge).await;
            bridge.write_all(&encode_frame(&[0x02]).unwrap()).await.unwrap();
            // Keep the bridge open until the reply has been read
            let _ = read_frame(&mut bridge).await;
        });

        let err = transport.write(&[0x05], WriteMode::WithResponse).await.unwrap_err();
        assert!(matches!(err, TransportError::Rejected { status: 0x02 }));
        assert!(transport.is_connected());
    }

    #[tokio::test]
    async fn test_bridge_closing_marks_disconnected() {
        let (client, mut bridge) = tokio::io::duplex(64);
        let mut transport = StreamTransport::new(client);
        let connection = transport.connection();

        tokio::spawn(async move {
            let _ = read_frame(&mut bridge).await;
            drop(bridge);
        });

        let err = transport.write(&[0x01], WriteMode::WithResponse).await.unwrap_err();
        assert!(err.is_disconnect());
        assert!(!*connection.borrow());

        let err = transport.write(&[0x01], WriteMode::WithResponse).await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[tokio::test]
    async fn test_dropped_ack_wait_takes_link_down() {
        let (client, mut bridge) = tokio::io::duplex(64);
        let mut transport = StreamTransport::new(client);
        let connection = transport.connection();

        let device = tokio::spawn(async move {
            let first = read_frame(&mut bridge).await.unwrap().unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            // Late acknowledgement for the write that was given up on
            let _ = bridge.write_all(&encode_frame(&[STATUS_OK, 0x01]).unwrap()).await;
            first
        });

        let pending = transport.write(&[0x01], WriteMode::WithResponse);
        let outcome = tokio::time::timeout(std::time::Duration::from_millis(20), pending).await;
        assert!(outcome.is_err());
        assert!(!*connection.borrow());

        // The late ack must never be taken as the reply to a new write
        let err = transport.write(&[0x02], WriteMode::WithResponse).await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
        assert_eq!(device.await.unwrap(), vec![0x01, 0x01]);
    }

    #[tokio::test]
    async fn test_completed_writes_keep_link_up() {
        let (client, mut bridge) = tokio::io::duplex(64);
        let mut transport = StreamTransport::new(client);

        tokio::spawn(async move {
            while let Ok(Some(frame)) = read_frame(&mut bridge).await {
                if frame[0] == 0x01 {
                    let ack = encode_frame(&[STATUS_OK, frame[1]]).unwrap();
                    if bridge.write_all(&ack).await.is_err() {
                        break;
                    }
                }
            }
        });

        assert_eq!(transport.write(&[0x30], WriteMode::WithoutResponse).await.unwrap(), None);
        assert_eq!(
            transport.write(&[0x02], WriteMode::WithResponse).await.unwrap(),
            Some(vec![0x02])
        );
        assert!(transport.is_connected());
    }
}
