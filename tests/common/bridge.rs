//! Fake bridge for stream transport tests.
//!
//! Reads length-prefixed frames, records them and acknowledges the ones that
//! ask for it. Optionally hangs up after a number of frames, or holds each
//! acknowledgement back for a while.

use std::time::Duration;

use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

use epd_link::transport::{encode_frame, read_frame, StreamTransport};

/// A frame as the bridge received it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeFrame {
    pub mode: u8,
    pub data: Vec<u8>,
}

/// Start a bridge on one end of an in-memory pipe and return a transport on
/// the other end. The join handle yields the received frames once the
/// transport hangs up (or the bridge does).
pub fn spawn_bridge(
    hang_up_after: Option<usize>,
) -> (StreamTransport<DuplexStream>, JoinHandle<Vec<BridgeFrame>>) {
    run_bridge(hang_up_after, Duration::ZERO)
}

/// Like [`spawn_bridge`], but every acknowledgement is sent `ack_delay` late.
pub fn spawn_slow_bridge(
    ack_delay: Duration,
) -> (StreamTransport<DuplexStream>, JoinHandle<Vec<BridgeFrame>>) {
    run_bridge(None, ack_delay)
}

fn run_bridge(
    hang_up_after: Option<usize>,
    ack_delay: Duration,
) -> (StreamTransport<DuplexStream>, JoinHandle<Vec<BridgeFrame>>) {
    let (client, mut bridge) = tokio::io::duplex(4096);

    let task = tokio::spawn(async move {
        let mut frames = Vec::new();
        while let Ok(Some(frame)) = read_frame(&mut bridge).await {
            let (&mode, data) = frame.split_first().expect("empty frame from host");
            frames.push(BridgeFrame {
                mode,
                data: data.to_vec(),
            });

            if hang_up_after == Some(frames.len()) {
                break;
            }
            if mode == 0x01 {
                if !ack_delay.is_zero() {
                    tokio::time::sleep(ack_delay).await;
                }
                let ack = encode_frame(&[0x00]).unwrap();
                if bridge.write_all(&ack).await.is_err() {
                    break;
                }
            }
        }
        frames
    });

    (StreamTransport::new(client), task)
}
