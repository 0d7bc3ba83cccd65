//! Realtime channel client.
//!
//! DESIGN
//! ======
//! One spawned task owns the socket. Outbound frames arrive over an mpsc
//! queue and are written as JSON text; inbound text frames are decoded and
//! forwarded as [`ChannelEvent`]s. Malformed inbound frames are logged and
//! dropped — they never tear the connection down.
//!
//! Dropping the [`Channel`] handle closes the outbound queue; the driver
//! drains whatever is still queued (the unsubscribe notification on
//! disposal), closes the socket, and exits.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use wire::Frame;

use crate::error::SyncError;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Inbound event surfaced to the synchronizer.
#[derive(Debug)]
pub enum ChannelEvent {
    /// A decoded frame from the server.
    Frame(Frame),
    /// The socket closed or failed; no further events will follow.
    Closed,
}

/// Handle for one live channel connection.
pub struct Channel {
    out: mpsc::UnboundedSender<Frame>,
}

impl Channel {
    /// Connect to `endpoint` and spawn the socket driver. Inbound events
    /// are delivered on `events`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ChannelConnect`] if the handshake fails.
    pub async fn connect(
        endpoint: &str,
        events: mpsc::UnboundedSender<ChannelEvent>,
    ) -> Result<Self, SyncError> {
        let (socket, _) = connect_async(endpoint)
            .await
            .map_err(|error| SyncError::ChannelConnect(Box::new(error)))?;
        let (out, out_rx) = mpsc::unbounded_channel();
        tokio::spawn(drive_socket(socket, out_rx, events));
        Ok(Self { out })
    }

    /// Queue a frame for sending. Returns `false` if the connection is
    /// already gone.
    pub fn send(&self, frame: Frame) -> bool {
        self.out.send(frame).is_ok()
    }

    /// Let the driver drain any queued frames, then close the socket.
    pub fn close(self) {
        drop(self.out);
    }
}

async fn drive_socket(
    socket: Socket,
    mut out_rx: mpsc::UnboundedReceiver<Frame>,
    events: mpsc::UnboundedSender<ChannelEvent>,
) {
    let (mut write, mut read) = socket.split();
    loop {
        tokio::select! {
            outbound = out_rx.recv() => match outbound {
                Some(frame) => {
                    let text = wire::encode_frame(&frame);
                    if write.send(Message::Text(text.into())).await.is_err() {
                        let _ = events.send(ChannelEvent::Closed);
                        return;
                    }
                }
                // Handle dropped and queue drained: clean close.
                None => {
                    let _ = write.close().await;
                    return;
                }
            },
            inbound = read.next() => match inbound {
                Some(Ok(Message::Text(text))) => match wire::decode_frame(text.as_str()) {
                    Ok(frame) => {
                        if events.send(ChannelEvent::Frame(frame)).is_err() {
                            return;
                        }
                    }
                    Err(error) => {
                        tracing::warn!(%error, "dropping malformed channel frame");
                    }
                },
                Some(Ok(Message::Close(_))) | None => {
                    let _ = events.send(ChannelEvent::Closed);
                    return;
                }
                Some(Err(error)) => {
                    tracing::warn!(%error, "channel read failed");
                    let _ = events.send(ChannelEvent::Closed);
                    return;
                }
                Some(Ok(_)) => {}
            },
        }
    }
}
