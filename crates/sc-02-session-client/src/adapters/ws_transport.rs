//! WebSocket transport over tokio-tungstenite.
//!
//! One task owns the socket. It forwards inbound text frames as
//! [`TransportEvent::Message`], answers pings itself and reports the close
//! code and reason when the socket goes away.

use crate::ports::outbound::{
    OutboundFrame, Transport, TransportError, TransportEvent, TransportLink,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Default capacity of the per-connection channels.
const LINK_CAPACITY: usize = 256;

/// Production transport.
#[derive(Debug, Clone)]
pub struct WsTransport {
    capacity: usize,
}

impl WsTransport {
    pub fn new() -> Self {
        Self {
            capacity: LINK_CAPACITY,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for WsTransport {
    async fn open(&self, url: &str) -> Result<TransportLink, TransportError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        info!(url, "WebSocket connected");

        let (outbound_tx, outbound_rx) = mpsc::channel(self.capacity);
        let (inbound_tx, inbound_rx) = mpsc::channel(self.capacity);
        tokio::spawn(run_socket(ws_stream, outbound_rx, inbound_tx));

        Ok(TransportLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Owns the socket until either side closes.
///
/// At most one inbound event is held while the session's channel is full;
/// reading pauses until it is delivered, but outbound frames keep draining.
async fn run_socket(
    ws_stream: WsStream,
    mut outbound: mpsc::Receiver<OutboundFrame>,
    inbound: mpsc::Sender<TransportEvent>,
) {
    let (mut write, mut read) = ws_stream.split();
    let mut held: Option<TransportEvent> = None;

    let last = loop {
        tokio::select! {
            frame = outbound.recv() => {
                let text = match frame {
                    Some(OutboundFrame::Text(text)) => text,
                    Some(OutboundFrame::Close { reason }) => {
                        let _ = write
                            .send(Message::Close(Some(CloseFrame {
                                code: CloseCode::Normal,
                                reason: reason.into(),
                            })))
                            .await;
                        debug!("close frame sent");
                        return;
                    }
                    None => {
                        // Session dropped its sender
                        let _ = write.close().await;
                        return;
                    }
                };
                if let Err(e) = write.send(Message::Text(text.into())).await {
                    break TransportEvent::Error(e.to_string());
                }
            }
            permit = inbound.reserve(), if held.is_some() => {
                let Ok(permit) = permit else { return };
                if let Some(event) = held.take() {
                    permit.send(event);
                }
            }
            msg = read.next(), if held.is_none() => match msg {
                Some(Ok(Message::Text(text))) => {
                    held = Some(TransportEvent::Message(text.as_str().to_string()));
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (Some(u16::from(f.code)), f.reason.as_str().to_string()))
                        .unwrap_or((None, String::new()));
                    break TransportEvent::Closed { code, reason };
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket read error");
                    break TransportEvent::Error(e.to_string());
                }
                None => {
                    break TransportEvent::Closed {
                        code: None,
                        reason: "stream ended".to_string(),
                    };
                }
            },
        }
    };

    // The session drains its inbound channel without blocking on us.
    if let Some(event) = held {
        if inbound.send(event).await.is_err() {
            return;
        }
    }
    let _ = inbound.send(last).await;
}
