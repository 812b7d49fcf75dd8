//! # Outbound Ports (Driven Ports / SPI)
//!
//! A duplex, message-oriented transport. Implementations deliver open,
//! message, close and error events over a channel and accept text frames.

use thiserror::Error;
use tokio::sync::mpsc;

/// Error from a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connect failed: {0}")]
    Connect(String),

    /// A frame could not be written.
    #[error("send failed: {0}")]
    Send(String),

    /// The connection is already closed.
    #[error("transport closed")]
    Closed,
}

/// A frame written to the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    /// Close the socket; `reason` goes into the close frame.
    Close { reason: String },
}

/// An event read from the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Message(String),
    Closed { code: Option<u16>, reason: String },
    Error(String),
}

/// An open connection: frames go out on `outbound`, events come in on `inbound`.
///
/// Dropping `outbound` closes the connection.
#[derive(Debug)]
pub struct TransportLink {
    pub outbound: mpsc::Sender<OutboundFrame>,
    pub inbound: mpsc::Receiver<TransportEvent>,
}

/// Opens connections to the broker.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Open a connection to `url`. Resolves once the socket is open.
    async fn open(&self, url: &str) -> Result<TransportLink, TransportError>;
}
