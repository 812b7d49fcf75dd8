//! In-process transport.
//!
//! Every `open()` hands the far end of the new link to a [`MemoryListener`],
//! so a test broker can script replies, close the socket or refuse
//! connections without any network.

use crate::ports::outbound::{
    OutboundFrame, Transport, TransportError, TransportEvent, TransportLink,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

const LINK_CAPACITY: usize = 64;

/// Client side of the in-process transport.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    accept: mpsc::UnboundedSender<BrokerConnection>,
    refuse: Arc<AtomicU32>,
    opened: Arc<AtomicU32>,
    capacity: usize,
}

/// Broker side: yields one [`BrokerConnection`] per successful open.
#[derive(Debug)]
pub struct MemoryListener {
    incoming: Mutex<mpsc::UnboundedReceiver<BrokerConnection>>,
}

/// Far end of one link.
#[derive(Debug)]
pub struct BrokerConnection {
    pub url: String,
    /// Frames the client wrote.
    pub from_client: mpsc::Receiver<OutboundFrame>,
    /// Events delivered to the client.
    pub to_client: mpsc::Sender<TransportEvent>,
}

impl MemoryTransport {
    pub fn new() -> (Self, MemoryListener) {
        Self::with_capacity(LINK_CAPACITY)
    }

    /// Links with `capacity` frames of buffering in each direction.
    pub fn with_capacity(capacity: usize) -> (Self, MemoryListener) {
        let (accept, incoming) = mpsc::unbounded_channel();
        (
            Self {
                accept,
                refuse: Arc::new(AtomicU32::new(0)),
                opened: Arc::new(AtomicU32::new(0)),
                capacity: capacity.max(1),
            },
            MemoryListener {
                incoming: Mutex::new(incoming),
            },
        )
    }

    /// Refuse the next `count` opens with a connect error.
    pub fn refuse_next(&self, count: u32) {
        self.refuse.store(count, Ordering::SeqCst);
    }

    /// Number of open attempts, refused ones included.
    pub fn open_attempts(&self) -> u32 {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    async fn open(&self, url: &str) -> Result<TransportLink, TransportError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(TransportError::Connect(format!("{url}: connection refused")));
        }

        let (outbound_tx, outbound_rx) = mpsc::channel(self.capacity);
        let (inbound_tx, inbound_rx) = mpsc::channel(self.capacity);
        self.accept
            .send(BrokerConnection {
                url: url.to_string(),
                from_client: outbound_rx,
                to_client: inbound_tx,
            })
            .map_err(|_| TransportError::Connect(format!("{url}: no listener")))?;

        Ok(TransportLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

impl MemoryListener {
    /// Next accepted connection, or `None` once every transport is dropped.
    pub async fn accept(&self) -> Option<BrokerConnection> {
        self.incoming.lock().await.recv().await
    }
}

impl BrokerConnection {
    /// Next text frame from the client. `None` when the client closed or dropped the link.
    pub async fn recv_text(&mut self) -> Option<String> {
        match self.from_client.recv().await? {
            OutboundFrame::Text(text) => Some(text),
            OutboundFrame::Close { .. } => None,
        }
    }

    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), TransportError> {
        self.to_client
            .send(TransportEvent::Message(text.into()))
            .await
            .map_err(|_| TransportError::Closed)
    }

    /// Close from the broker side with `code`.
    pub async fn close(self, code: u16, reason: &str) {
        let _ = self
            .to_client
            .send(TransportEvent::Closed {
                code: Some(code),
                reason: reason.to_string(),
            })
            .await;
    }
}
