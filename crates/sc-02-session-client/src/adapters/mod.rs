//! # Adapters Layer
//!
//! - `pending`: request/response correlation with deadlines
//! - `ws_transport`: tokio-tungstenite WebSocket transport
//! - `memory`: in-process transport for tests and local tooling

pub mod memory;
pub mod pending;
pub mod ws_transport;

pub use memory::{BrokerConnection, MemoryListener, MemoryTransport};
pub use pending::{PendingRequestStore, PendingStats, RpcOutcome};
pub use ws_transport::WsTransport;
