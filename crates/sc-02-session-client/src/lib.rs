//! # State-Channel Session Client (SC-02)
//!
//! Authenticated, self-healing session with the broker.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): auth state machine, reconnect policy,
//!   challenge decoding, configuration, errors and events
//! - **Ports Layer** (`ports/`): `SessionApi` (inbound) and `Transport` (outbound)
//! - **Adapters Layer** (`adapters/`): pending request store, WebSocket and
//!   in-memory transports
//! - **Service** (`service.rs`): `SessionClient` handle and its actor task
//!
//! ## Handshake
//!
//! ```text
//! connect() -> open socket -> auth_request -> auth_challenge
//!           -> auth_verify (EIP-712 signed) -> Authenticated
//! ```
//!
//! With a stored JWT the client presents it in `auth_verify` first and falls
//! back to the challenge when the broker rejects it.
//!
//! ## Example
//!
//! ```no_run
//! use sc_02_session_client::{ClientConfig, SessionApi, SessionClient};
//! use sc_01_rpc_protocol::EcdsaKeySigner;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let identity = EcdsaKeySigner::random();
//! let session_key = EcdsaKeySigner::random();
//! let mut config = ClientConfig::default();
//! config.auth.wallet = identity.address();
//! config.auth.participant = session_key.address();
//!
//! let client = SessionClient::with_websocket(config, Arc::new(identity), Arc::new(session_key))?;
//! client.connect().await?;
//! let broker_config = client.get_config().await?;
//! println!("{broker_config}");
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use adapters::{
    BrokerConnection, MemoryListener, MemoryTransport, PendingRequestStore, PendingStats,
    WsTransport,
};
pub use domain::auth_state::{AuthEvent, AuthState};
pub use domain::backoff::{ReconnectDecision, ReconnectPolicy, MAX_RECONNECT_DELAY};
pub use domain::challenge::decode_challenge;
pub use domain::config::{
    AuthConfig, ClientConfig, ConfigError, ReconnectConfig, RequestConfig, DEFAULT_BROKER_URL,
};
pub use domain::error::{ClientError, ClientResult};
pub use domain::events::ClientEvent;
pub use ports::inbound::SessionApi;
pub use ports::outbound::{OutboundFrame, Transport, TransportError, TransportEvent, TransportLink};
pub use service::SessionClient;
