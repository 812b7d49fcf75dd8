//! # Inbound Ports (Driving Ports / API)
//!
//! What application code calls.

use crate::adapters::pending::PendingStats;
use crate::domain::auth_state::AuthState;
use crate::domain::error::ClientResult;
use crate::domain::events::ClientEvent;
use sc_01_rpc_protocol::{ParsedResponse, RpcMethod};
use serde_json::Value;
use shared_types::SessionId;
use tokio::sync::{broadcast, mpsc};

/// Authenticated session with the broker.
#[async_trait::async_trait]
pub trait SessionApi: Send + Sync {
    /// Connect and authenticate. Resolves immediately when already
    /// authenticated; concurrent callers share one attempt.
    async fn connect(&self) -> ClientResult<()>;

    /// Close the socket on purpose. No reconnect follows.
    async fn disconnect(&self, reason: &str) -> ClientResult<()>;

    /// Send a request signed by the session key and await its response payload.
    async fn request(
        &self,
        method: RpcMethod,
        params: Vec<Value>,
        session_id: Option<SessionId>,
    ) -> ClientResult<Value>;

    /// Unsolicited frames with the given method.
    async fn subscribe(&self, method: &str) -> ClientResult<mpsc::Receiver<ParsedResponse>>;

    /// Lifecycle events.
    fn events(&self) -> broadcast::Receiver<ClientEvent>;

    /// Current auth state.
    async fn state(&self) -> ClientResult<AuthState>;

    /// Pending-request counters.
    async fn stats(&self) -> ClientResult<PendingStats>;
}
