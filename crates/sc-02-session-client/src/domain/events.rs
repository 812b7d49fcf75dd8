//! Lifecycle events broadcast to the application layer.

use super::auth_state::AuthState;
use serde::Serialize;
use shared_types::Address;
use std::time::Duration;

/// Observable session lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Handshake complete; `resumed` when a stored JWT was accepted.
    Authenticated { wallet: Address, resumed: bool },
    /// Broker rejected the handshake, or it timed out.
    AuthFailed { reason: String },
    /// Socket closed; `clean` when this client initiated it.
    Disconnected { reason: String, clean: bool },
    /// A reconnect will be attempted after `delay`.
    ReconnectScheduled { attempt: u32, delay: Duration },
    /// Reconnection gave up.
    ConnectionLost { attempts: u32 },
    /// Auth state changed.
    StateChanged { from: AuthState, to: AuthState },
}
