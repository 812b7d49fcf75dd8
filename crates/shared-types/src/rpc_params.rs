//! # RPC Parameter Types
//!
//! Typed, pre-validated parameters for the broker's RPC methods. Field order
//! in each struct is the order the broker expects inside signed payloads.

use crate::entities::{Address, Allowance, SessionId};
use serde::{Deserialize, Serialize};

// =============================================================================
// AUTHENTICATION
// =============================================================================

/// Parameters of the unsigned `auth_request` that opens the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequestParams {
    /// Long-lived identity (wallet) address.
    pub wallet: Address,
    /// Session key address that will sign subsequent requests.
    pub participant: Address,
    /// Application name, also the EIP-712 domain name.
    pub app_name: String,
    /// Spending allowances granted to the session key.
    #[serde(default)]
    pub allowances: Vec<Allowance>,
    /// Optional expiry (unix seconds, decimal string).
    #[serde(default)]
    pub expire: Option<String>,
    /// Optional permission scope.
    #[serde(default)]
    pub scope: Option<String>,
    /// Optional application contract address.
    #[serde(default)]
    pub application: Option<Address>,
}

// =============================================================================
// APPLICATION SESSIONS
// =============================================================================

/// Participants, weights and quorum of an application session. Fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDefinition {
    /// Application protocol identifier.
    pub protocol: String,
    /// Ordered participant addresses.
    pub participants: Vec<Address>,
    /// Signature weight of each participant, positionally aligned.
    pub weights: Vec<u64>,
    /// Sum of weights required to authorize a state transition.
    pub quorum: u64,
    /// Challenge period in seconds, inherited from the channel definition.
    pub challenge: u64,
    /// Nonce making the session identifier unique.
    pub nonce: u64,
}

impl AppDefinition {
    /// Total weight of all participants.
    pub fn total_weight(&self) -> u64 {
        self.weights.iter().sum()
    }

    /// Weight of one participant, zero when it is not part of the session.
    pub fn weight_of(&self, participant: &Address) -> u64 {
        self.participants
            .iter()
            .position(|p| p == participant)
            .and_then(|idx| self.weights.get(idx).copied())
            .unwrap_or(0)
    }
}

/// Amount of one asset allocated to one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppAllocation {
    pub participant: Address,
    pub asset: String,
    /// Decimal amount string.
    pub amount: String,
}

/// Parameters of `create_app_session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAppSessionRequest {
    pub definition: AppDefinition,
    pub allocations: Vec<AppAllocation>,
}

/// Parameters of `close_app_session`, carrying the final allocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseAppSessionRequest {
    pub app_session_id: SessionId,
    pub allocations: Vec<AppAllocation>,
}

// =============================================================================
// CHANNELS
// =============================================================================

/// Lifecycle status of a channel as reported by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    Open,
    Closed,
    Challenged,
    Resizing,
}

/// Parameters of `close_channel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseChannelRequest {
    pub channel_id: SessionId,
    pub funds_destination: Address,
}

/// Parameters of `resize_channel`.
///
/// `resize_amount` moves funds between custody and the channel (may be negative);
/// `allocate_amount` moves funds between the channel and the unified ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeChannelRequest {
    pub channel_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resize_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocate_amount: Option<String>,
    pub funds_destination: Address,
}

/// Filter of `get_channels`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetChannelsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ChannelStatus>,
}
