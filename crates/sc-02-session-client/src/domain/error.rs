//! Session client errors.

use super::config::ConfigError;
use crate::ports::outbound::TransportError;
use sc_01_rpc_protocol::ProtocolError;
use shared_types::RequestId;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to callers of the session client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The broker rejected authentication.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// No terminal auth message arrived in time.
    #[error("authentication timed out after {0:?}")]
    AuthTimeout(Duration),

    /// Reconnection gave up. Distinct from an authentication failure.
    #[error("connection lost after {attempts} reconnect attempts")]
    ConnectionLost { attempts: u32 },

    /// A request was issued before the session authenticated.
    #[error("not authenticated")]
    NotAuthenticated,

    /// No response arrived within the request timeout.
    #[error("request {request_id} ({method}) timed out")]
    RequestTimeout { request_id: RequestId, method: String },

    /// The broker answered with an `error` response.
    #[error("{method} failed: {message}")]
    Rpc { method: String, message: String },

    /// The socket closed while the operation was in flight.
    #[error("disconnected: {0}")]
    Disconnected(String),

    /// The ID is already in flight.
    #[error("request id {0} already pending")]
    DuplicateRequestId(RequestId),

    /// Transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Building or signing a message failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The `auth_challenge` payload carried no challenge string.
    #[error("challenge not found in auth_challenge payload")]
    ChallengeNotFound,

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The client task has stopped.
    #[error("session client is shutting down")]
    ShuttingDown,
}

/// Result type for session client operations.
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Whether the same operation may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::AuthTimeout(_)
                | ClientError::RequestTimeout { .. }
                | ClientError::Disconnected(_)
                | ClientError::Transport(_)
                | ClientError::DuplicateRequestId(_)
        )
    }
}
