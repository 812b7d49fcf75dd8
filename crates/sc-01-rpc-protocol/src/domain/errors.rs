//! # Protocol Errors
//!
//! Errors raised at builder and signing call sites. These represent
//! integration mistakes, not network noise: inbound parse failures are
//! reported as data by [`parse_response`](super::parse::parse_response).

use crate::ports::outbound::SignerError;
use thiserror::Error;

/// Errors from envelope construction, signing and method building.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Attempted to sign something that is not a request envelope.
    #[error("can only sign request messages")]
    NotARequest,

    /// Envelope carries neither `request` nor `response`.
    #[error("envelope has neither a 'request' nor a 'response' payload")]
    MissingPayload,

    /// Envelope carries both `request` and `response`.
    #[error("envelope has both a 'request' and a 'response' payload")]
    AmbiguousEnvelope,

    /// A specific method was required and another one was received.
    #[error("expected '{expected}' response, got '{actual}'")]
    UnexpectedMethod { expected: String, actual: String },

    /// The `auth_challenge` payload had no `challenge_message` string.
    #[error("challenge_message not found in auth_challenge payload")]
    MissingChallenge,

    /// The supplied response could not be parsed.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// JSON encoding or decoding failed.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The injected signer failed.
    #[error("signer failed: {0}")]
    Signer(#[from] SignerError),

    /// EIP-712 encoding failed.
    #[error("typed data encoding failed: {0}")]
    TypedData(#[from] TypedDataError),
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors from EIP-712 structured data encoding.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypedDataError {
    /// A referenced type is neither primitive nor declared.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// A struct value is missing a declared field.
    #[error("missing field '{field}' in {ty}")]
    MissingField { ty: String, field: String },

    /// A value does not fit its declared type.
    #[error("invalid value for {ty}: {reason}")]
    InvalidValue { ty: String, reason: String },
}
