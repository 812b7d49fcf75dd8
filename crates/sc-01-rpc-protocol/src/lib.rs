//! # State-Channel RPC Protocol (SC-01)
//!
//! Wire protocol spoken with the broker.
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): envelope codec, defensive response parsing,
//!   EIP-712 hashing, signing and fail-closed verification helpers
//! - **Ports Layer** (`ports/`): `MessageSigner` and `MessageVerifier`
//! - **Adapters Layer** (`adapters/`): local secp256k1 signer/verifier and the
//!   weighted quorum verifier
//! - **RPC Layer** (`rpc/`): one builder per broker method
//!
//! ## Wire Format
//!
//! ```text
//! Request:  {"request":[id, method, params, ts], "signatures":[hex, ...]}
//! Response: {"response":[id, method, payload, ts], "signatures"?:[...], "sessionId"?:hex}
//! Error:    {"response":[id, "error", [{"error": string}], ts]}
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod rpc;

// Re-export public API
pub use adapters::{EcdsaKeySigner, EcdsaVerifier, QuorumPolicy, QuorumVerifier};
pub use domain::auth_policy::auth_typed_data;
pub use domain::eip712::{Eip712Domain, TypedData, TypedField};
pub use domain::envelope::{
    create_request, create_session_request, signable_payload, Envelope, RequestEnvelope,
    ResponseEnvelope, ResponsePayload, RpcPayload,
};
pub use domain::errors::{ProtocolError, ProtocolResult, TypedDataError};
pub use domain::ids::{generate_request_id, now_ms};
pub use domain::methods::{is_auth_method, RpcMethod, SigningMode};
pub use domain::parse::{parse_response, ParsedResponse, RawMessage};
pub use domain::signing::{
    sign_envelope, sign_raw, sign_request, verify_multiple, verify_response_signer,
    verify_single, SignedEnvelope,
};
pub use ports::outbound::{MessageSigner, MessageVerifier, SignerError, VerifierError};
pub use rpc::auth::{auth_verify_with_jwt, challenge_from_response};
pub use rpc::{AppSessionRpc, AuthRpc, ChannelRpc, LedgerRpc, RequestOptions, RpcBuilders};
