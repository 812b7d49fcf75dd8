//! # Outbound Ports (Driven Ports / SPI)
//!
//! Capabilities the protocol needs from its environment: something that can
//! sign, and something that can check signatures.

use crate::domain::eip712::TypedData;
use serde_json::Value;
use shared_types::Address;
use thiserror::Error;

/// Error from a signing backend.
#[derive(Debug, Error)]
pub enum SignerError {
    /// The backend (wallet, HSM, remote signer) is not reachable.
    #[error("signer unavailable")]
    Unavailable,

    /// The backend refused or failed to sign.
    #[error("signing failed: {0}")]
    Failed(String),

    /// The backend cannot sign this kind of input.
    #[error("operation not supported by this signer")]
    Unsupported,
}

/// Signing capability.
///
/// Invoked at most once per signable operation. Implementations own their key
/// material; the protocol never caches or derives keys.
#[async_trait::async_trait]
pub trait MessageSigner: Send + Sync {
    /// Sign a payload tuple (`[id, method, params, ts]`), returning a hex signature.
    async fn sign_payload(&self, payload: &Value) -> Result<String, SignerError>;

    /// Sign EIP-712 typed data, returning a hex signature.
    async fn sign_typed_data(&self, data: &TypedData) -> Result<String, SignerError>;
}

/// Error from a signature verifier.
#[derive(Debug, Error)]
pub enum VerifierError {
    /// Not a well-formed signature string.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// No public key could be recovered from the signature.
    #[error("public key recovery failed")]
    RecoveryFailed,

    /// Any other failure inside the verifier.
    #[error("verification failed: {0}")]
    Failed(String),
}

/// Verification capability.
///
/// `verify_multiple` owns the quorum semantics: how many signatures of the
/// set are enough, and whether their order matters.
pub trait MessageVerifier: Send + Sync {
    /// Check that `signature` over `payload` was produced by `signer`.
    fn verify(&self, payload: &Value, signature: &str, signer: &Address)
        -> Result<bool, VerifierError>;

    /// Check a signature set against a set of expected signers.
    fn verify_multiple(
        &self,
        payload: &Value,
        signatures: &[String],
        signers: &[Address],
    ) -> Result<bool, VerifierError>;
}
