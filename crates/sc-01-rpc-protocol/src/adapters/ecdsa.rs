//! # Local secp256k1 Signer and Verifier
//!
//! Signatures are `0x`-prefixed hex of `r || s || v`, 65 bytes, with
//! `v` in {27, 28}.
//!
//! ## Security Notes
//!
//! - **Malleability Prevention (EIP-2)**: produced signatures are low-S; high-S
//!   signatures are rejected on verification
//! - **Constant-Time Comparison**: recovered addresses are compared with `subtle`

use crate::domain::eip712::TypedData;
use crate::domain::hashing::{keccak256, payload_digest, Hash};
use crate::ports::outbound::{MessageSigner, MessageVerifier, SignerError, VerifierError};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use serde_json::Value;
use shared_types::Address;
use std::fmt;
use subtle::ConstantTimeEq;

/// Ethereum address of a public key: last 20 bytes of keccak256 of the
/// uncompressed point without its `0x04` prefix.
pub fn address_from_pubkey(public_key: &VerifyingKey) -> Address {
    let pubkey_bytes = public_key.to_encoded_point(false);
    let hash = keccak256(&pubkey_bytes.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    Address(address)
}

/// Valid v values: 0, 1, 27, 28.
fn parse_recovery_id(v: u8) -> Result<RecoveryId, VerifierError> {
    let id = match v {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => {
            return Err(VerifierError::MalformedSignature(format!(
                "invalid recovery id {v}"
            )))
        }
    };
    RecoveryId::try_from(id)
        .map_err(|_| VerifierError::MalformedSignature(format!("invalid recovery id {v}")))
}

fn addresses_equal(a: &Address, b: &Address) -> bool {
    a.as_bytes()[..].ct_eq(&b.as_bytes()[..]).into()
}

// =============================================================================
// SIGNER
// =============================================================================

/// Signer holding a secp256k1 private key in process memory.
#[derive(Clone)]
pub struct EcdsaKeySigner {
    key: SigningKey,
    address: Address,
}

impl EcdsaKeySigner {
    pub fn new(key: SigningKey) -> Self {
        let address = address_from_pubkey(key.verifying_key());
        Self { key, address }
    }

    /// Fresh random key, e.g. for an ephemeral session key.
    pub fn random() -> Self {
        Self::new(SigningKey::random(&mut rand::rngs::OsRng))
    }

    /// Parse a 32-byte hex private key, with or without `0x`.
    pub fn from_hex(private_key: &str) -> Result<Self, SignerError> {
        let digits = private_key.strip_prefix("0x").unwrap_or(private_key);
        let bytes = hex::decode(digits.trim())
            .map_err(|e| SignerError::Failed(format!("invalid private key hex: {e}")))?;
        let key = SigningKey::from_slice(&bytes)
            .map_err(|_| SignerError::Failed("invalid private key".to_string()))?;
        Ok(Self::new(key))
    }

    /// Address of this key.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a 32-byte digest.
    pub fn sign_digest(&self, digest: &Hash) -> Result<String, SignerError> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest)
            .map_err(|e| SignerError::Failed(e.to_string()))?;

        let (signature, recovery_id) = match signature.normalize_s() {
            Some(low) => (
                low,
                RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
            ),
            None => (signature, recovery_id),
        };

        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&signature.to_bytes());
        bytes[64] = 27 + recovery_id.to_byte();
        Ok(format!("0x{}", hex::encode(bytes)))
    }
}

impl fmt::Debug for EcdsaKeySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcdsaKeySigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl MessageSigner for EcdsaKeySigner {
    async fn sign_payload(&self, payload: &Value) -> Result<String, SignerError> {
        self.sign_digest(&payload_digest(payload))
    }

    async fn sign_typed_data(&self, data: &TypedData) -> Result<String, SignerError> {
        let digest = data
            .signing_hash()
            .map_err(|e| SignerError::Failed(e.to_string()))?;
        self.sign_digest(&digest)
    }
}

// =============================================================================
// VERIFIER
// =============================================================================

/// Recovering verifier for [`EcdsaKeySigner`] signatures.
///
/// `verify_multiple` is strict: one signature per expected signer, in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcdsaVerifier;

impl EcdsaVerifier {
    pub fn new() -> Self {
        Self
    }

    /// Recover the signer address of a hex signature over `digest`.
    pub fn recover(&self, digest: &Hash, signature: &str) -> Result<Address, VerifierError> {
        let digits = signature.strip_prefix("0x").unwrap_or(signature);
        let bytes = hex::decode(digits)
            .map_err(|e| VerifierError::MalformedSignature(e.to_string()))?;
        if bytes.len() != 65 {
            return Err(VerifierError::MalformedSignature(format!(
                "expected 65 bytes, got {}",
                bytes.len()
            )));
        }

        let recovery_id = parse_recovery_id(bytes[64])?;
        let sig = Signature::from_slice(&bytes[..64])
            .map_err(|_| VerifierError::MalformedSignature("invalid r or s".to_string()))?;
        if sig.normalize_s().is_some() {
            return Err(VerifierError::MalformedSignature(
                "high S value".to_string(),
            ));
        }

        let key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
            .map_err(|_| VerifierError::RecoveryFailed)?;
        Ok(address_from_pubkey(&key))
    }

    /// Recover the signer of a payload tuple signature.
    pub fn recover_payload(
        &self,
        payload: &Value,
        signature: &str,
    ) -> Result<Address, VerifierError> {
        self.recover(&payload_digest(payload), signature)
    }

    /// Recover the signer of a typed-data signature.
    pub fn recover_typed_data(
        &self,
        data: &TypedData,
        signature: &str,
    ) -> Result<Address, VerifierError> {
        let digest = data
            .signing_hash()
            .map_err(|e| VerifierError::Failed(e.to_string()))?;
        self.recover(&digest, signature)
    }
}

impl MessageVerifier for EcdsaVerifier {
    fn verify(
        &self,
        payload: &Value,
        signature: &str,
        signer: &Address,
    ) -> Result<bool, VerifierError> {
        let recovered = self.recover_payload(payload, signature)?;
        Ok(addresses_equal(&recovered, signer))
    }

    fn verify_multiple(
        &self,
        payload: &Value,
        signatures: &[String],
        signers: &[Address],
    ) -> Result<bool, VerifierError> {
        if signatures.len() != signers.len() || signatures.is_empty() {
            return Ok(false);
        }
        for (signature, signer) in signatures.iter().zip(signers) {
            if !self.verify(payload, signature, signer)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
pub mod test_helpers {
    use super::*;

    /// Two independent random signers.
    pub fn signer_pair() -> (EcdsaKeySigner, EcdsaKeySigner) {
        (EcdsaKeySigner::random(), EcdsaKeySigner::random())
    }

    /// Secp256k1 order minus `s`.
    pub fn invert_s(s: &[u8]) -> [u8; 32] {
        const ORDER: [u8; 32] = [
            0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
            0xFF, 0xFE, 0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C,
            0xD0, 0x36, 0x41, 0x41,
        ];
        let mut result = [0u8; 32];
        let mut borrow: i32 = 0;
        for i in (0..32).rev() {
            let diff = ORDER[i] as i32 - s[i] as i32 - borrow;
            if diff < 0 {
                result[i] = (diff + 256) as u8;
                borrow = 1;
            } else {
                result[i] = diff as u8;
                borrow = 0;
            }
        }
        result
    }
}
