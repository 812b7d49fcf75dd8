//! Keccak256 and the canonical byte form of signed payloads.

use serde_json::Value;
use sha3::{Digest, Keccak256};

/// 32-byte digest.
pub type Hash = [u8; 32];

/// Keccak256 hash function.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Canonical bytes of a payload tuple: compact JSON, object keys in insertion order.
pub fn canonical_bytes(payload: &Value) -> Vec<u8> {
    // Serializing a `Value` cannot fail.
    serde_json::to_vec(payload).unwrap_or_default()
}

/// Digest a payload tuple is signed over.
pub fn payload_digest(payload: &Value) -> Hash {
    keccak256(&canonical_bytes(payload))
}
