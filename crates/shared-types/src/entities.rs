//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Identity**: `Address`
//! - **Correlation**: `RequestId`, `Timestamp`
//! - **Authorization**: `Allowance`

use crate::errors::AddressError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// Re-export U256 from primitive-types for amount handling across crates
pub use primitive_types::U256;

// =============================================================================
// CLUSTER A: CORRELATION
// =============================================================================

/// Integer correlation key of an RPC request, unique per in-flight request.
pub type RequestId = u64;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Hex identifier of an application session or channel (`0x`-prefixed).
pub type SessionId = String;

// =============================================================================
// CLUSTER B: IDENTITY
// =============================================================================

/// A 20-byte Ethereum-style address.
///
/// Serialized as a lowercase `0x`-prefixed hex string. Parsing accepts either
/// case, with or without the prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Build an address from a 20-byte slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        let array: [u8; 20] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self(array))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Lowercase `0x`-prefixed hex form.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// True for the all-zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(trimmed).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// CLUSTER C: AUTHORIZATION
// =============================================================================

/// A spending allowance declared by the session key during authentication.
///
/// `amount` is a decimal integer string (token base units).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allowance {
    /// Asset symbol (e.g. `usdc`).
    pub asset: String,
    /// Amount in base units, as a decimal string.
    pub amount: String,
}

impl Allowance {
    pub fn new(asset: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            amount: amount.into(),
        }
    }
}
