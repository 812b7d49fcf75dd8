//! # Error Types
//!
//! Errors raised while constructing shared value types.

use thiserror::Error;

/// Errors produced when parsing an [`Address`](crate::Address).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The input is not valid hexadecimal.
    #[error("Invalid hex in address: {0}")]
    InvalidHex(String),

    /// The decoded byte length is not 20.
    #[error("Invalid address length: expected 20 bytes, got {0}")]
    InvalidLength(usize),
}
