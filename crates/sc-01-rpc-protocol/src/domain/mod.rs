//! # Domain Layer
//!
//! Pure protocol logic: envelope construction and parsing, hashing, typed
//! data and the signing/verification plumbing. No I/O.

pub mod auth_policy;
pub mod eip712;
pub mod envelope;
pub mod errors;
pub mod hashing;
pub mod ids;
pub mod methods;
pub mod parse;
pub mod signing;
