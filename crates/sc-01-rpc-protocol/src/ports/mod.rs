//! # Ports Layer
//!
//! Traits at the seams of the protocol crate. The signing backend (wallet or
//! key manager) and the verification scheme are injected through these.

pub mod outbound;
