//! # Adapters Layer
//!
//! Concrete implementations of the outbound ports.

pub mod ecdsa;
pub mod quorum;

pub use ecdsa::{address_from_pubkey, EcdsaKeySigner, EcdsaVerifier};
pub use quorum::{QuorumPolicy, QuorumVerifier};
