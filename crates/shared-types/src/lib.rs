//! # Shared Types Crate
//!
//! Value types shared by every crate of the state-channel client.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: addresses, request identifiers and RPC
//!   parameter structs are defined once here.
//! - **Wire Fidelity**: every `Serialize` impl produces exactly the JSON shape
//!   the broker expects, field order included, because these values end up
//!   inside signed payloads.

pub mod entities;
pub mod errors;
pub mod rpc_params;

pub use entities::*;
pub use errors::*;
pub use rpc_params::*;
