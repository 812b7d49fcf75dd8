//! # Domain Layer
//!
//! Pure session logic: the auth state machine, reconnect policy, challenge
//! decoding, configuration and errors. No I/O.

pub mod auth_state;
pub mod backoff;
pub mod challenge;
pub mod config;
pub mod error;
pub mod events;
