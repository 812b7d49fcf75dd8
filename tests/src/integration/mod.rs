//! # Integration Tests
//!
//! Cross-crate flows. The mock broker is public so other test crates can
//! drive a `SessionClient` without a network.

pub mod mock_broker;
pub mod protocol_flows;
pub mod session_flows;
