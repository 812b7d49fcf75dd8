//! # State-Channel Client Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/            # Codec, signing and verification throughput
//! └── src/integration/
//!     ├── mock_broker.rs     # Broker side of the wire protocol, in memory
//!     ├── protocol_flows.rs  # Builders + codec + verifiers composed
//!     └── session_flows.rs   # SessionClient against the mock broker
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p sc-tests
//!
//! # By category
//! cargo test -p sc-tests integration::session_flows::
//! cargo test -p sc-tests integration::protocol_flows::
//!
//! # Benchmarks
//! cargo bench -p sc-tests
//! ```

pub mod integration;
