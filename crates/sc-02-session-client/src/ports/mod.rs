//! # Ports Layer
//!
//! - `inbound`: the API the session client offers
//! - `outbound`: the duplex message transport it depends on

pub mod inbound;
pub mod outbound;
