//! Sinkhole - an iterative DNS resolver that answers blocklisted names
//! with NXDOMAIN.
//!
//! This library exposes the wire codec, resolver and transports for the
//! server binary, benchmarking and testing.

pub mod dns;
pub mod error;
pub mod filter;
pub mod lookup;
pub mod resolver;
pub mod roots;
pub mod server;
pub mod stats;
pub mod transport;
