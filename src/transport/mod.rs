//! Transport layer for the sinkhole resolver.
//!
//! `udp` serves clients; `upstream` talks to root and authoritative
//! servers on behalf of one query.

pub mod udp;
pub mod upstream;

use std::net::SocketAddr;

use tracing::{info, warn};

use crate::error::ResolveError;
use crate::resolver::Resolution;

/// Logger for completed client queries.
pub struct QueryLogger {
    client: SocketAddr,
}

impl QueryLogger {
    pub fn new(client: SocketAddr) -> Self {
        Self { client }
    }

    pub fn blocked(&self, domain: &str, elapsed_ms: f64) {
        info!(
            client = %self.client,
            domain,
            total_ms = format_args!("{elapsed_ms:.3}"),
            "BLOCKED"
        );
    }

    pub fn resolved(&self, domain: &str, resolution: &Resolution, rcode: u8, elapsed_ms: f64) {
        info!(
            client = %self.client,
            domain,
            hops = resolution.hops,
            rcode,
            from = %resolution.server,
            hop_limit = resolution.hop_limit_reached,
            total_ms = format_args!("{elapsed_ms:.3}"),
            "RESOLVED"
        );
    }

    pub fn failed(&self, domain: &str, error: &ResolveError, elapsed_ms: f64) {
        warn!(
            client = %self.client,
            domain,
            %error,
            total_ms = format_args!("{elapsed_ms:.3}"),
            "FAILED"
        );
    }
}
