//! Per-query failures.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::dns::WireError;

/// Why a query was dropped without a reply.
///
/// Every variant is confined to the query that raised it; the server logs
/// it and keeps serving.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("malformed request: {0}")]
    MalformedRequest(WireError),

    #[error("malformed response from {server}: {source}")]
    MalformedResponse {
        server: SocketAddr,
        source: WireError,
    },

    #[error("cannot resolve upstream {host}: {source}")]
    UpstreamUnresolvable {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("upstream I/O failed: {0}")]
    UpstreamIo(#[from] io::Error),

    #[error("no valid response from {server} within {timeout_ms}ms")]
    UpstreamTimeout { server: SocketAddr, timeout_ms: u128 },
}
