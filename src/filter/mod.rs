//! DNS query filtering module.
//!
//! Sinkholes queries for blocklisted names by answering them locally with
//! NXDOMAIN instead of resolving them.

mod blocklist;

pub use blocklist::Blocklist;

use crate::dns::{self, WireError};

/// Check if a DNS query should be blocked and return the sinkhole reply.
///
/// Returns `None` if the query should be resolved normally.
pub fn filter_query(
    blocklist: &Blocklist,
    query: &[u8],
    authoritative: bool,
) -> Result<Option<Vec<u8>>, WireError> {
    let domain = extract_domain(query)?;

    if blocklist.is_blocked(&domain) {
        Ok(Some(dns::blocked_reply(query, authoritative)))
    } else {
        Ok(None)
    }
}

/// Extract the queried name (the QNAME at offset 12) from a query.
pub fn extract_domain(query: &[u8]) -> Result<String, WireError> {
    let (name, _) = dns::parse_name(query, dns::HEADER_LEN)?;

    Ok(name)
}
