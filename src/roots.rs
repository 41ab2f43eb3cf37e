//! Root server selection.

use std::net::SocketAddr;

use rand::seq::IndexedRandom;

use crate::error::ResolveError;
use crate::lookup::HostLookup;

/// The thirteen root server hostnames, `a` through `m`.
pub const ROOT_SERVERS: [&str; 13] = [
    "a.root-servers.net",
    "b.root-servers.net",
    "c.root-servers.net",
    "d.root-servers.net",
    "e.root-servers.net",
    "f.root-servers.net",
    "g.root-servers.net",
    "h.root-servers.net",
    "i.root-servers.net",
    "j.root-servers.net",
    "k.root-servers.net",
    "l.root-servers.net",
    "m.root-servers.net",
];

/// Picks a root server uniformly at random for every query.
///
/// Nothing is cached: spreading queries over all roots is intended.
#[derive(Debug, Default, Clone, Copy)]
pub struct RootSelector;

impl RootSelector {
    /// Choose a root hostname.
    pub fn pick(&self) -> &'static str {
        ROOT_SERVERS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(ROOT_SERVERS[0])
    }

    /// Choose a root and resolve it to an address on `port`.
    pub async fn select<L: HostLookup>(
        &self,
        lookup: &L,
        port: u16,
    ) -> Result<(&'static str, SocketAddr), ResolveError> {
        let host = self.pick();
        let addr = lookup
            .lookup(host, port)
            .await
            .map_err(|source| ResolveError::UpstreamUnresolvable {
                host: host.to_string(),
                source,
            })?;

        Ok((host, addr))
    }
}
