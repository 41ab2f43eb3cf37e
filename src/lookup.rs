//! Hostname to address resolution for upstream servers.
//!
//! Root and NS target names are turned into addresses through the host's
//! resolver. The trait lets tests substitute a fixed table so the whole
//! iterative loop can run against mock servers on loopback.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use rustc_hash::FxHashMap;

pub trait HostLookup {
    /// Resolve `host` to a socket address on `port`.
    fn lookup(&self, host: &str, port: u16) -> impl Future<Output = io::Result<SocketAddr>>;
}

/// Uses the operating system resolver via `tokio::net::lookup_host`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLookup;

impl HostLookup for SystemLookup {
    async fn lookup(&self, host: &str, port: u16) -> io::Result<SocketAddr> {
        let addrs = tokio::net::lookup_host((host, port)).await?;
        let mut fallback = None;

        // Prefer IPv4, fall back to the first IPv6 address.
        for addr in addrs {
            if addr.is_ipv4() {
                return Ok(addr);
            }
            fallback.get_or_insert(addr);
        }

        fallback.ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no address for {host}"))
        })
    }
}

/// Fixed hostname table. Names are matched case-insensitively and the
/// stored port wins over the requested one.
#[derive(Debug, Default, Clone)]
pub struct StaticLookup {
    hosts: FxHashMap<String, SocketAddr>,
}

impl StaticLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, host: &str, addr: SocketAddr) {
        self.hosts.insert(host.to_ascii_lowercase(), addr);
    }

    pub fn with(mut self, host: &str, addr: SocketAddr) -> Self {
        self.insert(host, addr);
        self
    }
}

impl HostLookup for StaticLookup {
    async fn lookup(&self, host: &str, _port: u16) -> io::Result<SocketAddr> {
        self.hosts
            .get(&host.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("unknown host {host}")))
    }
}
