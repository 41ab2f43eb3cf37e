//! Sinkhole server orchestration.
//!
//! Loads the blocklist, binds the client transport and runs the resolver.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::filter::Blocklist;
use crate::lookup::SystemLookup;
use crate::resolver::{Resolver, ResolverConfig};
use crate::stats::Stats;
use crate::transport::udp::UdpTransport;

/// Well-known client-facing port.
pub const DEFAULT_PORT: u16 = 5300;

/// Configuration for the sinkhole server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Local address to bind (e.g., 0.0.0.0:5300)
    pub bind_addr: SocketAddr,
    /// Blocklist file; `None` disables blocking entirely
    pub blocklist_path: Option<PathBuf>,
    pub resolver: ResolverConfig,
    /// How often to log query statistics
    pub stats_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            blocklist_path: None,
            resolver: ResolverConfig::default(),
            stats_interval: Duration::from_secs(60),
        }
    }
}

/// Load the blocklist at `path`.
///
/// An unreadable file is logged once and yields an empty blocklist, so the
/// server still resolves everything.
pub fn load_blocklist(path: Option<&Path>) -> Blocklist {
    let Some(path) = path else {
        return Blocklist::new();
    };

    match Blocklist::load(path) {
        Ok(blocklist) => blocklist,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unable to read blocklist, blocking nothing");
            Blocklist::new()
        }
    }
}

/// Run the sinkhole server with the given configuration.
///
/// Must be driven inside a `LocalSet`. Only fails if the client socket
/// cannot be bound; otherwise runs indefinitely.
pub async fn run(config: ServerConfig) -> io::Result<()> {
    let blocklist = load_blocklist(config.blocklist_path.as_deref());
    let resolver = Rc::new(Resolver::new(blocklist, SystemLookup, config.resolver.clone()));
    let stats = Arc::new(Stats::new());

    let udp = UdpTransport::bind(config.bind_addr).await?;

    info!(
        addr = %udp.local_addr()?,
        blocked = resolver.blocked_count(),
        max_hops = config.resolver.max_hops,
        upstream_timeout_ms = config.resolver.upstream_timeout.as_millis(),
        "sinkhole resolver listening"
    );

    udp.start(resolver, stats.clone());

    let mut interval = tokio::time::interval(config.stats_interval);
    interval.tick().await; // Skip first immediate tick
    loop {
        interval.tick().await;
        let snapshot = stats.snapshot_and_reset();
        if snapshot.requests == 0 {
            continue;
        }
        info!(
            requests = snapshot.requests,
            resolved = snapshot.resolved,
            blocked = snapshot.blocked,
            failed = snapshot.failed,
            avg_hops = format_args!("{:.2}", snapshot.avg_hops),
            avg_response_ms = format_args!("{:.2}", snapshot.avg_response_ms),
            "stats"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_wire_defaults() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 5300);
        assert!(config.bind_addr.ip().is_unspecified());
        assert_eq!(config.resolver.max_hops, 16);
        assert_eq!(config.resolver.upstream_port, 53);
    }

    #[test]
    fn load_blocklist_without_path_is_empty() {
        assert!(load_blocklist(None).is_empty());
    }

    #[test]
    fn load_blocklist_unreadable_file_is_empty() {
        let blocklist = load_blocklist(Some(Path::new("/nonexistent/sinkhole/blocklist.txt")));

        assert!(blocklist.is_empty());
    }

    #[test]
    fn load_blocklist_reads_entries() {
        let path = std::env::temp_dir().join(format!("sinkhole-server-{}.txt", std::process::id()));
        std::fs::write(&path, "ads.example.com\ntracker.example.net\n").unwrap();

        let blocklist = load_blocklist(Some(&path));
        std::fs::remove_file(&path).unwrap();

        assert_eq!(blocklist.len(), 2);
        assert!(blocklist.is_blocked("ads.example.com"));
    }
}
