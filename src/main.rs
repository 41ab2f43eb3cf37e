use clap::Parser;
use clap::error::ErrorKind;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use sinkhole::resolver::ResolverConfig;
use sinkhole::server::{self, DEFAULT_PORT, ServerConfig};

/// Exit status for bad command lines.
const USAGE_EXIT_CODE: i32 = -1;

#[derive(Parser, Debug)]
#[command(name = "sinkhole-server")]
#[command(about = "Iterative DNS resolver with a domain sinkhole", long_about = None)]
struct Args {
    /// File of domains to answer with NXDOMAIN, one per line
    blocklist: Option<PathBuf>,

    /// Local port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Bind address
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// How long to wait for each upstream response, in milliseconds
    #[arg(long, default_value_t = 3000)]
    upstream_timeout_ms: u64,

    /// Maximum upstream round trips per query
    #[arg(long, default_value_t = 16)]
    max_hops: usize,

    /// Leave AA clear on sinkhole replies
    #[arg(long)]
    no_authoritative_blocks: bool,

    /// Log filter when RUST_LOG is unset
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            bind_addr: SocketAddr::new(self.bind, self.port),
            blocklist_path: self.blocklist,
            resolver: ResolverConfig {
                upstream_timeout: Duration::from_millis(self.upstream_timeout_ms),
                max_hops: self.max_hops,
                authoritative_blocks: !self.no_authoritative_blocks,
                ..ResolverConfig::default()
            },
            ..ServerConfig::default()
        }
    }
}

/// Exit status for a failed parse, or `None` when clap should exit on its
/// own (`--help`, `--version`).
fn usage_exit_code(err: &clap::Error) -> Option<i32> {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => None,
        _ => Some(USAGE_EXIT_CODE),
    }
}

fn parse_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => match usage_exit_code(&e) {
            Some(code) => {
                let _ = e.print();
                process::exit(code);
            }
            None => e.exit(),
        },
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> io::Result<()> {
    let args = parse_args();
    init_tracing(&args.log_level);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let local = tokio::task::LocalSet::new();
    local.block_on(&rt, server::run(args.into_config()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_runs_without_blocklist() {
        let config = Args::try_parse_from(["sinkhole-server"]).unwrap().into_config();

        assert_eq!(config.blocklist_path, None);
        assert_eq!(config.bind_addr, "0.0.0.0:5300".parse::<SocketAddr>().unwrap());
        assert!(config.resolver.authoritative_blocks);
    }

    #[test]
    fn one_argument_is_blocklist_path() {
        let config = Args::try_parse_from(["sinkhole-server", "blocklist.txt"])
            .unwrap()
            .into_config();

        assert_eq!(config.blocklist_path, Some(PathBuf::from("blocklist.txt")));
    }

    #[test]
    fn two_arguments_are_a_usage_error() {
        let err = Args::try_parse_from(["sinkhole-server", "a.txt", "b.txt"]).unwrap_err();

        assert_eq!(usage_exit_code(&err), Some(-1));
    }

    #[test]
    fn unknown_flag_is_a_usage_error() {
        let err = Args::try_parse_from(["sinkhole-server", "--bogus"]).unwrap_err();

        assert_eq!(usage_exit_code(&err), Some(USAGE_EXIT_CODE));
    }

    #[test]
    fn help_exits_through_clap() {
        let err = Args::try_parse_from(["sinkhole-server", "--help"]).unwrap_err();

        assert_eq!(usage_exit_code(&err), None);
    }

    #[test]
    fn flags_override_defaults() {
        let config = Args::try_parse_from([
            "sinkhole-server",
            "--port",
            "5353",
            "--max-hops",
            "8",
            "--upstream-timeout-ms",
            "1500",
            "--no-authoritative-blocks",
        ])
        .unwrap()
        .into_config();

        assert_eq!(config.bind_addr.port(), 5353);
        assert_eq!(config.resolver.max_hops, 8);
        assert_eq!(config.resolver.upstream_timeout, Duration::from_millis(1500));
        assert!(!config.resolver.authoritative_blocks);
    }
}
