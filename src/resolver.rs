//! DNS query resolution logic.
//!
//! Handles the core query processing pipeline:
//! 1. Filter (sinkhole blocklisted names)
//! 2. Iterate from a random root server down the NS referral chain
//!
//! Transports handle the client-facing I/O, the resolver handles decisions
//! and the upstream dialogue.

use std::net::SocketAddr;
use std::time::Duration;

use tracing::{debug, warn};

use crate::dns::{self, Header, Question};
use crate::error::ResolveError;
use crate::filter::{Blocklist, extract_domain, filter_query};
use crate::lookup::{HostLookup, SystemLookup};
use crate::roots::RootSelector;
use crate::transport::upstream::UpstreamSocket;

/// Tunables for the iterative loop.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Port queried on roots and authoritative servers.
    pub upstream_port: u16,
    /// How long each hop waits for a matching response.
    pub upstream_timeout: Duration,
    /// Upper bound on upstream round trips per query, root included.
    pub max_hops: usize,
    /// Set AA on sinkhole replies so stub resolvers cache the NXDOMAIN.
    pub authoritative_blocks: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            upstream_port: 53,
            upstream_timeout: Duration::from_secs(3),
            max_hops: 16,
            authoritative_blocks: true,
        }
    }
}

/// Action to take for a DNS query.
#[derive(Debug)]
pub enum QueryAction {
    /// Query is blocked, return this response immediately.
    Blocked { response: Vec<u8>, domain: String },
    /// Query should be resolved iteratively.
    Resolve { domain: String },
}

/// Outcome of the iterative loop.
#[derive(Debug)]
pub struct Resolution {
    /// Last upstream response, exactly as received.
    pub response: Vec<u8>,
    /// Number of upstream round trips, root included.
    pub hops: usize,
    /// Server that sent `response`.
    pub server: SocketAddr,
    /// The loop stopped on the hop bound while still being referred.
    pub hop_limit_reached: bool,
}

/// Resolver handles DNS query processing decisions.
///
/// Holds everything shared between in-flight queries: the blocklist, the
/// host lookup used for root and NS names, and the loop configuration.
/// None of it changes after construction.
pub struct Resolver<L = SystemLookup> {
    blocklist: Blocklist,
    lookup: L,
    roots: RootSelector,
    config: ResolverConfig,
}

impl<L: HostLookup> Resolver<L> {
    pub fn new(blocklist: Blocklist, lookup: L, config: ResolverConfig) -> Self {
        Self {
            blocklist,
            lookup,
            roots: RootSelector,
            config,
        }
    }

    /// Decide what to do with a raw client query.
    pub fn process_query(&self, query: &[u8]) -> Result<QueryAction, ResolveError> {
        let domain = extract_domain(query).map_err(ResolveError::MalformedRequest)?;

        let blocked = filter_query(&self.blocklist, query, self.config.authoritative_blocks)
            .map_err(ResolveError::MalformedRequest)?;

        Ok(match blocked {
            Some(response) => QueryAction::Blocked { response, domain },
            None => QueryAction::Resolve { domain },
        })
    }

    /// Resolve `query` iteratively, starting from a random root server.
    ///
    /// The query bytes are sent unchanged to every server. After each
    /// response the loop follows the first NS record of the authority
    /// section for as long as the response is a referral (NOERROR, no
    /// answers, at least one authority record), up to `max_hops` round
    /// trips. Whatever the last server returned is the result.
    pub async fn resolve(&self, query: &[u8]) -> Result<Resolution, ResolveError> {
        let header = Header::parse(query).map_err(ResolveError::MalformedRequest)?;
        let question = Question::parse(query).map_err(ResolveError::MalformedRequest)?;
        let port = self.config.upstream_port;
        let max_hops = self.config.max_hops.max(1);

        let (root, mut server) = self.roots.select(&self.lookup, port).await?;
        debug!(qname = %question.name, root, %server, "starting at root");

        let mut upstream = UpstreamSocket::bind(self.config.upstream_timeout).await?;
        let mut hops = 0;

        loop {
            let response = upstream.exchange(query, header.id, &question, server).await?;
            hops += 1;

            let reply = Header::parse(&response)
                .map_err(|source| ResolveError::MalformedResponse { server, source })?;

            if !reply.is_referral() {
                return Ok(Resolution {
                    response,
                    hops,
                    server,
                    hop_limit_reached: false,
                });
            }

            if hops >= max_hops {
                warn!(qname = %question.name, hops, "hop limit reached, returning last referral");
                return Ok(Resolution {
                    response,
                    hops,
                    server,
                    hop_limit_reached: true,
                });
            }

            let target = dns::first_authority_ns(&response)
                .map_err(|source| ResolveError::MalformedResponse { server, source })?;
            let Some(target) = target else {
                debug!(qname = %question.name, %server, "no NS in authority, treating as final");
                return Ok(Resolution {
                    response,
                    hops,
                    server,
                    hop_limit_reached: false,
                });
            };

            server = self
                .lookup
                .lookup(&target, port)
                .await
                .map_err(|source| ResolveError::UpstreamUnresolvable {
                    host: target.clone(),
                    source,
                })?;
            debug!(qname = %question.name, hop = hops + 1, ns = %target, %server, "following referral");
        }
    }

    /// Returns the number of domains in the blocklist.
    pub fn blocked_count(&self) -> usize {
        self.blocklist.len()
    }
}
