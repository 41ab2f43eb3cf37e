//! UDP transport for client queries.
//!
//! Every datagram becomes its own local task, so a slow upstream chain
//! never holds up other clients. Replies go back from the listening socket
//! to the address the query came from; per-query failures are logged and
//! the client is left to time out.

use std::io;
use std::net::SocketAddr;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::dns::{self, HEADER_LEN, Header, MAX_UDP_MESSAGE};
use crate::lookup::HostLookup;
use crate::resolver::{QueryAction, Resolver};
use crate::stats::Stats;

use super::QueryLogger;

/// Client-facing UDP transport.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
}

impl UdpTransport {
    /// Bind the listening socket.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);

        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Start the UDP transport.
    ///
    /// Spawns the receive loop on the current `LocalSet`.
    pub fn start<L>(self, resolver: Rc<Resolver<L>>, stats: Arc<Stats>)
    where
        L: HostLookup + 'static,
    {
        tokio::task::spawn_local(run(self.socket, resolver, stats));
    }
}

async fn run<L>(socket: Arc<UdpSocket>, resolver: Rc<Resolver<L>>, stats: Arc<Stats>)
where
    L: HostLookup + 'static,
{
    let mut buf = [0u8; MAX_UDP_MESSAGE];

    loop {
        let (len, src) = match socket.recv_from(&mut buf).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "UDP recv error");
                continue;
            }
        };

        if len < HEADER_LEN {
            debug!(client = %src, len, "dropping short datagram");
            continue;
        }

        tokio::task::spawn_local(handle_query(
            socket.clone(),
            resolver.clone(),
            stats.clone(),
            buf[..len].to_vec(),
            src,
        ));
    }
}

/// Answer one client datagram: sinkhole it or resolve it and relay the
/// final upstream response with AA cleared and RA set.
async fn handle_query<L: HostLookup>(
    socket: Arc<UdpSocket>,
    resolver: Rc<Resolver<L>>,
    stats: Arc<Stats>,
    query: Vec<u8>,
    client: SocketAddr,
) {
    let start_time = Instant::now();
    let logger = QueryLogger::new(client);
    let elapsed_ms = || start_time.elapsed().as_secs_f64() * 1000.0;

    let domain = match resolver.process_query(&query) {
        Ok(QueryAction::Blocked { response, domain }) => {
            send_reply(&socket, &response, client).await;
            stats.record_blocked(elapsed_ms());
            logger.blocked(&domain, elapsed_ms());
            return;
        }
        Ok(QueryAction::Resolve { domain }) => domain,
        Err(e) => {
            stats.record_failed(elapsed_ms());
            logger.failed("<malformed>", &e, elapsed_ms());
            return;
        }
    };

    match resolver.resolve(&query).await {
        Ok(mut resolution) => {
            dns::mark_relayed(&mut resolution.response);
            send_reply(&socket, &resolution.response, client).await;

            let rcode = Header::parse(&resolution.response)
                .map(|header| header.rcode())
                .unwrap_or_default();
            stats.record_resolved(elapsed_ms(), resolution.hops);
            logger.resolved(&domain, &resolution, rcode, elapsed_ms());
        }
        Err(e) => {
            stats.record_failed(elapsed_ms());
            logger.failed(&domain, &e, elapsed_ms());
        }
    }
}

async fn send_reply(socket: &UdpSocket, reply: &[u8], client: SocketAddr) {
    if let Err(e) = socket.send_to(reply, client).await {
        warn!(client = %client, error = %e, "UDP response error");
    }
}
