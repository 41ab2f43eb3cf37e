//! UDP exchange with root and authoritative servers.
//!
//! Each query owns one `UpstreamSocket` on an ephemeral port. The socket is
//! connected to the current server before every hop so ICMP errors surface
//! on receive. Connecting does not flush datagrams already queued from an
//! earlier hop, so every datagram is also checked against the current
//! server's address. Anything that is not the reply to the in-flight
//! question from that server is dropped until the hop deadline passes.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::{Instant, timeout_at};
use tracing::debug;

use crate::dns::{Header, MAX_UDP_MESSAGE, Question};
use crate::error::ResolveError;

pub struct UpstreamSocket {
    socket: UdpSocket,
    timeout: Duration,
}

impl UpstreamSocket {
    /// Bind an ephemeral IPv4 socket. Every receive waits at most `timeout`.
    pub async fn bind(timeout: Duration) -> io::Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;

        Ok(Self { socket, timeout })
    }

    /// Send `query` to `server` and wait for the response to it.
    ///
    /// A datagram is accepted only if it comes from `server` and is a
    /// response carrying the query's transaction ID and the same question
    /// (name compared without case).
    pub async fn exchange(
        &mut self,
        query: &[u8],
        id: u16,
        question: &Question,
        server: SocketAddr,
    ) -> Result<Vec<u8>, ResolveError> {
        self.prepare(server).await?;
        self.socket.send(query).await?;

        let deadline = Instant::now() + self.timeout;
        let mut buf = [0u8; MAX_UDP_MESSAGE];

        loop {
            let (len, src) = match timeout_at(deadline, self.socket.recv_from(&mut buf)).await {
                Ok(received) => received?,
                Err(_) => {
                    return Err(ResolveError::UpstreamTimeout {
                        server,
                        timeout_ms: self.timeout.as_millis(),
                    });
                }
            };

            if src != server {
                debug!(%server, %src, len, "dropping datagram from previous hop");
                continue;
            }

            let response = &buf[..len];
            match check_response(response, id, question) {
                Ok(()) => return Ok(response.to_vec()),
                Err(reason) => debug!(%server, len, reason, "dropping upstream datagram"),
            }
        }
    }

    async fn prepare(&mut self, server: SocketAddr) -> io::Result<()> {
        let local = self.socket.local_addr()?;
        if local.is_ipv4() != server.is_ipv4() {
            self.socket = if server.is_ipv4() {
                UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?
            } else {
                UdpSocket::bind((Ipv6Addr::UNSPECIFIED, 0)).await?
            };
        }

        self.socket.connect(server).await
    }
}

fn check_response(response: &[u8], id: u16, question: &Question) -> Result<(), &'static str> {
    let header = Header::parse(response).map_err(|_| "short header")?;
    if !header.is_response() {
        return Err("not a response");
    }
    if header.id != id {
        return Err("transaction id mismatch");
    }
    if header.qdcount == 0 {
        return Err("no question");
    }

    match Question::parse(response) {
        Ok(echoed) if echoed.matches(question) => Ok(()),
        Ok(_) => Err("question mismatch"),
        Err(_) => Err("unparseable question"),
    }
}
