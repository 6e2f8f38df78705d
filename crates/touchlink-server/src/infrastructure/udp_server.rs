//! UDP server: the datagram receive loop.
//!
//! Every datagram is exactly one [`Packet`].  The loop decodes it, asks the
//! [`SessionService`] what to do, and answers from the same socket:
//!
//! ```text
//! HELLO  → (operator decides) → ACCEPT(host) | REJECT
//!        → BUSY                   if another peer holds the slot
//!        → ACCEPT(host) again     if this peer is already connected
//! MOVE   → pointer moves          (connected peer only, no reply)
//! PING   → PONG(t)                (connected peer only)
//! ```
//!
//! Malformed datagrams and packets from peers that are not connected are
//! dropped without a reply.
//!
//! # Why is approval spawned?
//!
//! The operator may take seconds to answer.  Waiting inline would stop the
//! loop from serving the connected peer's MOVEs (and from answering BUSY to
//! others), so each pending admission gets its own Tokio task that replies
//! once the decision arrives.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use touchlink_core::{decode_packet, encode_packet, Packet, Viewport};

use crate::application::session_service::{HelloOutcome, SessionService, Verdict};
use crate::domain::session::Peer;
use crate::infrastructure::ServerError;

/// How often the loop wakes up to check the shutdown flag.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Larger than any packet; oversized datagrams fail the length check.
const RECV_BUFFER_LEN: usize = 512;

/// A bound UDP socket ready to serve touch packets.
pub struct UdpServer {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
}

impl UdpServer {
    /// Binds the socket.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address is unavailable.
    pub async fn bind(addr: SocketAddr) -> Result<Self, ServerError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = socket.local_addr()?;
        info!("UDP touch server listening on {local_addr}");
        Ok(Self {
            socket: Arc::new(socket),
            local_addr,
        })
    }

    /// The actual bound address (useful when binding port 0 in tests).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Receives datagrams until `running` is cleared.
    pub async fn run(self, service: Arc<SessionService>, running: Arc<AtomicBool>) {
        let mut buf = [0u8; RECV_BUFFER_LEN];

        loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown flag set; stopping UDP receive loop");
                break;
            }

            match timeout(POLL_INTERVAL, self.socket.recv_from(&mut buf)).await {
                Ok(Ok((len, from))) => self.handle_datagram(&buf[..len], from, &service).await,
                Ok(Err(e)) => {
                    // Some platforms surface ICMP "port unreachable" from an
                    // earlier send as a receive error.  Keep serving.
                    warn!("UDP receive error: {e}");
                }
                Err(_) => {}
            }
        }
    }

    async fn handle_datagram(&self, bytes: &[u8], from: SocketAddr, service: &Arc<SessionService>) {
        let packet = match decode_packet(bytes) {
            Ok(packet) => packet,
            Err(e) => {
                debug!(%from, "dropping malformed datagram: {e}");
                return;
            }
        };
        let peer = Peer::datagram(from);

        match packet {
            Packet::Hello { width, height } => self.handle_hello(peer, width, height, service).await,
            Packet::Move { x, y } => {
                if !service.on_move(&peer, x, y) {
                    debug!(%peer, "move from peer without a session ignored");
                }
            }
            Packet::Ping(t) => {
                if service.on_ping(&peer) {
                    send_packet(&self.socket, &Packet::Pong(t), from).await;
                } else {
                    debug!(%peer, "ping from peer without a session ignored");
                }
            }
            other => debug!(%peer, "unexpected {} packet from a client", other.name()),
        }
    }

    async fn handle_hello(
        &self,
        peer: Peer,
        width: u16,
        height: u16,
        service: &Arc<SessionService>,
    ) {
        let Some(viewport) = Viewport::new(width, height) else {
            debug!(%peer, width, height, "hello with empty viewport ignored");
            return;
        };

        match service.on_hello(peer, viewport) {
            HelloOutcome::Pending(request) => {
                let socket = Arc::clone(&self.socket);
                let service = Arc::clone(service);
                tokio::spawn(async move {
                    let reply = match service.decide(request).await {
                        Verdict::Accepted(screen) => Packet::Accept(Some(screen)),
                        Verdict::Rejected => Packet::Reject,
                        Verdict::Abandoned => return,
                    };
                    send_packet(&socket, &reply, peer.addr).await;
                });
            }
            HelloOutcome::Ignored => debug!(%peer, "hello retransmission while awaiting approval"),
            HelloOutcome::Accept(screen) => {
                send_packet(&self.socket, &Packet::Accept(Some(screen)), peer.addr).await;
            }
            HelloOutcome::Busy => send_packet(&self.socket, &Packet::Busy, peer.addr).await,
        }
    }
}

async fn send_packet(socket: &UdpSocket, packet: &Packet, to: SocketAddr) {
    if let Err(e) = socket.send_to(&encode_packet(packet), to).await {
        warn!(%to, "failed to send {}: {e}", packet.name());
    }
}
