//! Datagram transport: one [`Packet`] per UDP datagram.
//!
//! The socket is `connect`ed to the host, so `recv` only ever sees datagrams
//! from that address.  UDP gives no delivery guarantee; the session runner
//! covers a lost HELLO with retransmission and a lost PONG with the
//! keepalive timeout.

use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::{debug, info};
use touchlink_core::{decode_packet, encode_packet, ClientMessage, ServerMessage};

use crate::application::transport::Transport;
use crate::domain::ClientError;

/// Larger than any packet; oversized datagrams fail the length check.
const RECV_BUFFER_LEN: usize = 512;

#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    server: SocketAddr,
    buf: Vec<u8>,
}

impl UdpTransport {
    /// Binds an ephemeral local port and connects it to `server`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connect`] if the socket cannot be bound or
    /// connected.
    pub async fn connect(server: SocketAddr) -> Result<Self, ClientError> {
        let connect_error = |e: std::io::Error| ClientError::Connect {
            target: format!("udp://{server}"),
            reason: e.to_string(),
        };

        let local: SocketAddr = if server.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(local).await.map_err(connect_error)?;
        socket.connect(server).await.map_err(connect_error)?;
        info!("UDP transport ready for {server}");

        Ok(Self {
            socket,
            server,
            buf: vec![0u8; RECV_BUFFER_LEN],
        })
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&mut self, message: ClientMessage) -> Result<(), ClientError> {
        let Some(packet) = message.to_packet() else {
            debug!(?message, "no datagram encoding; skipped");
            return Ok(());
        };
        self.socket.send(&encode_packet(&packet)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<ServerMessage>, ClientError> {
        let len = self.socket.recv(&mut self.buf).await?;
        match decode_packet(&self.buf[..len]) {
            Ok(packet) => {
                let message = ServerMessage::from_packet(packet);
                if message.is_none() {
                    debug!(packet = packet.name(), "unexpected packet from {}", self.server);
                }
                Ok(message)
            }
            Err(e) => {
                debug!("dropping malformed datagram from {}: {e}", self.server);
                Ok(None)
            }
        }
    }

    async fn close(&mut self) {
        // Connectionless: nothing to tell the host.
        debug!("UDP transport to {} closed", self.server);
    }
}
