//! Session value types.
//!
//! The live session record is owned by
//! [`SessionRegistry`](crate::application::SessionRegistry); everything else
//! sees it through a [`SessionSnapshot`] copy.

use std::fmt;
use std::net::SocketAddr;

use touchlink_core::{ScreenSize, TransportKind, Viewport};
use uuid::Uuid;

/// Unique identifier for a session, derived from UUID v4.
pub type SessionId = Uuid;

/// A remote device as seen by one transport.
///
/// The transport is part of the identity: a UDP peer and a WebSocket peer
/// on the same address are different peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Peer {
    pub transport: TransportKind,
    pub addr: SocketAddr,
}

impl Peer {
    pub fn datagram(addr: SocketAddr) -> Self {
        Self {
            transport: TransportKind::Datagram,
            addr,
        }
    }

    pub fn message(addr: SocketAddr) -> Self {
        Self {
            transport: TransportKind::Message,
            addr,
        }
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.transport, self.addr)
    }
}

/// Server-side lifecycle of the slot holder.
///
/// Rejected, busy and evicted sessions are not kept, so only the two live
/// states appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    AwaitingApproval,
    Connected,
}

/// Read-only copy of the current session.
///
/// There is no input mode here.  Absolute and relative mode differ only in
/// how the device turns touches into MOVE coordinates; the host receives
/// the same absolute viewport positions either way, so it never learns
/// which mode is active.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub peer: Peer,
    pub state: SlotState,
    /// Device viewport; MOVE coordinates are relative to this.
    pub viewport: Viewport,
    /// Host screen size sent in the accept, once approved.
    pub host_screen: Option<ScreenSize>,
    pub created_at_ms: u64,
    pub last_activity_ms: u64,
    pub total_moves: u64,
    /// Moves received in the last completed second.
    pub move_rate: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_display_includes_transport() {
        let addr: SocketAddr = "192.168.1.20:50000".parse().unwrap();
        assert_eq!(Peer::datagram(addr).to_string(), "udp://192.168.1.20:50000");
        assert_eq!(Peer::message(addr).to_string(), "ws://192.168.1.20:50000");
    }

    #[test]
    fn test_same_address_on_different_transports_are_distinct_peers() {
        let addr: SocketAddr = "10.0.0.2:4000".parse().unwrap();
        assert_ne!(Peer::datagram(addr), Peer::message(addr));
    }
}
