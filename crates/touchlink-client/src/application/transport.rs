//! The transport seam.
//!
//! The session runner speaks only the transport-neutral
//! [`ClientMessage`] / [`ServerMessage`] vocabulary.  Each binding (UDP,
//! WebSocket) lives in the infrastructure layer and implements this trait.

use async_trait::async_trait;
use touchlink_core::{ClientMessage, ServerMessage};

use crate::domain::ClientError;

/// One open connection to the host.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send {
    /// Sends one message.  Messages the transport has no encoding for are
    /// skipped and reported as sent.
    async fn send(&mut self, message: ClientMessage) -> Result<(), ClientError>;

    /// Waits for the next inbound message.
    ///
    /// Returns `Ok(None)` for frames that carry nothing for the client
    /// (malformed datagrams, protocol-level pings).  Must be cancel-safe:
    /// the runner polls it inside `select!`.
    ///
    /// # Errors
    ///
    /// Any error ends the session.
    async fn recv(&mut self) -> Result<Option<ServerMessage>, ClientError>;

    /// Closes the connection.  Errors are ignored.
    async fn close(&mut self);
}
