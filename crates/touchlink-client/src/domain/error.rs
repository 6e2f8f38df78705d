//! Client error type.

use thiserror::Error;
use touchlink_core::ProtocolError;

/// Errors raised by transports and configuration checks.
///
/// Transport errors end the session in `Failed(reason)`; the reason string
/// is this error's `Display` output.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport could not be opened.
    #[error("failed to connect to {target}: {reason}")]
    Connect { target: String, reason: String },

    /// A socket operation failed on an open transport.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The WebSocket layer reported an error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// An outbound message could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The server closed the connection.
    #[error("connection closed by server")]
    Closed,

    /// A configuration value is out of range.
    #[error("invalid client config: {0}")]
    InvalidConfig(String),
}
