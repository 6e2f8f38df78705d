//! Infrastructure layer for touchlink-server.
//!
//! Contains OS-facing adapters: the UDP and WebSocket listeners, the
//! inactivity sweeper, the stdin operator prompt, and pointer backends.
//!
//! **Dependency rule**: this layer may depend on `application`, `domain` and
//! `touchlink_core`, but MUST NOT be imported by the `application` or domain
//! layers.

use std::net::SocketAddr;

use thiserror::Error;

pub mod pointer_sink;
pub mod prompt;
pub mod sweeper;
pub mod udp_server;
pub mod ws_server;

pub use pointer_sink::{LoggingPointerSink, RecordingPointerSink};
pub use prompt::StdinPrompt;
pub use sweeper::run_sweeper;
pub use udp_server::UdpServer;
pub use ws_server::WsServer;

/// Errors raised while setting up a listener.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The socket could not be bound (port in use, missing permission, ...).
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Any other socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
