//! Client configuration.
//!
//! Built by the binary from CLI flags; tests construct it directly with
//! struct-update syntax over [`ClientConfig::default`].

use std::net::SocketAddr;
use std::time::Duration;

use touchlink_core::{InputMode, TransportKind, Viewport};

use crate::domain::error::ClientError;

/// Highest accepted pacer frame rate.
pub const MAX_FRAME_RATE: u32 = 240;

/// Everything a session needs to know before it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Host service address (UDP port or WebSocket port, per `transport`).
    pub server_addr: SocketAddr,
    pub transport: TransportKind,
    /// Device viewport announced in HELLO; MOVE coordinates live in it.
    pub viewport: Viewport,
    /// Pad size as a percentage of the shorter container side (10..=100).
    pub pad_scale_percent: f64,
    pub mode: InputMode,
    /// HELLO retransmission period while awaiting approval.
    pub hello_interval_ms: u64,
    /// PING period while connected.
    pub keepalive_interval_ms: u64,
    /// A connected session that hears nothing for this long has failed.
    pub pong_timeout_ms: u64,
    /// MOVE sends per second at most.
    pub frame_rate: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 9002)),
            transport: TransportKind::Datagram,
            viewport: Viewport {
                width: 390,
                height: 844,
            },
            pad_scale_percent: 100.0,
            mode: InputMode::Absolute,
            hello_interval_ms: 500,
            keepalive_interval_ms: 1000,
            pong_timeout_ms: 5000,
            frame_rate: 60,
        }
    }
}

impl ClientConfig {
    /// Checks the values the session runner depends on.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.hello_interval_ms == 0 || self.keepalive_interval_ms == 0 {
            return Err(ClientError::InvalidConfig(
                "hello and keepalive intervals must be greater than zero".into(),
            ));
        }
        if self.pong_timeout_ms <= self.keepalive_interval_ms {
            return Err(ClientError::InvalidConfig(format!(
                "pong_timeout_ms ({}) must exceed keepalive_interval_ms ({})",
                self.pong_timeout_ms, self.keepalive_interval_ms
            )));
        }
        if self.frame_rate == 0 || self.frame_rate > MAX_FRAME_RATE {
            return Err(ClientError::InvalidConfig(format!(
                "frame_rate must be within 1..={MAX_FRAME_RATE}, got {}",
                self.frame_rate
            )));
        }
        if !self.pad_scale_percent.is_finite() {
            return Err(ClientError::InvalidConfig("pad_scale_percent must be finite".into()));
        }
        Ok(())
    }

    pub fn hello_interval(&self) -> Duration {
        Duration::from_millis(self.hello_interval_ms)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    /// Time between pacer flushes.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate.max(1)))
    }

    /// WebSocket URL for the message transport.  The host ignores the path.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.server_addr)
    }
}
