//! Notifications from the session task to the UI.
//!
//! The session task never calls into UI code.  It pushes [`ClientEvent`]s
//! into an unbounded channel and whoever owns the receiver (a GUI, the CLI
//! probe, a test) renders them however it likes.

use touchlink_core::{ScreenSize, SessionState};

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// The session moved to a new state.
    StateChanged(SessionState),
    /// The host screen size became known or changed; the pad was rebuilt.
    HostScreen(ScreenSize),
    /// A PONG matched an outstanding PING.
    RoundTrip {
        rtt_ms: u64,
        ping_interval_ms: Option<u64>,
        pong_interval_ms: Option<u64>,
    },
    /// MOVE packets sent during the last full second.
    SendRate(u32),
}
