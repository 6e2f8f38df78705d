//! Client-side session lifecycle.
//!
//! The same state machine drives a session over either transport; the
//! transport binding only decides how bytes are framed.  See
//! [`machine::SessionMachine`] for the transition table.

pub mod machine;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use machine::{SessionAction, SessionEvent, SessionMachine, TransitionError};

/// Lifecycle state of one connection attempt.
///
/// `Rejected`, `Busy` and `Failed` are terminal for the attempt; a new
/// `connect` starts over from `Disconnected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    AwaitingApproval,
    Connected,
    Rejected,
    Busy,
    Failed(String),
}

impl SessionState {
    /// `true` for the per-attempt terminal states.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Rejected | SessionState::Busy | SessionState::Failed(_)
        )
    }

    /// `true` while a transport is (or is being) held open.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionState::Connecting | SessionState::AwaitingApproval | SessionState::Connected
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => f.write_str("disconnected"),
            SessionState::Connecting => f.write_str("connecting"),
            SessionState::AwaitingApproval => f.write_str("awaiting approval"),
            SessionState::Connected => f.write_str("connected"),
            SessionState::Rejected => f.write_str("rejected"),
            SessionState::Busy => f.write_str("busy"),
            SessionState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// How touch motion is turned into pointer motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    #[default]
    Absolute,
    Relative,
}

/// Which transport carries a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Connectionless UDP datagrams.
    Datagram,
    /// WebSocket messages.
    Message,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Datagram => f.write_str("udp"),
            TransportKind::Message => f.write_str("ws"),
        }
    }
}
