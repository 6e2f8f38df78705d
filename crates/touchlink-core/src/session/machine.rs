//! Session transition table.
//!
//! ```text
//!                 connect              transport ready          accept
//!  Disconnected ──────────► Connecting ─────────────► AwaitingApproval ──────► Connected
//!       ▲                      │                         │  │  │                 │
//!       │                      │ failure         reject  │  │  │ failure         │ failure
//!       │                      ▼                         ▼  │  ▼                 ▼
//!       │                   Failed ◄──────────── Rejected  Busy  Failed        Failed
//!       │
//!       └──────────────── disconnect (from any state) ─────────────────────────────
//! ```
//!
//! The machine only decides *what* should happen; it returns a list of
//! [`SessionAction`]s and the caller (the client's session runner) performs
//! them.  This keeps the table testable without sockets or timers.

use thiserror::Error;
use tracing::debug;

use super::SessionState;
use crate::protocol::packet::ScreenSize;

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The user asked to connect.
    ConnectRequested,
    /// The transport is open and the first HELLO can go out.
    TransportReady,
    /// Server accepted; carries the host size when the transport reports it.
    Accepted(Option<ScreenSize>),
    Rejected,
    Busy,
    /// The transport could not be opened, broke, or went silent.
    TransportFailed(String),
    /// The user asked to disconnect.
    Disconnect,
}

/// Side effects the caller must perform after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    StartHelloResend,
    StopHelloResend,
    StartKeepalive,
    StopKeepalive,
    TearDownTransport,
    ApplyHostScreen(ScreenSize),
}

/// An event arrived that the current state does not accept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("event {event:?} is not valid in state {state}")]
pub struct TransitionError {
    pub state: SessionState,
    pub event: SessionEvent,
}

/// The client-side session state machine.
#[derive(Debug, Clone)]
pub struct SessionMachine {
    state: SessionState,
    host_screen: Option<ScreenSize>,
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMachine {
    pub fn new() -> Self {
        Self {
            state: SessionState::Disconnected,
            host_screen: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Host screen size reported by the server, once known.
    pub fn host_screen(&self) -> Option<ScreenSize> {
        self.host_screen
    }

    /// MOVE packets may only be sent while connected.
    pub fn can_send_moves(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Records a host screen size that arrived separately from the accept
    /// (the WebSocket `remote_screen` message).
    pub fn set_host_screen(&mut self, size: ScreenSize) -> Option<SessionAction> {
        record_host_screen(&mut self.host_screen, size)
    }

    /// Applies `event`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] and leaves the state unchanged when the
    /// event is not valid in the current state (for example an ACCEPT that
    /// arrives after a disconnect).
    pub fn handle(&mut self, event: SessionEvent) -> Result<Vec<SessionAction>, TransitionError> {
        use SessionAction as A;
        use SessionState as S;

        let (next, actions) = match (&self.state, &event) {
            (S::Disconnected, SessionEvent::ConnectRequested) => (S::Connecting, vec![]),
            // A fresh attempt after a terminal outcome starts over.
            (s, SessionEvent::ConnectRequested) if s.is_terminal() => {
                self.host_screen = None;
                (S::Connecting, vec![])
            }

            (S::Connecting, SessionEvent::TransportReady) => {
                (S::AwaitingApproval, vec![A::StartHelloResend])
            }

            (S::AwaitingApproval, SessionEvent::Accepted(size)) => {
                let mut actions = vec![A::StopHelloResend, A::StartKeepalive];
                if let Some(action) = size.and_then(|s| record_host_screen(&mut self.host_screen, s)) {
                    actions.push(action);
                }
                (S::Connected, actions)
            }
            // A duplicate ACCEPT answers a retransmitted HELLO; it may carry a
            // new host size.
            (S::Connected, SessionEvent::Accepted(size)) => {
                let actions = size
                    .and_then(|s| record_host_screen(&mut self.host_screen, s))
                    .into_iter()
                    .collect();
                (S::Connected, actions)
            }

            (S::AwaitingApproval, SessionEvent::Rejected) => {
                (S::Rejected, vec![A::StopHelloResend, A::TearDownTransport])
            }
            (S::AwaitingApproval, SessionEvent::Busy) => {
                (S::Busy, vec![A::StopHelloResend, A::TearDownTransport])
            }

            (S::Connecting, SessionEvent::TransportFailed(reason)) => {
                (S::Failed(reason.clone()), vec![A::TearDownTransport])
            }
            (S::AwaitingApproval, SessionEvent::TransportFailed(reason)) => (
                S::Failed(reason.clone()),
                vec![A::StopHelloResend, A::TearDownTransport],
            ),
            (S::Connected, SessionEvent::TransportFailed(reason)) => (
                S::Failed(reason.clone()),
                vec![A::StopKeepalive, A::TearDownTransport],
            ),

            (_, SessionEvent::Disconnect) => {
                let actions = match self.state {
                    S::Connecting => vec![A::TearDownTransport],
                    S::AwaitingApproval => vec![A::StopHelloResend, A::TearDownTransport],
                    S::Connected => vec![A::StopKeepalive, A::TearDownTransport],
                    _ => vec![],
                };
                self.host_screen = None;
                (S::Disconnected, actions)
            }

            _ => {
                return Err(TransitionError {
                    state: self.state.clone(),
                    event: event.clone(),
                })
            }
        };

        if next != self.state {
            debug!(from = %self.state, to = %next, ?event, "session transition");
        }
        self.state = next;
        Ok(actions)
    }
}

fn record_host_screen(slot: &mut Option<ScreenSize>, size: ScreenSize) -> Option<SessionAction> {
    if !size.is_known() || *slot == Some(size) {
        return None;
    }
    *slot = Some(size);
    Some(SessionAction::ApplyHostScreen(size))
}
