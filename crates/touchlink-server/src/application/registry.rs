//! SessionRegistry: the single session slot.
//!
//! The registry is the only component that may create, promote or drop the
//! current session.  Every operation runs inside one `std::sync::Mutex`
//! critical section, so admission and eviction are atomic with respect to
//! packets arriving concurrently from several addresses on either transport.
//!
//! # Slot rules
//!
//! | Slot holds                  | HELLO from same peer | HELLO from other peer |
//! |-----------------------------|----------------------|-----------------------|
//! | nothing                     | → `Pending`          | → `Pending`           |
//! | session awaiting approval   | → `Retransmission`   | → `Busy`              |
//! | connected session           | → `Refreshed`        | → `Busy`              |
//!
//! The mutex is never held across an `.await`; the approval wait happens
//! outside the registry, between [`SessionRegistry::admit`] and
//! [`SessionRegistry::resolve`].

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use touchlink_core::{RateMeter, ScreenSize, Viewport};
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::approval::Decision;
use crate::domain::session::{Peer, SessionId, SessionSnapshot, SlotState};

/// Errors from resolving an approval decision.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The session was released (peer left, evicted) before the decision.
    #[error("session {0} no longer holds the slot")]
    UnknownSession(SessionId),

    /// The session was already approved.
    #[error("session {0} is not awaiting approval")]
    NotAwaitingApproval(SessionId),
}

/// Result of [`SessionRegistry::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A new session was created; the caller must obtain an operator
    /// decision and call [`SessionRegistry::resolve`].
    Pending(SessionId),
    /// The peer is already awaiting approval; nothing to do.
    Retransmission,
    /// The peer is already connected; its viewport was refreshed and the
    /// accept should be sent again (the first one may have been lost).
    Refreshed(ScreenSize),
    /// Another peer holds the slot.
    Busy,
}

/// Result of a successful [`SessionRegistry::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Approved(SessionSnapshot),
    /// The session was discarded and the slot freed.
    Rejected,
}

/// The live session record.
#[derive(Debug)]
struct Session {
    id: SessionId,
    peer: Peer,
    state: SlotState,
    viewport: Viewport,
    host_screen: Option<ScreenSize>,
    created_at_ms: u64,
    last_activity_ms: u64,
    moves: RateMeter,
}

impl Session {
    fn snapshot(&mut self, now: u64) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            peer: self.peer,
            state: self.state,
            viewport: self.viewport,
            host_screen: self.host_screen,
            created_at_ms: self.created_at_ms,
            last_activity_ms: self.last_activity_ms,
            total_moves: self.moves.total(),
            move_rate: self.moves.rate(now),
        }
    }

    fn is_connected_peer(&self, peer: &Peer) -> bool {
        self.state == SlotState::Connected && self.peer == *peer
    }
}

/// Owner of the process-wide session slot.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    slot: Mutex<Option<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A panic in another thread must not wedge the whole server; the slot
    /// contents are always left consistent between statements.
    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handles a HELLO (or WebSocket `init`) from `peer`.
    pub fn admit(&self, peer: Peer, viewport: Viewport, host: ScreenSize, now: u64) -> Admission {
        let mut slot = self.lock();
        match slot.as_mut() {
            None => {
                let id = Uuid::new_v4();
                *slot = Some(Session {
                    id,
                    peer,
                    state: SlotState::AwaitingApproval,
                    viewport,
                    host_screen: None,
                    created_at_ms: now,
                    last_activity_ms: now,
                    moves: RateMeter::new(),
                });
                info!(%peer, %id, width = viewport.width, height = viewport.height, "session awaiting approval");
                Admission::Pending(id)
            }
            Some(s) if s.peer != peer => {
                debug!(%peer, holder = %s.peer, "slot busy");
                Admission::Busy
            }
            Some(s) if s.state == SlotState::AwaitingApproval => Admission::Retransmission,
            Some(s) => {
                s.viewport = viewport;
                s.last_activity_ms = now;
                let screen = *s.host_screen.get_or_insert(host);
                debug!(%peer, width = viewport.width, height = viewport.height, "viewport refreshed");
                Admission::Refreshed(screen)
            }
        }
    }

    /// Applies the operator's decision for session `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownSession`] when the session is gone
    /// (its peer disconnected or it was replaced) and
    /// [`RegistryError::NotAwaitingApproval`] when it was already approved.
    pub fn resolve(
        &self,
        id: SessionId,
        decision: Decision,
        host: ScreenSize,
        now: u64,
    ) -> Result<Resolved, RegistryError> {
        let mut slot = self.lock();
        let session = match slot.as_mut() {
            Some(s) if s.id == id => s,
            _ => return Err(RegistryError::UnknownSession(id)),
        };
        if session.state != SlotState::AwaitingApproval {
            return Err(RegistryError::NotAwaitingApproval(id));
        }

        match decision {
            Decision::Approve => {
                session.state = SlotState::Connected;
                session.host_screen = Some(host);
                // The eviction window starts at approval, not at the HELLO.
                session.last_activity_ms = now;
                info!(peer = %session.peer, %id, "session connected");
                Ok(Resolved::Approved(session.snapshot(now)))
            }
            Decision::Reject => {
                info!(peer = %session.peer, %id, "session rejected");
                *slot = None;
                Ok(Resolved::Rejected)
            }
        }
    }

    /// Marks the connected peer as alive.  Returns `false` (and changes
    /// nothing) for any other peer.
    pub fn record_activity(&self, peer: &Peer, now: u64) -> bool {
        let mut slot = self.lock();
        match slot.as_mut() {
            Some(s) if s.is_connected_peer(peer) => {
                s.last_activity_ms = now;
                true
            }
            _ => false,
        }
    }

    /// Counts a MOVE from `peer`.  Returns the viewport the coordinates are
    /// relative to, or `None` if the peer is not the connected session.
    pub fn record_move(&self, peer: &Peer, now: u64) -> Option<Viewport> {
        let mut slot = self.lock();
        let session = slot.as_mut().filter(|s| s.is_connected_peer(peer))?;
        session.last_activity_ms = now;
        if let Some(rate) = session.moves.record(now) {
            debug!(peer = %session.peer, rate, "moves per second");
        }
        Some(session.viewport)
    }

    /// `true` if `peer` holds the slot in the connected state.
    pub fn is_connected(&self, peer: &Peer) -> bool {
        self.lock()
            .as_ref()
            .map(|s| s.is_connected_peer(peer))
            .unwrap_or(false)
    }

    /// Releases the slot if `peer` holds it, in any state.
    pub fn release(&self, peer: &Peer, now: u64) -> Option<SessionSnapshot> {
        let mut slot = self.lock();
        if slot.as_ref().map(|s| s.peer != *peer).unwrap_or(true) {
            return None;
        }
        let mut session = slot.take()?;
        info!(%peer, id = %session.id, "session released");
        Some(session.snapshot(now))
    }

    /// Evicts the connected session if it has been silent for more than
    /// `timeout_ms`.  Sessions awaiting approval are never evicted.
    pub fn evict_idle(&self, now: u64, timeout_ms: u64) -> Option<SessionSnapshot> {
        let mut slot = self.lock();
        let idle = slot
            .as_ref()
            .map(|s| {
                s.state == SlotState::Connected
                    && now.saturating_sub(s.last_activity_ms) > timeout_ms
            })
            .unwrap_or(false);
        if !idle {
            return None;
        }
        let mut session = slot.take()?;
        info!(peer = %session.peer, id = %session.id, "session evicted after inactivity");
        Some(session.snapshot(now))
    }

    /// A copy of the current session, if any.
    pub fn current(&self, now: u64) -> Option<SessionSnapshot> {
        self.lock().as_mut().map(|s| s.snapshot(now))
    }
}
