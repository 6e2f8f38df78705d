//! SessionService: the transport-neutral session use case.
//!
//! Both receive loops (UDP and WebSocket) translate their wire format into
//! calls on this service and translate the returned outcomes back into
//! replies.  The service ties together the three application pieces:
//!
//! - [`SessionRegistry`] decides who holds the slot,
//! - [`ApprovalBroker`] gets the operator's decision,
//! - [`PointerDispatcher`] moves the host pointer.
//!
//! # Architecture
//!
//! The service depends on a [`Clock`] rather than reading the system time,
//! so eviction can be tested without sleeping.

use std::sync::Arc;
use std::time::Duration;

use touchlink_core::{Clock, ScreenSize, Viewport};
use tracing::{debug, info};

use crate::application::approval::{ApprovalBroker, ApprovalRequest};
use crate::application::pointer::PointerDispatcher;
use crate::application::registry::{Admission, Resolved, SessionRegistry};
use crate::domain::session::{Peer, SessionId, SessionSnapshot};

/// What the transport should do after a HELLO.
#[derive(Debug, Clone, PartialEq)]
pub enum HelloOutcome {
    /// The operator must decide; pass this to [`SessionService::decide`]
    /// from a task that may wait.
    Pending(ApprovalRequest),
    /// Duplicate HELLO while waiting for the operator; send nothing.
    Ignored,
    /// The peer is already connected; send the accept again.
    Accept(ScreenSize),
    /// Another peer holds the slot; send the busy reply.
    Busy,
}

/// Final answer for a pending admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted(ScreenSize),
    Rejected,
    /// The session vanished while waiting (peer left); send nothing.
    Abandoned,
}

/// Shared by every transport task through an `Arc`.
pub struct SessionService {
    registry: SessionRegistry,
    broker: ApprovalBroker,
    pointer: PointerDispatcher,
    clock: Arc<dyn Clock>,
    session_timeout_ms: u64,
}

impl SessionService {
    pub fn new(
        broker: ApprovalBroker,
        pointer: PointerDispatcher,
        clock: Arc<dyn Clock>,
        session_timeout: Duration,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(),
            broker,
            pointer,
            clock,
            session_timeout_ms: u64::try_from(session_timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn host_screen(&self) -> ScreenSize {
        self.pointer.screen_size()
    }

    /// Handles a HELLO / `init` from `peer`.
    pub fn on_hello(&self, peer: Peer, viewport: Viewport) -> HelloOutcome {
        let now = self.clock.now_ms();
        match self.registry.admit(peer, viewport, self.host_screen(), now) {
            Admission::Pending(session) => HelloOutcome::Pending(ApprovalRequest {
                session,
                peer,
                viewport,
            }),
            Admission::Retransmission => HelloOutcome::Ignored,
            Admission::Refreshed(screen) => HelloOutcome::Accept(screen),
            Admission::Busy => HelloOutcome::Busy,
        }
    }

    /// Waits for the operator and applies the decision.
    ///
    /// Dropping the returned future before it completes abandons the
    /// request; the approval worker then skips it.
    pub async fn decide(&self, request: ApprovalRequest) -> Verdict {
        let session = request.session;
        let peer = request.peer;
        let decision = self.broker.request(request).await;
        let host = self.host_screen();
        match self
            .registry
            .resolve(session, decision, host, self.clock.now_ms())
        {
            Ok(Resolved::Approved(_)) => Verdict::Accepted(host),
            Ok(Resolved::Rejected) => Verdict::Rejected,
            Err(e) => {
                debug!(%peer, "dropping approval decision: {e}");
                Verdict::Abandoned
            }
        }
    }

    /// Handles a MOVE.  Returns `false` if the peer is not connected, in
    /// which case the packet is ignored.
    pub fn on_move(&self, peer: &Peer, x: u16, y: u16) -> bool {
        match self.registry.record_move(peer, self.clock.now_ms()) {
            Some(viewport) => {
                self.pointer.submit(viewport, x, y);
                true
            }
            None => false,
        }
    }

    /// Handles a PING.  Returns `true` if a PONG should be sent.
    pub fn on_ping(&self, peer: &Peer) -> bool {
        self.registry.record_activity(peer, self.clock.now_ms())
    }

    /// `true` while `peer` holds the slot as the connected session.
    pub fn is_connected(&self, peer: &Peer) -> bool {
        self.registry.is_connected(peer)
    }

    /// Handles an explicit disconnect or transport failure.
    pub fn on_disconnect(&self, peer: &Peer) -> Option<SessionSnapshot> {
        self.registry.release(peer, self.clock.now_ms())
    }

    /// Evicts the connected session if it has gone silent.
    pub fn sweep(&self) -> Option<SessionSnapshot> {
        let evicted = self
            .registry
            .evict_idle(self.clock.now_ms(), self.session_timeout_ms)?;
        info!(
            peer = %evicted.peer,
            moves = evicted.total_moves,
            "slot freed by inactivity"
        );
        Some(evicted)
    }

    /// A copy of the current session, if any.
    pub fn current(&self) -> Option<SessionSnapshot> {
        self.registry.current(self.clock.now_ms())
    }

    /// Id of the current session, if any.
    pub fn current_id(&self) -> Option<SessionId> {
        self.current().map(|s| s.id)
    }
}
