//! Operator approval of new devices.
//!
//! Asking a human is slow and blocking, so it must never happen inside a
//! receive loop.  Instead:
//!
//! 1. The transport task calls [`ApprovalBroker::request`], which enqueues a
//!    [`PendingApproval`] carrying a oneshot reply channel and awaits it.
//! 2. A single [`approval_worker`] task pulls requests one at a time and asks
//!    an [`ApprovalPrompt`] (stdin in production, a script in tests).
//! 3. The decision travels back through the oneshot.
//!
//! Anything other than an explicit approval is a rejection: a closed queue,
//! a dropped reply channel, end of input, or an unrecognised answer.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use touchlink_core::Viewport;

use crate::domain::session::{Peer, SessionId};

/// Maximum number of requests queued for the operator.
const APPROVAL_QUEUE_DEPTH: usize = 16;

/// The operator's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    /// Interprets a line typed by the operator: `y` or `yes` (any case)
    /// approves, everything else rejects.
    pub fn from_answer(answer: &str) -> Self {
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Decision::Approve,
            _ => Decision::Reject,
        }
    }
}

/// What the operator is asked about.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalRequest {
    pub session: SessionId,
    pub peer: Peer,
    pub viewport: Viewport,
}

/// A queued request plus the channel its decision goes back on.
#[derive(Debug)]
pub struct PendingApproval {
    pub request: ApprovalRequest,
    respond: oneshot::Sender<Decision>,
}

impl PendingApproval {
    /// `true` once the requester stopped waiting (its peer disconnected).
    pub fn is_abandoned(&self) -> bool {
        self.respond.is_closed()
    }

    /// Delivers the decision.  Returns `false` if nobody is waiting anymore.
    pub fn respond(self, decision: Decision) -> bool {
        self.respond.send(decision).is_ok()
    }
}

/// Front door for approval requests; cheap to clone into every transport.
#[derive(Debug, Clone)]
pub struct ApprovalBroker {
    auto_approve: bool,
    tx: mpsc::Sender<PendingApproval>,
}

impl ApprovalBroker {
    /// Creates the broker and the receiver the [`approval_worker`] consumes.
    pub fn new(auto_approve: bool) -> (Self, mpsc::Receiver<PendingApproval>) {
        let (tx, rx) = mpsc::channel(APPROVAL_QUEUE_DEPTH);
        (Self { auto_approve, tx }, rx)
    }

    /// Asks for a decision and waits for it.
    pub async fn request(&self, request: ApprovalRequest) -> Decision {
        if self.auto_approve {
            debug!(peer = %request.peer, "auto-approving");
            return Decision::Approve;
        }

        let (respond, rx) = oneshot::channel();
        if let Err(err) = self.tx.send(PendingApproval { request, respond }).await {
            warn!("failed to enqueue approval request: {err}");
            return Decision::Reject;
        }
        rx.await.unwrap_or(Decision::Reject)
    }
}

/// Something that can ask a human about one request.
#[async_trait]
pub trait ApprovalPrompt: Send {
    async fn ask(&mut self, request: &ApprovalRequest) -> Decision;
}

/// Serves queued requests one at a time until every broker is dropped.
///
/// Requests whose requester already gave up are skipped without prompting.
pub async fn approval_worker<P: ApprovalPrompt>(
    mut rx: mpsc::Receiver<PendingApproval>,
    mut prompt: P,
) {
    while let Some(pending) = rx.recv().await {
        if pending.is_abandoned() {
            debug!(peer = %pending.request.peer, "skipping abandoned approval request");
            continue;
        }
        let decision = prompt.ask(&pending.request).await;
        let peer = pending.request.peer;
        if !pending.respond(decision) {
            warn!(%peer, "approval requester left before the decision");
        }
    }
}
