//! Application layer for touchlink-server.
//!
//! The application layer knows *what* happens to a session; the
//! infrastructure layer decides *how* bytes reach it.
//!
//! # Responsibilities
//!
//! - Owning the single session slot ([`registry`])
//! - Routing admission requests to the operator ([`approval`])
//! - Moving the host pointer without stalling the receive loops ([`pointer`])
//! - Combining the three into one transport-neutral use case
//!   ([`session_service`])
//!
//! # What does NOT belong here?
//!
//! - Opening sockets or parsing wire formats (that is infrastructure)
//! - Reading stdin (the prompt implementation is infrastructure)

pub mod approval;
pub mod pointer;
pub mod registry;
pub mod session_service;

pub use approval::{
    approval_worker, ApprovalBroker, ApprovalPrompt, ApprovalRequest, Decision, PendingApproval,
};
pub use pointer::{scale_to_host, PointerDispatcher, PointerError, PointerSink};
pub use registry::{Admission, RegistryError, Resolved, SessionRegistry};
pub use session_service::{HelloOutcome, SessionService, Verdict};
