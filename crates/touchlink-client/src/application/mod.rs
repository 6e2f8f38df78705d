//! Application layer for touchlink-client.
//!
//! - [`touch_input`] maps touch samples to viewport positions.
//! - [`transport`] is the seam between the session and the wire.
//! - [`runner`] is the per-session task: state machine, timers, pacing.
//! - [`handle`] is what the UI holds while a session runs.

pub mod handle;
pub mod runner;
pub mod touch_input;
pub mod transport;

pub use handle::ClientHandle;
pub use runner::{TouchInput, HEARTBEAT_TIMEOUT};
pub use touch_input::TouchController;
pub use transport::Transport;
