//! Pointer backends that do not touch the real cursor.
//!
//! Moving the OS pointer is platform code that lives outside this crate.
//! Two stand-ins are provided:
//!
//! - [`LoggingPointerSink`]: the default backend of the binary.  It reports a
//!   configured screen size and logs every move at `debug` level, which is
//!   enough to run the host headless and watch the traffic with
//!   `RUST_LOG=touchlink_server=debug`.
//! - [`RecordingPointerSink`]: records every move in a `Mutex<Vec<_>>` so
//!   integration tests can assert exactly where the pointer went.

use std::sync::Mutex;

use touchlink_core::ScreenSize;
use tracing::debug;

use crate::application::pointer::{PointerError, PointerSink};

/// Logs moves instead of performing them.
#[derive(Debug, Clone, Copy)]
pub struct LoggingPointerSink {
    screen: ScreenSize,
}

impl LoggingPointerSink {
    pub fn new(screen: ScreenSize) -> Self {
        Self { screen }
    }
}

impl PointerSink for LoggingPointerSink {
    fn screen_size(&self) -> ScreenSize {
        self.screen
    }

    fn move_to(&self, x: u16, y: u16) -> Result<(), PointerError> {
        debug!(x, y, "pointer move");
        Ok(())
    }
}

/// Records every move for later inspection.
#[derive(Debug)]
pub struct RecordingPointerSink {
    screen: ScreenSize,
    /// Each `(x, y)` passed to `move_to`, in order.
    pub moves: Mutex<Vec<(u16, u16)>>,
}

impl RecordingPointerSink {
    pub fn new(screen: ScreenSize) -> Self {
        Self {
            screen,
            moves: Mutex::new(Vec::new()),
        }
    }

    /// The most recent move, if any.
    pub fn last_move(&self) -> Option<(u16, u16)> {
        self.moves
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .last()
            .copied()
    }
}

impl PointerSink for RecordingPointerSink {
    fn screen_size(&self) -> ScreenSize {
        self.screen
    }

    fn move_to(&self, x: u16, y: u16) -> Result<(), PointerError> {
        self.moves
            .lock()
            .map_err(|_| PointerError::Backend("recording lock poisoned".into()))?
            .push((x, y));
        Ok(())
    }
}
