//! Host pointer dispatch.
//!
//! MOVE coordinates arrive in the *device's* viewport space.  The
//! [`PointerDispatcher`] scales them to the host screen and hands them to a
//! [`PointerSink`] (the OS call, or a test double).
//!
//! # Latest wins
//!
//! OS pointer calls can stall for a few milliseconds.  If every MOVE were
//! queued, a stall would build a backlog and the pointer would "replay" old
//! motion afterwards.  The dispatcher therefore keeps only the newest
//! command in a `Mutex<Option<_>>`; a dedicated worker thread waits on a
//! `Condvar`, takes whatever is newest, and performs the move.  The receive
//! loops only ever overwrite the slot and notify, which never blocks for
//! long.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use touchlink_core::{ScreenSize, Viewport};
use tracing::{debug, warn};

/// Errors reported by pointer backends.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PointerError {
    /// The platform call failed.
    #[error("pointer backend failed: {0}")]
    Backend(String),
}

/// The host-pointer collaborator.
///
/// Implementations move the real cursor (out of scope here), log, or record
/// calls for tests.
#[cfg_attr(test, mockall::automock)]
pub trait PointerSink: Send + Sync {
    /// The host screen size reported to devices in the accept.
    fn screen_size(&self) -> ScreenSize;

    /// Moves the pointer to `(x, y)` within `[0, width) × [0, height)`.
    fn move_to(&self, x: u16, y: u16) -> Result<(), PointerError>;
}

/// Scales a viewport-space point to host-screen space.
///
/// `ratio = x / clientW`, `hostX = trunc(ratio * hostW)`, clamped to the
/// last host pixel.
pub fn scale_to_host(x: u16, y: u16, viewport: Viewport, screen: ScreenSize) -> (u16, u16) {
    (
        scale_axis(x, viewport.width, screen.width),
        scale_axis(y, viewport.height, screen.height),
    )
}

fn scale_axis(value: u16, client: u16, host: u16) -> u16 {
    if client == 0 || host == 0 {
        return 0;
    }
    let ratio = f64::from(value) / f64::from(client);
    let scaled = (ratio * f64::from(host)).trunc();
    scaled.clamp(0.0, f64::from(host - 1)) as u16
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MoveCommand {
    viewport: Viewport,
    x: u16,
    y: u16,
}

#[derive(Debug, Default)]
struct Pending {
    latest: Option<MoveCommand>,
    stopping: bool,
}

#[derive(Debug, Default)]
struct Shared {
    pending: Mutex<Pending>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Latest-wins bridge between the async receive loops and a blocking
/// [`PointerSink`].
pub struct PointerDispatcher {
    shared: Arc<Shared>,
    screen: ScreenSize,
    worker: Option<JoinHandle<()>>,
}

impl PointerDispatcher {
    /// Spawns the worker thread.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the OS refuses to create a thread.
    pub fn spawn(sink: Arc<dyn PointerSink>) -> std::io::Result<Self> {
        let shared = Arc::new(Shared::default());
        let screen = sink.screen_size();
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("pointer-dispatch".into())
            .spawn(move || run_worker(&worker_shared, sink.as_ref()))?;
        Ok(Self {
            shared,
            screen,
            worker: Some(worker),
        })
    }

    /// Host screen size, fixed for the dispatcher's lifetime.
    pub fn screen_size(&self) -> ScreenSize {
        self.screen
    }

    /// Replaces any not-yet-performed move with this one.
    pub fn submit(&self, viewport: Viewport, x: u16, y: u16) {
        self.shared.lock().latest = Some(MoveCommand { viewport, x, y });
        self.shared.wake.notify_one();
    }

    /// Stops the worker after it finishes the move in progress.  A pending
    /// move that has not started is dropped.
    pub fn shutdown(&mut self) {
        self.shared.lock().stopping = true;
        self.shared.wake.notify_one();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("pointer worker panicked");
            }
        }
    }
}

impl Drop for PointerDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(shared: &Shared, sink: &dyn PointerSink) {
    let screen = sink.screen_size();
    loop {
        let cmd = {
            let mut pending = shared.lock();
            loop {
                if pending.stopping {
                    return;
                }
                if let Some(cmd) = pending.latest.take() {
                    break cmd;
                }
                pending = shared
                    .wake
                    .wait(pending)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        let (x, y) = scale_to_host(cmd.x, cmd.y, cmd.viewport, screen);
        if let Err(e) = sink.move_to(x, y) {
            debug!("pointer move to ({x}, {y}) failed: {e}");
        }
    }
}
