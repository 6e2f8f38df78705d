//! Latest-wins send coalescing.
//!
//! A finger can produce several hundred samples per second, far more than is
//! worth sending.  [`SendPacer`] keeps only the newest value and lets the
//! session send at most one per render tick:
//!
//! ```text
//!   offer(a) → true   (schedule a flush)
//!   offer(b) → false  (flush already pending; `a` is overwritten)
//!   flush()  → Some(b)
//!   flush()  → None   (nothing new since the last flush)
//! ```
//!
//! There is no queue, so a slow network never builds up a backlog of stale
//! positions.

/// Holds at most one pending value.
#[derive(Debug, Clone)]
pub struct SendPacer<T> {
    latest: Option<T>,
}

impl<T> Default for SendPacer<T> {
    fn default() -> Self {
        Self { latest: None }
    }
}

impl<T> SendPacer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` as the newest.  Returns `true` if the caller must
    /// schedule a flush, `false` if one is already pending.
    pub fn offer(&mut self, value: T) -> bool {
        self.latest.replace(value).is_none()
    }

    /// Takes the newest value, clearing the pending flag.
    pub fn flush(&mut self) -> Option<T> {
        self.latest.take()
    }

    pub fn is_pending(&self) -> bool {
        self.latest.is_some()
    }

    /// Drops any pending value without sending it.
    pub fn clear(&mut self) {
        self.latest = None;
    }
}
