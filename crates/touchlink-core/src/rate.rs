//! Events-per-second counter over a one-second window.
//!
//! Used for move-rate telemetry on both ends.  The rate is informational
//! only; nothing is throttled based on it.

/// Length of one measurement window in milliseconds.
const WINDOW_MS: u64 = 1000;

/// Counts events and reports the rate of the last completed window.
#[derive(Debug, Clone, Default)]
pub struct RateMeter {
    window_start: Option<u64>,
    in_window: u32,
    last_rate: u32,
    total: u64,
}

impl RateMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one event at `now`.  Returns the rate of the window that just
    /// closed, if this event closed one.
    pub fn record(&mut self, now: u64) -> Option<u32> {
        self.total += 1;
        let closed = self.roll(now);
        self.in_window += 1;
        closed
    }

    /// Events in the last completed window, as of `now`.  A window with no
    /// events at all reads as zero.
    pub fn rate(&mut self, now: u64) -> u32 {
        self.roll(now);
        self.last_rate
    }

    /// Total events ever recorded.
    pub fn total(&self) -> u64 {
        self.total
    }

    fn roll(&mut self, now: u64) -> Option<u32> {
        let start = *self.window_start.get_or_insert(now);
        let elapsed = now.saturating_sub(start);
        if elapsed < WINDOW_MS {
            return None;
        }
        // More than one whole window passed without events: the last full
        // window was empty.
        self.last_rate = if elapsed >= 2 * WINDOW_MS {
            0
        } else {
            self.in_window
        };
        self.in_window = 0;
        self.window_start = Some(now - elapsed % WINDOW_MS);
        Some(self.last_rate)
    }
}
