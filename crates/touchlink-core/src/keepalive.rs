//! Keepalive bookkeeping and round-trip-time measurement.
//!
//! While connected the client sends a PING every second carrying its own
//! monotonic timestamp; the server echoes it in a PONG.  The difference
//! between "now" and the echoed timestamp is the round-trip time.  Because the
//! timestamp travels inside the packet, no per-ping state is strictly needed,
//! but the monitor remembers a few outstanding stamps so that stale or forged
//! PONGs do not produce nonsense RTT values.
//!
//! The monitor also records how regularly PINGs leave and PONGs arrive, which
//! is useful telemetry on a congested Wi-Fi link, and answers the question
//! "has the server gone silent?" for the client's heartbeat timeout.

use std::collections::VecDeque;

/// How many unanswered PING timestamps are remembered.
const MAX_OUTSTANDING: usize = 8;

/// Round-trip-time and keepalive interval tracker.
#[derive(Debug, Clone, Default)]
pub struct RttMonitor {
    outstanding: VecDeque<u64>,
    last_ping_sent: Option<u64>,
    last_pong_received: Option<u64>,
    ping_interval: Option<u64>,
    pong_interval: Option<u64>,
    last_rtt: Option<u64>,
}

impl RttMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a PING leaving at `now`; returns the timestamp to put in it.
    pub fn on_ping_sent(&mut self, now: u64) -> u64 {
        if let Some(prev) = self.last_ping_sent {
            self.ping_interval = Some(now.saturating_sub(prev));
        }
        self.last_ping_sent = Some(now);
        if self.outstanding.len() == MAX_OUTSTANDING {
            self.outstanding.pop_front();
        }
        self.outstanding.push_back(now);
        now
    }

    /// Records a PONG echoing `echoed`, received at `now`.
    ///
    /// Returns the RTT in milliseconds, or `None` if `echoed` does not match
    /// an outstanding PING.  Any older outstanding stamps are dropped as
    /// lost.
    pub fn on_pong(&mut self, echoed: u64, now: u64) -> Option<u64> {
        let pos = self.outstanding.iter().position(|&t| t == echoed)?;
        self.outstanding.drain(..=pos);

        if let Some(prev) = self.last_pong_received {
            self.pong_interval = Some(now.saturating_sub(prev));
        }
        self.last_pong_received = Some(now);

        let rtt = now.saturating_sub(echoed);
        self.last_rtt = Some(rtt);
        Some(rtt)
    }

    /// Marks the server as heard from without an RTT sample (e.g. ACCEPT).
    pub fn mark_alive(&mut self, now: u64) {
        self.last_pong_received = Some(now);
    }

    /// `true` when nothing has been heard for longer than `timeout_ms`.
    /// A monitor that never heard anything is not silent.
    pub fn is_silent(&self, now: u64, timeout_ms: u64) -> bool {
        self.last_pong_received
            .map(|t| now.saturating_sub(t) > timeout_ms)
            .unwrap_or(false)
    }

    pub fn last_rtt(&self) -> Option<u64> {
        self.last_rtt
    }

    pub fn ping_interval(&self) -> Option<u64> {
        self.ping_interval
    }

    pub fn pong_interval(&self) -> Option<u64> {
        self.pong_interval
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    /// Forgets everything; used when a session ends.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
