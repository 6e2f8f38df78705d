//! Inactivity eviction timer.
//!
//! A connected device that stops sending (phone locked, Wi-Fi dropped) never
//! says goodbye over UDP.  The sweeper frees the slot once the device has
//! been silent for longer than the session timeout so another device can
//! connect.  Nothing is sent to the evicted peer.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::application::session_service::SessionService;

/// Calls [`SessionService::sweep`] every `every` until `running` is cleared.
pub async fn run_sweeper(service: Arc<SessionService>, every: Duration, running: Arc<AtomicBool>) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while running.load(Ordering::Relaxed) {
        ticker.tick().await;
        service.sweep();
    }
    info!("eviction sweeper stopped");
}
