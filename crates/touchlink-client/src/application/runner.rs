//! The per-session task.
//!
//! Everything that happens on the wire for one session happens inside a
//! single `select!` loop: inbound messages, HELLO retransmission, keepalive
//! PINGs, pacer flushes and the disconnect request.  Because there is only
//! one task, none of that needs locking; the only state shared with other
//! threads is [`TouchInput`] (controller + pacer), behind a short
//! `std::sync::Mutex` that is never held across an `.await`.
//!
//! ```text
//!   UI thread                       session task
//!   ─────────                       ────────────
//!   submit(sample) ─► TouchInput ◄── frame tick: flush → MOVE
//!                        (Mutex)
//!   disconnect() ───────oneshot────► TearDownTransport, exit
//!   ClientEvent ◄───────mpsc──────── state changes, RTT, host size
//! ```

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use touchlink_core::{
    ClientMessage, Clock, RateMeter, RttMonitor, SendPacer, ServerMessage, SessionEvent,
    SessionMachine, SessionState,
};
use touchlink_core::session::SessionAction;

use crate::application::touch_input::TouchController;
use crate::application::transport::Transport;
use crate::domain::{ClientConfig, ClientError, ClientEvent};

/// Reason reported when the server stops answering PINGs.
pub const HEARTBEAT_TIMEOUT: &str = "heartbeat timeout";

/// Touch state shared between the UI thread and the session task.
#[derive(Debug)]
pub struct TouchInput {
    pub controller: TouchController,
    pub pacer: SendPacer<(u16, u16)>,
}

impl TouchInput {
    pub fn new(controller: TouchController) -> Self {
        Self {
            controller,
            pacer: SendPacer::new(),
        }
    }
}

pub(crate) type SharedInput = Arc<Mutex<TouchInput>>;

pub(crate) fn lock_input(input: &Mutex<TouchInput>) -> MutexGuard<'_, TouchInput> {
    input.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything the session task needs besides the transport.
pub(crate) struct SessionParts {
    pub config: ClientConfig,
    pub input: SharedInput,
    pub clock: Arc<dyn Clock>,
    pub events: mpsc::UnboundedSender<ClientEvent>,
}

/// Opens the transport and runs the session until it ends.  Returns the
/// final state.
pub(crate) async fn run_session<F>(
    connect: F,
    parts: SessionParts,
    mut stop: oneshot::Receiver<()>,
) -> SessionState
where
    F: Future<Output = Result<Box<dyn Transport>, ClientError>>,
{
    let mut machine = SessionMachine::new();
    transition(&mut machine, SessionEvent::ConnectRequested, &parts.events);

    let transport = tokio::select! {
        result = connect => match result {
            Ok(transport) => transport,
            Err(e) => {
                warn!("transport setup failed: {e}");
                transition(&mut machine, SessionEvent::TransportFailed(e.to_string()), &parts.events);
                return machine.state().clone();
            }
        },
        _ = &mut stop => {
            transition(&mut machine, SessionEvent::Disconnect, &parts.events);
            return machine.state().clone();
        }
    };

    SessionRunner {
        transport,
        machine,
        rtt: RttMonitor::new(),
        send_rate: RateMeter::new(),
        hello_timer: None,
        keepalive_timer: None,
        parts,
    }
    .run(stop)
    .await
}

struct SessionRunner {
    transport: Box<dyn Transport>,
    machine: SessionMachine,
    rtt: RttMonitor,
    send_rate: RateMeter,
    hello_timer: Option<Interval>,
    keepalive_timer: Option<Interval>,
    parts: SessionParts,
}

impl SessionRunner {
    async fn run(mut self, mut stop: oneshot::Receiver<()>) -> SessionState {
        let actions = self.transition(SessionEvent::TransportReady);
        self.perform(actions).await;

        let mut frames = interval(self.parts.config.frame_interval());
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while self.machine.state().is_active() {
            tokio::select! {
                _ = &mut stop => {
                    let actions = self.transition(SessionEvent::Disconnect);
                    self.perform(actions).await;
                }
                inbound = self.transport.recv() => match inbound {
                    Ok(Some(message)) => self.on_server_message(message).await,
                    Ok(None) => {}
                    Err(e) => self.fail(e.to_string()).await,
                },
                _ = next_tick(&mut self.hello_timer) => {
                    let hello = ClientMessage::Hello(self.parts.config.viewport);
                    self.send(hello).await;
                }
                _ = next_tick(&mut self.keepalive_timer) => self.on_keepalive_tick().await,
                _ = frames.tick() => self.flush_move().await,
            }
        }

        self.machine.state().clone()
    }

    async fn on_server_message(&mut self, message: ServerMessage) {
        let now = self.parts.clock.now_ms();
        let event = match message {
            ServerMessage::Accepted(size) => {
                self.rtt.mark_alive(now);
                SessionEvent::Accepted(size)
            }
            ServerMessage::Rejected => SessionEvent::Rejected,
            ServerMessage::Busy => SessionEvent::Busy,
            ServerMessage::Pong(t) => {
                match self.rtt.on_pong(t, now) {
                    Some(rtt_ms) => self.emit(ClientEvent::RoundTrip {
                        rtt_ms,
                        ping_interval_ms: self.rtt.ping_interval(),
                        pong_interval_ms: self.rtt.pong_interval(),
                    }),
                    None => debug!(t, "pong for unknown ping ignored"),
                }
                return;
            }
            ServerMessage::Ping(t) => {
                self.send(ClientMessage::Pong(t)).await;
                return;
            }
            ServerMessage::RemoteScreen(size) => {
                if let Some(action) = self.machine.set_host_screen(size) {
                    self.perform(vec![action]).await;
                }
                return;
            }
        };

        let actions = self.transition(event);
        self.perform(actions).await;
    }

    async fn on_keepalive_tick(&mut self) {
        let now = self.parts.clock.now_ms();
        if self.rtt.is_silent(now, self.parts.config.pong_timeout_ms) {
            warn!("no reply from server for {} ms", self.parts.config.pong_timeout_ms);
            self.fail(HEARTBEAT_TIMEOUT.to_owned()).await;
            return;
        }
        let t = self.rtt.on_ping_sent(now);
        self.send(ClientMessage::Ping(t)).await;
    }

    async fn flush_move(&mut self) {
        let pending = lock_input(&self.parts.input).pacer.flush();
        let Some((x, y)) = pending else {
            return;
        };
        // Motion made before the accept is dropped, never queued.
        if !self.machine.can_send_moves() {
            return;
        }
        self.send(ClientMessage::Move { x, y }).await;
        if let Some(rate) = self.send_rate.record(self.parts.clock.now_ms()) {
            self.emit(ClientEvent::SendRate(rate));
        }
    }

    async fn send(&mut self, message: ClientMessage) {
        if let Err(e) = self.transport.send(message).await {
            warn!("send failed: {e}");
            self.fail(e.to_string()).await;
        }
    }

    async fn fail(&mut self, reason: String) {
        let actions = self.transition(SessionEvent::TransportFailed(reason));
        self.perform(actions).await;
    }

    fn transition(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        transition(&mut self.machine, event, &self.parts.events)
    }

    async fn perform(&mut self, actions: Vec<SessionAction>) {
        for action in actions {
            match action {
                SessionAction::StartHelloResend => {
                    // First tick fires immediately: the first HELLO goes out now.
                    self.hello_timer = Some(interval(self.parts.config.hello_interval()));
                }
                SessionAction::StopHelloResend => self.hello_timer = None,
                SessionAction::StartKeepalive => {
                    let period = self.parts.config.keepalive_interval();
                    let mut timer = interval_at(Instant::now() + period, period);
                    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    self.keepalive_timer = Some(timer);
                    self.rtt.reset();
                    self.rtt.mark_alive(self.parts.clock.now_ms());
                }
                SessionAction::StopKeepalive => self.keepalive_timer = None,
                SessionAction::TearDownTransport => {
                    lock_input(&self.parts.input).pacer.clear();
                    self.transport.close().await;
                }
                SessionAction::ApplyHostScreen(size) => {
                    lock_input(&self.parts.input).controller.set_host_screen(size);
                    info!(width = size.width, height = size.height, "host screen size");
                    self.emit(ClientEvent::HostScreen(size));
                }
            }
        }
    }

    fn emit(&self, event: ClientEvent) {
        // Nobody listening is fine; the session keeps running.
        let _ = self.parts.events.send(event);
    }
}

/// Applies `event`, reporting a state change.  Invalid events are logged and
/// produce no actions.
fn transition(
    machine: &mut SessionMachine,
    event: SessionEvent,
    events: &mpsc::UnboundedSender<ClientEvent>,
) -> Vec<SessionAction> {
    let before = machine.state().clone();
    match machine.handle(event) {
        Ok(actions) => {
            if *machine.state() != before {
                info!(state = %machine.state(), "session state changed");
                let _ = events.send(ClientEvent::StateChanged(machine.state().clone()));
            }
            actions
        }
        Err(e) => {
            debug!("ignored: {e}");
            Vec::new()
        }
    }
}

/// Waits for the next tick of an optional timer; never resolves when the
/// timer is off.
async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
