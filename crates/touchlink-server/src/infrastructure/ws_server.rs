//! WebSocket server: accept loop and per-connection session handling.
//!
//! The reliable transport carries the same session protocol as UDP, in a
//! browser-friendly shape:
//!
//! ```text
//! client                                server
//! ──────                                ──────
//! {"type":"init","width":W,"height":H}
//!                                       (operator decides)
//!                                       "connected"
//!                                       {"type":"remote_screen",...}
//! [x:u16be][y:u16be]   (binary move)
//! {"type":"ping","t":T}
//!                                       {"type":"pong","t":T}
//! ```
//!
//! A second device gets `"Already connected"` and the socket is closed; a
//! declined device gets `"rejected"`.
//!
//! # Lifecycle
//!
//! 1. The accept loop hands each TCP connection to its own Tokio task.
//! 2. The task completes the WebSocket handshake and waits for `init`.
//!    Moves and pings before `init` are ignored.
//! 3. While the operator decides, the task keeps reading so that a device
//!    closing the page frees the slot immediately.
//! 4. Once connected, the task serves frames and, once per second, checks
//!    that it still holds the slot (the sweeper may have evicted it) and
//!    that the server is not shutting down.  An evicted device is sent
//!    nothing: the TCP connection is simply dropped.
//! 5. However the task ends, the slot is released if this peer holds it.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
    WebSocketStream,
};
use tracing::{debug, error, info, warn};
use touchlink_core::{decode_move_frame, ControlMessage, ScreenSize, StatusReply, Viewport};

use crate::application::session_service::{HelloOutcome, SessionService, Verdict};
use crate::domain::session::Peer;
use crate::infrastructure::ServerError;

/// How often the accept loop wakes up to check the shutdown flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// How often a connected session checks eviction and shutdown.
const SLOT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

type WsSink = SplitSink<WebSocketStream<TcpStream>, WsMessage>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

// ── Public API ────────────────────────────────────────────────────────────────

/// A bound TCP listener that upgrades connections to WebSocket sessions.
pub struct WsServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl WsServer {
    /// Binds the listener.  The request path is not checked, so
    /// `ws://host:port/ws` and `ws://host:port/` both work.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the port is in use or the process
    /// lacks permission to bind.
    pub async fn bind(addr: SocketAddr) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;
        info!("WebSocket touch server listening on {local_addr}");
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts connections until `running` is cleared.
    pub async fn run(self, service: Arc<SessionService>, running: Arc<AtomicBool>) {
        loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown flag set; stopping WebSocket accept loop");
                break;
            }

            // A short timeout lets the loop notice the shutdown flag even
            // when nobody connects.
            match timeout(ACCEPT_POLL, self.listener.accept()).await {
                Ok(Ok((stream, addr))) => {
                    debug!("new WebSocket connection from {addr}");
                    let service = Arc::clone(&service);
                    let running = Arc::clone(&running);
                    tokio::spawn(async move {
                        handle_connection(stream, addr, service, running).await;
                    });
                }
                Ok(Err(e)) => error!("accept error: {e}"),
                Err(_) => {}
            }
        }
    }
}

// ── Per-connection handler ────────────────────────────────────────────────────

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    service: Arc<SessionService>,
    running: Arc<AtomicBool>,
) {
    let peer = Peer::message(addr);
    match run_connection(stream, peer, &service, &running).await {
        Ok(()) => debug!(%peer, "connection closed"),
        Err(e) => warn!(%peer, "connection closed with error: {e:#}"),
    }
    if let Some(session) = service.on_disconnect(&peer) {
        info!(%peer, moves = session.total_moves, "device disconnected");
    }
}

async fn run_connection(
    stream: TcpStream,
    peer: Peer,
    service: &SessionService,
    running: &AtomicBool,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {}", peer.addr))?;
    let (mut tx, mut rx) = ws_stream.split();

    let Some(screen) = admit(&mut tx, &mut rx, peer, service).await? else {
        return Ok(());
    };

    send_text(&mut tx, StatusReply::Connected.as_str().to_owned()).await?;
    let remote = ControlMessage::RemoteScreen {
        width: screen.width,
        height: screen.height,
    };
    send_text(&mut tx, remote.to_json()?).await?;

    serve_connected(&mut tx, &mut rx, peer, service, running).await
}

/// Waits for `init` and the operator's decision.  Returns the host screen on
/// acceptance, `None` if the connection should end.
async fn admit(
    tx: &mut WsSink,
    rx: &mut WsSource,
    peer: Peer,
    service: &SessionService,
) -> anyhow::Result<Option<ScreenSize>> {
    loop {
        let viewport = match classify(peer, rx.next().await) {
            Inbound::Control(ControlMessage::Init { width, height }) => {
                match Viewport::new(width, height) {
                    Some(viewport) => viewport,
                    None => {
                        debug!(%peer, "init with empty viewport ignored");
                        continue;
                    }
                }
            }
            Inbound::Closed => return Ok(None),
            _ => {
                debug!(%peer, "frame before init ignored");
                continue;
            }
        };

        let request = match service.on_hello(peer, viewport) {
            HelloOutcome::Pending(request) => request,
            HelloOutcome::Accept(screen) => return Ok(Some(screen)),
            HelloOutcome::Ignored => continue,
            HelloOutcome::Busy => {
                send_text(tx, StatusReply::AlreadyConnected.as_str().to_owned()).await?;
                let _ = tx.close().await;
                return Ok(None);
            }
        };

        // Keep reading while the operator decides so a closed page frees the
        // slot.  Dropping `decide` abandons the request.
        let verdict = tokio::select! {
            verdict = service.decide(request) => verdict,
            () = wait_for_close(rx, peer) => return Ok(None),
        };

        return match verdict {
            Verdict::Accepted(screen) => Ok(Some(screen)),
            Verdict::Rejected => {
                send_text(tx, StatusReply::Rejected.as_str().to_owned()).await?;
                let _ = tx.close().await;
                Ok(None)
            }
            Verdict::Abandoned => Ok(None),
        };
    }
}

async fn serve_connected(
    tx: &mut WsSink,
    rx: &mut WsSource,
    peer: Peer,
    service: &SessionService,
    running: &AtomicBool,
) -> anyhow::Result<()> {
    let mut slot_check = interval(SLOT_CHECK_INTERVAL);
    slot_check.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            frame = rx.next() => match classify(peer, frame) {
                Inbound::Move { x, y } => {
                    service.on_move(&peer, x, y);
                }
                Inbound::Control(ControlMessage::Ping { t }) => {
                    if service.on_ping(&peer) {
                        send_text(tx, ControlMessage::Pong { t }.to_json()?).await?;
                    }
                }
                Inbound::Control(ControlMessage::Pong { .. }) => {
                    service.on_ping(&peer);
                }
                Inbound::Control(ControlMessage::Init { width, height }) => {
                    if let Some(viewport) = Viewport::new(width, height) {
                        service.on_hello(peer, viewport);
                    }
                }
                Inbound::Control(ControlMessage::RemoteScreen { .. }) | Inbound::Ignored => {}
                Inbound::Closed => return Ok(()),
            },
            _ = slot_check.tick() => {
                if !running.load(Ordering::Relaxed) {
                    info!(%peer, "server shutting down; closing session");
                    let _ = tx.close().await;
                    return Ok(());
                }
                if !service.is_connected(&peer) {
                    // Evicted: drop the socket without a close handshake.
                    info!(%peer, "session no longer holds the slot; dropping connection");
                    return Ok(());
                }
            }
        }
    }
}

// ── Frame helpers ─────────────────────────────────────────────────────────────

/// What one inbound frame means to the session.
enum Inbound {
    Control(ControlMessage),
    Move { x: u16, y: u16 },
    Closed,
    Ignored,
}

fn classify(peer: Peer, frame: Option<Result<WsMessage, WsError>>) -> Inbound {
    let message = match frame {
        Some(Ok(message)) => message,
        None | Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) => {
            return Inbound::Closed;
        }
        Some(Err(e)) => {
            warn!(%peer, "WebSocket error: {e}");
            return Inbound::Closed;
        }
    };

    match message {
        WsMessage::Text(text) => match ControlMessage::from_json(&text) {
            Ok(control) => Inbound::Control(control),
            Err(e) => {
                debug!(%peer, "dropping text frame: {e}");
                Inbound::Ignored
            }
        },
        WsMessage::Binary(bytes) => match decode_move_frame(&bytes) {
            Ok((x, y)) => Inbound::Move { x, y },
            Err(e) => {
                debug!(%peer, "dropping binary frame: {e}");
                Inbound::Ignored
            }
        },
        WsMessage::Close(_) => Inbound::Closed,
        // Protocol-level ping/pong is answered by tungstenite itself.
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => Inbound::Ignored,
    }
}

async fn wait_for_close(rx: &mut WsSource, peer: Peer) {
    loop {
        match classify(peer, rx.next().await) {
            Inbound::Closed => {
                debug!(%peer, "device left while awaiting approval");
                return;
            }
            _ => debug!(%peer, "frame while awaiting approval ignored"),
        }
    }
}

async fn send_text(tx: &mut WsSink, text: String) -> anyhow::Result<()> {
    tx.send(WsMessage::Text(text))
        .await
        .context("failed to send WebSocket text frame")
}
