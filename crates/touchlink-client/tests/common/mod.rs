//! Shared harness for the client integration tests.
//!
//! Two kinds of counterpart:
//! - [`FakeHost`]: a bare UDP socket the test drives packet by packet.
//! - [`RealHost`]: the actual touchlink-server listeners on loopback ports.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep, timeout, Instant};
use touchlink_client::application::ClientHandle;
use touchlink_client::domain::{ClientConfig, ClientEvent};
use touchlink_client::infrastructure::connector;
use touchlink_core::{
    decode_packet, encode_packet, MonotonicClock, Packet, ScreenSize, SessionState, TransportKind,
};
use touchlink_server::application::{
    approval_worker, ApprovalBroker, ApprovalPrompt, ApprovalRequest, Decision, PointerDispatcher,
    PointerSink, SessionService,
};
use touchlink_server::infrastructure::{run_sweeper, RecordingPointerSink, UdpServer, WsServer};

pub const HOST: ScreenSize = ScreenSize {
    width: 1920,
    height: 1080,
};

/// How long a test waits for something that should happen.
pub const WAIT: Duration = Duration::from_secs(3);

/// Short timers so sessions settle within a test's patience.
pub fn fast_config(server_addr: SocketAddr, transport: TransportKind) -> ClientConfig {
    ClientConfig {
        server_addr,
        transport,
        hello_interval_ms: 50,
        keepalive_interval_ms: 100,
        pong_timeout_ms: 400,
        frame_rate: 100,
        ..ClientConfig::default()
    }
}

pub fn start_client(config: ClientConfig) -> (ClientHandle, UnboundedReceiver<ClientEvent>) {
    ClientHandle::spawn(
        config.clone(),
        Arc::new(MonotonicClock::new()),
        connector(config),
    )
    .unwrap()
}

/// Waits for `StateChanged(target)`.  Returns `false` on timeout or if the
/// channel closes first.
pub async fn wait_for_state(events: &mut UnboundedReceiver<ClientEvent>, target: SessionState) -> bool {
    let deadline = Instant::now() + WAIT;
    loop {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Some(ClientEvent::StateChanged(state))) if state == target => return true,
            Ok(Some(_)) => continue,
            _ => return false,
        }
    }
}

/// Waits for the first event matching `pick`.
pub async fn wait_for_event<T>(
    events: &mut UnboundedReceiver<ClientEvent>,
    mut pick: impl FnMut(&ClientEvent) -> Option<T>,
) -> Option<T> {
    let deadline = Instant::now() + WAIT;
    loop {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Some(event)) => {
                if let Some(found) = pick(&event) {
                    return Some(found);
                }
            }
            _ => return None,
        }
    }
}

// ── Fake host ─────────────────────────────────────────────────────────────────

/// A UDP socket standing in for the host.
pub struct FakeHost {
    socket: UdpSocket,
}

impl FakeHost {
    pub async fn bind() -> Self {
        Self {
            socket: UdpSocket::bind("127.0.0.1:0").await.unwrap(),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.socket.local_addr().unwrap()
    }

    /// The next well-formed packet and its sender, or `None` on timeout.
    pub async fn recv(&self) -> Option<(Packet, SocketAddr)> {
        self.recv_within(WAIT).await
    }

    pub async fn recv_within(&self, wait: Duration) -> Option<(Packet, SocketAddr)> {
        let mut buf = [0u8; 64];
        let deadline = Instant::now() + wait;
        loop {
            let (len, from) = tokio::time::timeout_at(deadline, self.socket.recv_from(&mut buf))
                .await
                .ok()?
                .ok()?;
            if let Ok(packet) = decode_packet(&buf[..len]) {
                return Some((packet, from));
            }
        }
    }

    /// The next packet matching `pick`, skipping the rest.
    pub async fn recv_matching<T>(&self, mut pick: impl FnMut(Packet) -> Option<T>) -> Option<(T, SocketAddr)> {
        loop {
            let (packet, from) = self.recv().await?;
            if let Some(found) = pick(packet) {
                return Some((found, from));
            }
        }
    }

    pub async fn send(&self, packet: &Packet, to: SocketAddr) {
        self.send_raw(&encode_packet(packet), to).await;
    }

    pub async fn send_raw(&self, bytes: &[u8], to: SocketAddr) {
        self.socket.send_to(bytes, to).await.unwrap();
    }
}

// ── Real host ─────────────────────────────────────────────────────────────────

/// Answers approval requests from a script; rejects once it runs out.
struct ScriptedPrompt {
    answers: VecDeque<Decision>,
}

#[async_trait]
impl ApprovalPrompt for ScriptedPrompt {
    async fn ask(&mut self, _request: &ApprovalRequest) -> Decision {
        self.answers.pop_front().unwrap_or(Decision::Reject)
    }
}

/// The touchlink host service on ephemeral loopback ports.
pub struct RealHost {
    pub udp_addr: SocketAddr,
    pub ws_addr: SocketAddr,
    pub sink: Arc<RecordingPointerSink>,
    pub service: Arc<SessionService>,
    running: Arc<AtomicBool>,
}

impl Drop for RealHost {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

impl RealHost {
    /// `answers` of `None` auto-approves every device.
    pub async fn start(answers: Option<Vec<Decision>>) -> Self {
        let sink = Arc::new(RecordingPointerSink::new(HOST));
        let pointer = PointerDispatcher::spawn(Arc::clone(&sink) as Arc<dyn PointerSink>).unwrap();

        let (broker, approvals) = ApprovalBroker::new(answers.is_none());
        tokio::spawn(approval_worker(
            approvals,
            ScriptedPrompt {
                answers: answers.unwrap_or_default().into(),
            },
        ));

        let service = Arc::new(SessionService::new(
            broker,
            pointer,
            Arc::new(MonotonicClock::new()),
            Duration::from_secs(5),
        ));

        let loopback: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let udp = UdpServer::bind(loopback).await.unwrap();
        let ws = WsServer::bind(loopback).await.unwrap();
        let udp_addr = udp.local_addr();
        let ws_addr = ws.local_addr();

        let running = Arc::new(AtomicBool::new(true));
        tokio::spawn(udp.run(Arc::clone(&service), Arc::clone(&running)));
        tokio::spawn(ws.run(Arc::clone(&service), Arc::clone(&running)));
        tokio::spawn(run_sweeper(
            Arc::clone(&service),
            Duration::from_millis(50),
            Arc::clone(&running),
        ));

        Self {
            udp_addr,
            ws_addr,
            sink,
            service,
            running,
        }
    }

    pub fn addr_for(&self, transport: TransportKind) -> SocketAddr {
        match transport {
            TransportKind::Datagram => self.udp_addr,
            TransportKind::Message => self.ws_addr,
        }
    }

    /// Polls the recording sink until `expected` is the latest move.
    pub async fn wait_for_move(&self, expected: (u16, u16)) -> bool {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if self.sink.last_move() == Some(expected) {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }
        false
    }

    /// Polls until the host holds no session.
    pub async fn wait_until_idle(&self) -> bool {
        timeout(WAIT, async {
            while self.service.current().is_some() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .is_ok()
    }
}
