//! Shared harness for the server integration tests.
//!
//! Starts both listeners on ephemeral loopback ports with a
//! [`RecordingPointerSink`] so tests can observe pointer moves, and either
//! auto-approves or answers approval requests from a fixed script.

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
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};
use touchlink_core::{decode_packet, encode_packet, MonotonicClock, Packet, ScreenSize};
use touchlink_server::application::{
    approval_worker, ApprovalBroker, ApprovalPrompt, ApprovalRequest, Decision, PointerDispatcher,
    PointerSink, SessionService,
};
use touchlink_server::infrastructure::{run_sweeper, RecordingPointerSink, UdpServer, WsServer};

pub const HOST: ScreenSize = ScreenSize {
    width: 1920,
    height: 1080,
};

/// How long a test waits for a reply that should arrive.
pub const REPLY_WAIT: Duration = Duration::from_secs(2);

/// Answers approval requests from a script; rejects once it runs out.
pub struct ScriptedPrompt {
    answers: VecDeque<Decision>,
}

#[async_trait]
impl ApprovalPrompt for ScriptedPrompt {
    async fn ask(&mut self, _request: &ApprovalRequest) -> Decision {
        self.answers.pop_front().unwrap_or(Decision::Reject)
    }
}

/// Holds each answer until the test releases it.
pub struct HeldPrompt {
    released: mpsc::UnboundedReceiver<Decision>,
}

#[async_trait]
impl ApprovalPrompt for HeldPrompt {
    async fn ask(&mut self, _request: &ApprovalRequest) -> Decision {
        self.released.recv().await.unwrap_or(Decision::Reject)
    }
}

/// How the harness answers approval requests.
pub enum Approval {
    Auto,
    Scripted(Vec<Decision>),
    /// Each request waits for a decision sent on the paired sender.
    Held(mpsc::UnboundedReceiver<Decision>),
}

impl Approval {
    /// A held approval and the sender that releases its decisions.
    pub fn held() -> (Self, mpsc::UnboundedSender<Decision>) {
        let (release, released) = mpsc::unbounded_channel();
        (Approval::Held(released), release)
    }
}

/// A running server.  Dropping it clears the shutdown flag.
pub struct TestServer {
    pub udp_addr: SocketAddr,
    pub ws_addr: SocketAddr,
    pub sink: Arc<RecordingPointerSink>,
    pub service: Arc<SessionService>,
    running: Arc<AtomicBool>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

impl TestServer {
    pub async fn start(approval: Approval, session_timeout: Duration) -> Self {
        let sink = Arc::new(RecordingPointerSink::new(HOST));
        let pointer_sink: Arc<dyn PointerSink> = Arc::clone(&sink) as Arc<dyn PointerSink>;
        let pointer = PointerDispatcher::spawn(pointer_sink).unwrap();

        let (broker, approvals) = ApprovalBroker::new(matches!(approval, Approval::Auto));
        match approval {
            Approval::Auto => {
                tokio::spawn(approval_worker(
                    approvals,
                    ScriptedPrompt {
                        answers: VecDeque::new(),
                    },
                ));
            }
            Approval::Scripted(answers) => {
                tokio::spawn(approval_worker(
                    approvals,
                    ScriptedPrompt {
                        answers: answers.into(),
                    },
                ));
            }
            Approval::Held(released) => {
                tokio::spawn(approval_worker(approvals, HeldPrompt { released }));
            }
        }

        let service = Arc::new(SessionService::new(
            broker,
            pointer,
            Arc::new(MonotonicClock::new()),
            session_timeout,
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

    /// Polls the recording sink until `expected` is the latest move.
    pub async fn wait_for_move(&self, expected: (u16, u16)) -> bool {
        let deadline = Instant::now() + REPLY_WAIT;
        while Instant::now() < deadline {
            if self.sink.last_move() == Some(expected) {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }
        false
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.ws_addr)
    }
}

// ── UDP device helpers ────────────────────────────────────────────────────────

/// A fake handheld device speaking the datagram protocol.
pub struct UdpDevice {
    socket: UdpSocket,
    server: SocketAddr,
}

impl UdpDevice {
    pub async fn new(server: SocketAddr) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        Self { socket, server }
    }

    pub async fn send(&self, packet: &Packet) {
        self.send_raw(&encode_packet(packet)).await;
    }

    pub async fn send_raw(&self, bytes: &[u8]) {
        self.socket.send_to(bytes, self.server).await.unwrap();
    }

    /// The next packet from the server, or `None` if nothing arrives in time.
    pub async fn recv_within(&self, wait: Duration) -> Option<Packet> {
        let mut buf = [0u8; 64];
        let (len, _) = timeout(wait, self.socket.recv_from(&mut buf)).await.ok()?.ok()?;
        decode_packet(&buf[..len]).ok()
    }

    pub async fn recv(&self) -> Option<Packet> {
        self.recv_within(REPLY_WAIT).await
    }

    /// Sends HELLO and returns the first reply.
    pub async fn hello(&self, width: u16, height: u16) -> Option<Packet> {
        self.send(&Packet::Hello { width, height }).await;
        self.recv().await
    }
}
