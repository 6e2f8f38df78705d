//! ClientHandle: the UI-facing side of a running session.
//!
//! [`ClientHandle::spawn`] starts the session task and returns the handle
//! plus the receiver for [`ClientEvent`]s.  The handle is cheap to call from
//! a UI thread: `submit` only maps the sample and stores it in the pacer; the
//! session task decides when (and whether) it goes on the wire.
//!
//! Dropping the handle ends the session the same way `disconnect` does, but
//! without waiting for the transport to close.

use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use touchlink_core::{Clock, Extent, InputMode, SessionState, TouchSample};

use crate::application::runner::{lock_input, run_session, SessionParts, SharedInput, TouchInput};
use crate::application::touch_input::TouchController;
use crate::application::transport::Transport;
use crate::domain::{ClientConfig, ClientError, ClientEvent};

#[derive(Debug)]
pub struct ClientHandle {
    input: SharedInput,
    stop: oneshot::Sender<()>,
    task: JoinHandle<SessionState>,
}

impl ClientHandle {
    /// Validates `config` and starts a session over the transport `connect`
    /// resolves to.  The touch surface initially matches the viewport; call
    /// [`resize`](Self::resize) when the real container size is known.
    ///
    /// Must be called from inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] if the config does not
    /// validate.  Transport failures are reported through the event channel
    /// as `StateChanged(Failed(..))`.
    pub fn spawn<F>(
        config: ClientConfig,
        clock: Arc<dyn Clock>,
        connect: F,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ClientEvent>), ClientError>
    where
        F: Future<Output = Result<Box<dyn Transport>, ClientError>> + Send + 'static,
    {
        config.validate()?;

        let container = Extent::new(
            f64::from(config.viewport.width),
            f64::from(config.viewport.height),
        );
        let controller = TouchController::new(
            container,
            config.viewport,
            config.pad_scale_percent,
            config.mode,
        );
        let input = Arc::new(Mutex::new(TouchInput::new(controller)));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();

        let parts = SessionParts {
            config,
            input: Arc::clone(&input),
            clock,
            events: events_tx,
        };
        let task = tokio::spawn(run_session(connect, parts, stop_rx));

        Ok((
            Self {
                input,
                stop: stop_tx,
                task,
            },
            events_rx,
        ))
    }

    /// Maps one touch sample and offers the result to the pacer.  Returns
    /// `true` if the sample produced a position.
    pub fn submit(&self, sample: TouchSample) -> bool {
        let mut input = lock_input(&self.input);
        match input.controller.process(&sample) {
            Some(position) => {
                input.pacer.offer(position);
                true
            }
            None => false,
        }
    }

    pub fn set_mode(&self, mode: InputMode) {
        lock_input(&self.input).controller.set_mode(mode);
    }

    pub fn mode(&self) -> InputMode {
        lock_input(&self.input).controller.mode()
    }

    /// The touch surface changed size.
    pub fn resize(&self, container: Extent) {
        lock_input(&self.input).controller.resize(container);
    }

    pub fn set_scale(&self, scale_percent: f64) {
        lock_input(&self.input).controller.set_scale(scale_percent);
    }

    /// Ends the session, closes the transport and returns the final state.
    /// A session that already ended returns the state it ended in.
    pub async fn disconnect(self) -> SessionState {
        let _ = self.stop.send(());
        self.task
            .await
            .unwrap_or_else(|e| SessionState::Failed(format!("session task failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::timeout;
    use tokio_test::assert_ok;
    use touchlink_core::{ClientMessage, MonotonicClock, ScreenSize, ServerMessage, Viewport};

    use super::*;
    use crate::application::runner::HEARTBEAT_TIMEOUT;
    use crate::application::transport::MockTransport;

    const WAIT: Duration = Duration::from_secs(2);

    /// In-memory transport; the test plays the server through [`Remote`].
    struct FakeTransport {
        sent: mpsc::UnboundedSender<ClientMessage>,
        inbound: mpsc::UnboundedReceiver<ServerMessage>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(&mut self, message: ClientMessage) -> Result<(), ClientError> {
            let _ = self.sent.send(message);
            Ok(())
        }

        async fn recv(&mut self) -> Result<Option<ServerMessage>, ClientError> {
            match self.inbound.recv().await {
                Some(message) => Ok(Some(message)),
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    struct Remote {
        sent: mpsc::UnboundedReceiver<ClientMessage>,
        reply: mpsc::UnboundedSender<ServerMessage>,
        closed: Arc<AtomicBool>,
    }

    impl Remote {
        async fn next_sent(&mut self) -> ClientMessage {
            timeout(WAIT, self.sent.recv())
                .await
                .expect("client sent nothing")
                .expect("transport dropped")
        }

        /// Next MOVE, skipping HELLOs and PINGs.
        async fn next_move_within(&mut self, wait: Duration) -> Option<(u16, u16)> {
            let deadline = tokio::time::Instant::now() + wait;
            loop {
                match tokio::time::timeout_at(deadline, self.sent.recv()).await {
                    Ok(Some(ClientMessage::Move { x, y })) => return Some((x, y)),
                    Ok(Some(_)) => continue,
                    _ => return None,
                }
            }
        }

        async fn next_ping(&mut self) -> u64 {
            loop {
                if let ClientMessage::Ping(t) = self.next_sent().await {
                    return t;
                }
            }
        }

        fn send(&self, message: ServerMessage) {
            self.reply.send(message).unwrap();
        }
    }

    fn fake() -> (FakeTransport, Remote) {
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        (
            FakeTransport {
                sent: sent_tx,
                inbound: reply_rx,
                closed: Arc::clone(&closed),
            },
            Remote {
                sent: sent_rx,
                reply: reply_tx,
                closed,
            },
        )
    }

    fn fast_config() -> ClientConfig {
        ClientConfig {
            hello_interval_ms: 50,
            keepalive_interval_ms: 50,
            pong_timeout_ms: 200,
            frame_rate: 100,
            ..ClientConfig::default()
        }
    }

    fn start(config: ClientConfig) -> (ClientHandle, mpsc::UnboundedReceiver<ClientEvent>, Remote) {
        let (transport, remote) = fake();
        let (handle, events) = ClientHandle::spawn(config, Arc::new(MonotonicClock::new()), async move {
            Ok(Box::new(transport) as Box<dyn Transport>)
        })
        .unwrap();
        (handle, events, remote)
    }

    /// Waits for `StateChanged(target)`, returning every event seen on the way.
    async fn wait_for_state(
        events: &mut mpsc::UnboundedReceiver<ClientEvent>,
        target: SessionState,
    ) -> Vec<ClientEvent> {
        let mut seen = Vec::new();
        loop {
            let event = timeout(WAIT, events.recv())
                .await
                .unwrap_or_else(|_| panic!("never reached {target}; saw {seen:?}"))
                .expect("event channel closed");
            let done = event == ClientEvent::StateChanged(target.clone());
            seen.push(event);
            if done {
                return seen;
            }
        }
    }

    #[tokio::test]
    async fn test_accept_moves_session_to_connected() {
        // Arrange
        let (handle, mut events, mut remote) = start(fast_config());

        // Act
        let hello = remote.next_sent().await;
        remote.send(ServerMessage::Accepted(Some(ScreenSize::new(1920, 1080))));
        let seen = wait_for_state(&mut events, SessionState::Connected).await;

        // Assert
        assert_eq!(hello, ClientMessage::Hello(Viewport::new(390, 844).unwrap()));
        assert_eq!(
            seen,
            vec![
                ClientEvent::StateChanged(SessionState::Connecting),
                ClientEvent::StateChanged(SessionState::AwaitingApproval),
                ClientEvent::StateChanged(SessionState::Connected),
            ]
        );
        assert_eq!(
            timeout(WAIT, events.recv()).await.unwrap(),
            Some(ClientEvent::HostScreen(ScreenSize::new(1920, 1080)))
        );
        assert_eq!(handle.disconnect().await, SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_hello_is_resent_until_answered() {
        let (handle, _events, mut remote) = start(fast_config());

        let first = remote.next_sent().await;
        let second = remote.next_sent().await;

        assert!(matches!(first, ClientMessage::Hello(_)));
        assert!(matches!(second, ClientMessage::Hello(_)));
        handle.disconnect().await;
    }

    #[tokio::test]
    async fn test_remote_screen_after_bare_accept_rebuilds_pad() {
        let (handle, mut events, mut remote) = start(fast_config());
        remote.next_sent().await;

        remote.send(ServerMessage::Accepted(None));
        wait_for_state(&mut events, SessionState::Connected).await;
        remote.send(ServerMessage::RemoteScreen(ScreenSize::new(2560, 1440)));

        assert_eq!(
            timeout(WAIT, events.recv()).await.unwrap(),
            Some(ClientEvent::HostScreen(ScreenSize::new(2560, 1440)))
        );
        handle.disconnect().await;
    }

    #[tokio::test]
    async fn test_busy_ends_session_and_closes_transport() {
        // Arrange
        let (handle, mut events, mut remote) = start(fast_config());
        remote.next_sent().await;

        // Act
        remote.send(ServerMessage::Busy);
        wait_for_state(&mut events, SessionState::Busy).await;

        // Assert
        assert_eq!(handle.disconnect().await, SessionState::Busy);
        assert!(remote.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_reject_is_terminal() {
        let (handle, mut events, mut remote) = start(fast_config());
        remote.next_sent().await;

        remote.send(ServerMessage::Rejected);
        wait_for_state(&mut events, SessionState::Rejected).await;

        assert_eq!(handle.disconnect().await, SessionState::Rejected);
    }

    #[tokio::test]
    async fn test_burst_of_samples_sends_only_latest_position() {
        // Arrange
        let (handle, mut events, mut remote) = start(fast_config());
        remote.next_sent().await;
        remote.send(ServerMessage::Accepted(Some(ScreenSize::new(1920, 1080))));
        wait_for_state(&mut events, SessionState::Connected).await;
        timeout(WAIT, events.recv()).await.unwrap();

        // Act: no await between the samples, so one frame sees all three.
        handle.submit(TouchSample::active(10.0, 320.0, 0));
        handle.submit(TouchSample::active(20.0, 330.0, 5));
        handle.submit(TouchSample::active(195.0, 422.0, 10));

        // Assert: pad 390x219 centred vertically; its centre is the viewport centre.
        assert_eq!(remote.next_move_within(WAIT).await, Some((195, 422)));
        assert_eq!(remote.next_move_within(Duration::from_millis(100)).await, None);
        handle.disconnect().await;
    }

    #[tokio::test]
    async fn test_motion_before_accept_is_dropped() {
        let (handle, mut events, mut remote) = start(fast_config());
        remote.next_sent().await;

        assert!(handle.submit(TouchSample::active(100.0, 100.0, 0)));
        tokio::time::sleep(Duration::from_millis(60)).await;
        remote.send(ServerMessage::Accepted(None));
        wait_for_state(&mut events, SessionState::Connected).await;

        assert_eq!(remote.next_move_within(Duration::from_millis(150)).await, None);
        handle.disconnect().await;
    }

    #[tokio::test]
    async fn test_pong_reports_round_trip() {
        // Arrange
        let (handle, mut events, mut remote) = start(fast_config());
        remote.next_sent().await;
        remote.send(ServerMessage::Accepted(None));
        wait_for_state(&mut events, SessionState::Connected).await;

        // Act
        let t = remote.next_ping().await;
        remote.send(ServerMessage::Pong(t));

        // Assert
        let round_trip = loop {
            match timeout(WAIT, events.recv()).await.unwrap() {
                Some(event @ ClientEvent::RoundTrip { .. }) => break event,
                Some(_) => continue,
                None => panic!("event channel closed"),
            }
        };
        assert!(matches!(round_trip, ClientEvent::RoundTrip { rtt_ms, .. } if rtt_ms < 1000));
        handle.disconnect().await;
    }

    #[tokio::test]
    async fn test_server_ping_is_echoed_as_pong() {
        let (handle, mut events, mut remote) = start(fast_config());
        remote.next_sent().await;
        remote.send(ServerMessage::Accepted(None));
        wait_for_state(&mut events, SessionState::Connected).await;

        remote.send(ServerMessage::Ping(1234));

        let echoed = loop {
            if let ClientMessage::Pong(t) = remote.next_sent().await {
                break t;
            }
        };
        assert_eq!(echoed, 1234);
        handle.disconnect().await;
    }

    #[tokio::test]
    async fn test_silent_server_fails_with_heartbeat_timeout() {
        // Arrange
        let (handle, mut events, mut remote) = start(fast_config());
        remote.next_sent().await;

        // Act: accept, then never answer a PING.
        remote.send(ServerMessage::Accepted(None));
        wait_for_state(
            &mut events,
            SessionState::Failed(HEARTBEAT_TIMEOUT.to_owned()),
        )
        .await;

        // Assert
        assert!(remote.closed.load(Ordering::SeqCst));
        assert_eq!(
            handle.disconnect().await,
            SessionState::Failed(HEARTBEAT_TIMEOUT.to_owned())
        );
    }

    #[tokio::test]
    async fn test_disconnect_closes_transport() {
        let (handle, mut events, remote) = start(fast_config());
        wait_for_state(&mut events, SessionState::AwaitingApproval).await;

        let state = handle.disconnect().await;

        assert_eq!(state, SessionState::Disconnected);
        assert!(remote.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_connect_failure_reports_failed_state() {
        // Arrange
        let (handle, mut events) = ClientHandle::spawn(
            fast_config(),
            Arc::new(MonotonicClock::new()),
            async {
                Err(ClientError::Connect {
                    target: "udp://192.0.2.1:9002".into(),
                    reason: "unreachable".into(),
                })
            },
        )
        .unwrap();

        // Act
        let seen = wait_for_state(
            &mut events,
            SessionState::Failed(
                "failed to connect to udp://192.0.2.1:9002: unreachable".into(),
            ),
        )
        .await;

        // Assert
        assert_eq!(seen.len(), 2);
        assert!(matches!(handle.disconnect().await, SessionState::Failed(_)));
    }

    #[tokio::test]
    async fn test_receive_error_fails_session() {
        // Arrange
        let mut transport = MockTransport::new();
        transport.expect_send().returning(|_| Ok(()));
        transport.expect_recv().returning(|| Err(ClientError::Closed));
        transport.expect_close().times(1).returning(|| ());

        // Act
        let (handle, _events) = ClientHandle::spawn(
            fast_config(),
            Arc::new(MonotonicClock::new()),
            async move { Ok(Box::new(transport) as Box<dyn Transport>) },
        )
        .unwrap();
        let state = handle.disconnect().await;

        // Assert: the error may race the disconnect request.
        assert!(
            state == SessionState::Failed("connection closed by server".into())
                || state == SessionState::Disconnected,
            "unexpected final state {state}"
        );
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_spawning() {
        let config = ClientConfig {
            frame_rate: 0,
            ..ClientConfig::default()
        };

        let result = ClientHandle::spawn(config, Arc::new(MonotonicClock::new()), async {
            Err(ClientError::Closed)
        });

        assert!(matches!(result, Err(ClientError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_mode_switch_is_visible_through_handle() {
        let (handle, _events, _remote) = start(fast_config());

        handle.set_mode(InputMode::Relative);
        handle.resize(Extent::new(800.0, 600.0));
        handle.set_scale(80.0);

        assert_eq!(handle.mode(), InputMode::Relative);
        assert_ok!(timeout(WAIT, handle.disconnect()).await);
    }
}
