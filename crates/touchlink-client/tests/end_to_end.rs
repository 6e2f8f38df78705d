//! Client against the real host service, over both transports.

mod common;

use common::{fast_config, start_client, wait_for_event, wait_for_state, RealHost, HOST};
use touchlink_client::domain::ClientEvent;
use touchlink_core::{SessionState, TouchSample, TransportKind, Viewport};
use touchlink_server::application::{scale_to_host, Decision};

/// Centre of the default 390x844 viewport, as the host should apply it.
fn host_centre() -> (u16, u16) {
    scale_to_host(195, 422, Viewport::new(390, 844).unwrap(), HOST)
}

async fn touch_moves_host_pointer(transport: TransportKind) {
    // Arrange
    let host = RealHost::start(None).await;
    let (handle, mut events) = start_client(fast_config(host.addr_for(transport), transport));
    assert!(wait_for_state(&mut events, SessionState::Connected).await);
    let size = wait_for_event(&mut events, |event| match event {
        ClientEvent::HostScreen(size) => Some(*size),
        _ => None,
    })
    .await;

    // Act
    handle.submit(TouchSample::active(195.0, 422.0, 0));

    // Assert
    assert_eq!(size, Some(HOST));
    assert!(host.wait_for_move(host_centre()).await);
    assert_eq!(handle.disconnect().await, SessionState::Disconnected);
}

#[tokio::test]
async fn test_udp_touch_moves_host_pointer() {
    touch_moves_host_pointer(TransportKind::Datagram).await;
}

#[tokio::test]
async fn test_ws_touch_moves_host_pointer() {
    touch_moves_host_pointer(TransportKind::Message).await;
}

#[tokio::test]
async fn test_keepalive_round_trip_over_both_transports() {
    let host = RealHost::start(None).await;

    // WebSocket first: its close frees the slot at once, while a UDP session
    // holds it until the inactivity timeout.
    for transport in [TransportKind::Message, TransportKind::Datagram] {
        let (handle, mut events) = start_client(fast_config(host.addr_for(transport), transport));

        let rtt = wait_for_event(&mut events, |event| match event {
            ClientEvent::RoundTrip { rtt_ms, .. } => Some(*rtt_ms),
            _ => None,
        })
        .await;

        assert!(rtt.is_some(), "no round trip over {transport}");
        assert_eq!(handle.disconnect().await, SessionState::Disconnected);
        if transport == TransportKind::Message {
            assert!(host.wait_until_idle().await);
        }
    }
}

#[tokio::test]
async fn test_second_device_is_told_host_is_busy() {
    // Arrange: a WebSocket device holds the slot.
    let host = RealHost::start(None).await;
    let (first, mut first_events) = start_client(fast_config(host.ws_addr, TransportKind::Message));
    assert!(wait_for_state(&mut first_events, SessionState::Connected).await);

    // Act: a UDP device tries to join.
    let (second, mut second_events) =
        start_client(fast_config(host.udp_addr, TransportKind::Datagram));

    // Assert
    assert!(wait_for_state(&mut second_events, SessionState::Busy).await);
    assert_eq!(second.disconnect().await, SessionState::Busy);
    assert_eq!(first.disconnect().await, SessionState::Disconnected);
}

#[tokio::test]
async fn test_operator_rejection_reaches_ws_device() {
    let host = RealHost::start(Some(vec![Decision::Reject])).await;
    let (handle, mut events) = start_client(fast_config(host.ws_addr, TransportKind::Message));

    assert!(wait_for_state(&mut events, SessionState::Rejected).await);
    assert_eq!(handle.disconnect().await, SessionState::Rejected);
}

#[tokio::test]
async fn test_ws_disconnect_frees_host_slot() {
    // Arrange
    let host = RealHost::start(None).await;
    let (first, mut events) = start_client(fast_config(host.ws_addr, TransportKind::Message));
    assert!(wait_for_state(&mut events, SessionState::Connected).await);

    // Act
    first.disconnect().await;

    // Assert: the slot is free and a new device gets in.
    assert!(host.wait_until_idle().await);
    let (second, mut events) = start_client(fast_config(host.udp_addr, TransportKind::Datagram));
    assert!(wait_for_state(&mut events, SessionState::Connected).await);
    second.disconnect().await;
}
