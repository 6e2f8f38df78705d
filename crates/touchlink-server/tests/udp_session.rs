//! Integration tests for the datagram transport.
//!
//! Each test starts a real server on loopback ports and talks to it with
//! plain UDP sockets, exactly like a handheld device would:
//!
//! ```text
//! device                 server
//! HELLO(w,h)     ──►
//!                ◄──     ACCEPT(hostW,hostH) | REJECT | BUSY
//! MOVE(x,y)      ──►     (pointer moves)
//! PING(t)        ──►
//!                ◄──     PONG(t)
//! ```

mod common;

use std::time::Duration;

use common::{Approval, TestServer, UdpDevice, HOST};
use touchlink_core::Packet;
use touchlink_server::application::Decision;

const TIMEOUT: Duration = Duration::from_secs(5);
const SILENCE: Duration = Duration::from_millis(300);

// ── Admission ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_auto_approved_hello_gets_accept_with_host_size() {
    // Arrange
    let server = TestServer::start(Approval::Auto, TIMEOUT).await;
    let device = UdpDevice::new(server.udp_addr).await;

    // Act
    let reply = device.hello(390, 844).await;

    // Assert
    assert_eq!(reply, Some(Packet::Accept(Some(HOST))));
}

#[tokio::test]
async fn test_operator_rejection_sends_reject_and_frees_slot() {
    // Arrange: first answer rejects, second approves.
    let server = TestServer::start(
        Approval::Scripted(vec![Decision::Reject, Decision::Approve]),
        TIMEOUT,
    )
    .await;
    let device = UdpDevice::new(server.udp_addr).await;

    // Act + Assert
    assert_eq!(device.hello(390, 844).await, Some(Packet::Reject));
    assert!(server.service.current().is_none());
    assert_eq!(device.hello(390, 844).await, Some(Packet::Accept(Some(HOST))));
}

#[tokio::test]
async fn test_second_device_gets_busy() {
    let server = TestServer::start(Approval::Auto, TIMEOUT).await;
    let first = UdpDevice::new(server.udp_addr).await;
    let second = UdpDevice::new(server.udp_addr).await;

    assert_eq!(first.hello(390, 844).await, Some(Packet::Accept(Some(HOST))));
    assert_eq!(second.hello(800, 600).await, Some(Packet::Busy));

    // The first device keeps the slot.
    first.send(&Packet::Move { x: 195, y: 422 }).await;
    assert!(server.wait_for_move((960, 540)).await);
}

#[tokio::test]
async fn test_pending_approval_does_not_stall_the_receive_loop() {
    // Arrange: the operator has not answered yet.
    let (approval, release) = Approval::held();
    let server = TestServer::start(approval, TIMEOUT).await;
    let first = UdpDevice::new(server.udp_addr).await;
    let second = UdpDevice::new(server.udp_addr).await;
    first.send(&Packet::Hello { width: 390, height: 844 }).await;
    assert!(first.recv_within(SILENCE).await.is_none());

    // Act + Assert: the loop keeps serving while the first device waits.
    second.send_raw(&[0xFF, 0x00]).await;
    assert_eq!(second.hello(800, 600).await, Some(Packet::Busy));
    assert!(second.recv_within(SILENCE).await.is_none());
    first.send(&Packet::Hello { width: 390, height: 844 }).await;
    assert!(first.recv_within(SILENCE).await.is_none());

    // Releasing the decision answers the waiting device.
    release.send(Decision::Approve).unwrap();
    assert_eq!(first.recv().await, Some(Packet::Accept(Some(HOST))));
    first.send(&Packet::Move { x: 195, y: 422 }).await;
    assert!(server.wait_for_move((960, 540)).await);
}

#[tokio::test]
async fn test_repeated_hello_from_connected_device_resends_accept() {
    // A lost ACCEPT makes the device retry; it must get another ACCEPT.
    let server = TestServer::start(Approval::Auto, TIMEOUT).await;
    let device = UdpDevice::new(server.udp_addr).await;

    assert!(device.hello(390, 844).await.is_some());
    let again = device.hello(844, 390).await;

    assert_eq!(again, Some(Packet::Accept(Some(HOST))));
    assert_eq!(server.service.current().unwrap().viewport.width, 844);
}

// ── Motion and keepalive ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_move_is_scaled_to_host_screen() {
    // Arrange
    let server = TestServer::start(Approval::Auto, TIMEOUT).await;
    let device = UdpDevice::new(server.udp_addr).await;
    device.hello(400, 200).await;

    // Act
    device.send(&Packet::Move { x: 100, y: 50 }).await;

    // Assert: quarter of the viewport maps to a quarter of the host.
    assert!(server.wait_for_move((480, 270)).await);
}

#[tokio::test]
async fn test_move_before_hello_is_ignored() {
    let server = TestServer::start(Approval::Auto, TIMEOUT).await;
    let device = UdpDevice::new(server.udp_addr).await;

    device.send(&Packet::Move { x: 10, y: 10 }).await;

    assert!(device.recv_within(SILENCE).await.is_none());
    assert!(server.sink.last_move().is_none());
}

#[tokio::test]
async fn test_ping_from_connected_device_is_echoed() {
    let server = TestServer::start(Approval::Auto, TIMEOUT).await;
    let device = UdpDevice::new(server.udp_addr).await;
    device.hello(390, 844).await;

    device.send(&Packet::Ping(123_456_789)).await;

    assert_eq!(device.recv().await, Some(Packet::Pong(123_456_789)));
}

#[tokio::test]
async fn test_ping_from_stranger_gets_no_reply() {
    let server = TestServer::start(Approval::Auto, TIMEOUT).await;
    let owner = UdpDevice::new(server.udp_addr).await;
    let stranger = UdpDevice::new(server.udp_addr).await;
    owner.hello(390, 844).await;

    stranger.send(&Packet::Ping(1)).await;

    assert!(stranger.recv_within(SILENCE).await.is_none());
}

// ── Robustness ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_malformed_datagrams_are_dropped_silently() {
    let server = TestServer::start(Approval::Auto, TIMEOUT).await;
    let device = UdpDevice::new(server.udp_addr).await;

    device.send_raw(&[]).await;
    device.send_raw(&[0xFF, 0x00]).await;
    device.send_raw(&[0x01, 0x01]).await; // truncated HELLO
    assert!(device.recv_within(SILENCE).await.is_none());

    // The server is still serving.
    assert_eq!(device.hello(390, 844).await, Some(Packet::Accept(Some(HOST))));
}

#[tokio::test]
async fn test_silent_device_is_evicted_and_slot_reused() {
    // Arrange: a short timeout so the test stays fast.
    let server = TestServer::start(Approval::Auto, Duration::from_millis(300)).await;
    let first = UdpDevice::new(server.udp_addr).await;
    let second = UdpDevice::new(server.udp_addr).await;
    assert!(first.hello(390, 844).await.is_some());
    assert_eq!(second.hello(390, 844).await, Some(Packet::Busy));

    // Act: stay silent well past the timeout.
    tokio::time::sleep(Duration::from_millis(700)).await;

    // Assert: nothing was sent to the evicted device, and the slot is free.
    assert!(first.recv_within(Duration::from_millis(50)).await.is_none());
    assert_eq!(second.hello(390, 844).await, Some(Packet::Accept(Some(HOST))));
}

#[tokio::test]
async fn test_pings_keep_device_connected_past_timeout() {
    let server = TestServer::start(Approval::Auto, Duration::from_millis(300)).await;
    let device = UdpDevice::new(server.udp_addr).await;
    device.hello(390, 844).await;

    for t in 0..6 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        device.send(&Packet::Ping(t)).await;
        assert_eq!(device.recv().await, Some(Packet::Pong(t)));
    }

    assert!(server.service.current().is_some());
}
