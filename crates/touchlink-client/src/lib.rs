//! touchlink-client library crate.
//!
//! The device side of touchlink: it turns touch samples into pointer
//! positions and streams them to the host over UDP or WebSocket.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! UI (touch surface)
//!         ↓ TouchSample
//! [touchlink-client]
//!   ├── domain/           ClientConfig, ClientError, ClientEvent
//!   ├── application/
//!   │     ├── touch_input/ Pad geometry, absolute/relative mapping
//!   │     ├── runner/      Per-session task: state machine, timers, pacing
//!   │     ├── handle/      ClientHandle held by the UI
//!   │     └── transport/   The Transport trait
//!   └── infrastructure/
//!         ├── udp_transport/ Binary packets over UDP
//!         └── ws_transport/  JSON + binary frames over WebSocket
//!         ↓
//! Host (touchlink-server)
//! ```
//!
//! # For beginners: what happens when I touch the pad?
//!
//! 1. The UI calls [`application::ClientHandle::submit`] with the touch
//!    point.
//! 2. [`application::TouchController`] maps it onto the pad and into the
//!    device viewport (absolute mode) or adds the finger's travel to the
//!    current position (relative mode).
//! 3. The result waits in a one-slot pacer.  Newer touches overwrite it.
//! 4. On every frame tick the session task takes the newest position and,
//!    if the host has accepted the device, sends one MOVE.
//!
//! Nothing is queued: a slow network drops intermediate positions instead
//! of falling behind.

/// Domain layer: configuration, errors and UI events (no I/O).
pub mod domain;

/// Application layer: touch mapping, the session task and its handle.
pub mod application;

/// Infrastructure layer: the UDP and WebSocket transports.
pub mod infrastructure;
