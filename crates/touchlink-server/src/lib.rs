//! touchlink-server library crate.
//!
//! The host side of touchlink: it owns the single session slot, asks the
//! operator to approve each new device, and moves the host pointer for the
//! connected device.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Handheld device (UDP datagrams or WebSocket)
//!         ↕
//! [touchlink-server]
//!   ├── domain/           Pure types: ServerConfig, Peer, SessionSnapshot
//!   ├── application/      Session registry, approval broker, pointer dispatch,
//!   │                     and the transport-neutral SessionService
//!   └── infrastructure/
//!         ├── udp_server/ Datagram receive loop (touchlink-core codec)
//!         ├── ws_server/  WebSocket accept loop (tokio-tungstenite)
//!         ├── sweeper/    Inactivity eviction timer
//!         ├── prompt/     Operator y/n prompt on stdin
//!         └── pointer_sink/ Headless and recording pointer backends
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async code.
//! - `application` depends on `domain` and `touchlink-core`; it uses tokio
//!   channels but never opens a socket.
//! - `infrastructure` depends on all other layers plus `tokio` and
//!   `tungstenite`.
//!
//! # For beginners: why one registry for two transports?
//!
//! A phone may talk to the host over UDP (lowest latency) or over a
//! WebSocket (works from a plain browser).  Both kinds of connection compete
//! for the same host pointer, so both consult the same
//! [`application::SessionRegistry`].  Whichever device is admitted first
//! holds the slot; everyone else is told the host is busy.

/// Domain layer: configuration and session value types (no I/O).
pub mod domain;

/// Application layer: registry, approval, pointer dispatch.
pub mod application;

/// Infrastructure layer: sockets, timers, operator prompt, pointer backends.
pub mod infrastructure;
