//! # touchlink-core
//!
//! Shared library for touchlink containing the wire codec, the coordinate
//! mapping engine, and the client session state machine.
//!
//! This crate is used by both the server (host) and client (handheld device)
//! applications.  It has zero dependencies on OS APIs, UI frameworks, async
//! runtimes, or network sockets.
//!
//! # Architecture overview (for beginners)
//!
//! touchlink turns a phone or tablet into a touchpad for another computer on
//! the same LAN.  The device captures touch samples, converts them into a
//! pointer position, and streams that position to the host, which moves its
//! own cursor.  Only one device may drive the host at a time, and the host
//! operator approves every new device by hand.
//!
//! This crate (`touchlink-core`) is the shared foundation.  It defines:
//!
//! - **`protocol`** – How bytes travel over the network.  The datagram
//!   transport uses tiny fixed-size binary packets; the WebSocket transport
//!   uses JSON control messages plus a 4-byte binary move frame.
//!
//! - **`geometry`** – Pure functions that size the on-screen touch pad and
//!   convert a touch point into an absolute or relative pointer position.
//!
//! - **`session`** – The client-side lifecycle state machine shared by both
//!   transports.
//!
//! - **`pacer`**, **`keepalive`**, **`rate`** – Frame-rate send coalescing,
//!   round-trip-time tracking, and per-second event counting.
//!
//! - **`clock`** – The monotonic millisecond clock consumed by the above.

pub mod clock;
pub mod geometry;
pub mod keepalive;
pub mod pacer;
pub mod protocol;
pub mod rate;
pub mod session;

// Re-export the most-used types at the crate root so callers can write
// `touchlink_core::Packet` instead of `touchlink_core::protocol::packet::Packet`.
pub use clock::{Clock, MonotonicClock};
pub use geometry::{
    absolute_to_screen, compute_pad_size, map_to_pad_coordinates, Extent, PadGeometry, PadSize,
    RelativeTracker, TouchSample,
};
pub use keepalive::RttMonitor;
pub use pacer::SendPacer;
pub use protocol::{
    decode_move_frame, decode_packet, encode_move_frame, encode_packet, ClientMessage,
    ControlMessage, Packet, ProtocolError, ScreenSize, ServerMessage, StatusReply, Viewport,
    WireFrame,
};
pub use rate::RateMeter;
pub use session::{InputMode, SessionEvent, SessionMachine, SessionState, TransportKind};
