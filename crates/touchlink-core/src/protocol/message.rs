//! Transport-neutral message vocabulary.
//!
//! The datagram and WebSocket transports carry the same conversation in two
//! different encodings.  The client session runner speaks only
//! [`ClientMessage`] and [`ServerMessage`]; each transport binding converts
//! them to and from its own wire format with the helpers below.
//!
//! # Mapping
//!
//! | Neutral                          | Datagram            | WebSocket                                   |
//! |----------------------------------|---------------------|---------------------------------------------|
//! | `ClientMessage::Hello`           | HELLO               | `{"type":"init",..}`                        |
//! | `ClientMessage::Move`            | MOVE                | 4-byte binary frame                         |
//! | `ClientMessage::Ping`            | PING                | `{"type":"ping","t":..}`                    |
//! | `ClientMessage::Pong`            | —                   | `{"type":"pong","t":..}`                    |
//! | `ServerMessage::Accepted(size)`  | ACCEPT \[size\]     | `"connected"` (+ `remote_screen`)           |
//! | `ServerMessage::Rejected`        | REJECT              | `"rejected"`                                |
//! | `ServerMessage::Busy`            | BUSY                | `"Already connected"`                       |
//! | `ServerMessage::Pong`            | PONG                | `{"type":"pong","t":..}`                    |
//! | `ServerMessage::Ping`            | —                   | `{"type":"ping","t":..}`                    |
//! | `ServerMessage::RemoteScreen`    | —                   | `{"type":"remote_screen",..}`               |

use crate::protocol::codec::ProtocolError;
use crate::protocol::control::{encode_move_frame, ControlMessage, StatusReply};
use crate::protocol::packet::{Packet, ScreenSize, Viewport};

/// A single WebSocket data frame, independent of any WebSocket library.
#[derive(Debug, Clone, PartialEq)]
pub enum WireFrame {
    Text(String),
    Binary(Vec<u8>),
}

/// Messages a client sends to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMessage {
    Hello(Viewport),
    Move { x: u16, y: u16 },
    Ping(u64),
    Pong(u64),
}

/// Messages a server sends to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMessage {
    Accepted(Option<ScreenSize>),
    Rejected,
    Busy,
    Pong(u64),
    Ping(u64),
    RemoteScreen(ScreenSize),
}

impl ClientMessage {
    /// Converts to a datagram packet.  Returns `None` for messages the
    /// datagram transport has no packet for.
    pub fn to_packet(&self) -> Option<Packet> {
        match *self {
            ClientMessage::Hello(v) => Some(Packet::Hello {
                width: v.width,
                height: v.height,
            }),
            ClientMessage::Move { x, y } => Some(Packet::Move { x, y }),
            ClientMessage::Ping(t) => Some(Packet::Ping(t)),
            ClientMessage::Pong(_) => None,
        }
    }

    /// Converts to a WebSocket frame.
    ///
    /// # Errors
    ///
    /// Propagates JSON serialization failures from [`ControlMessage::to_json`].
    pub fn to_frame(&self) -> Result<WireFrame, ProtocolError> {
        let control = match *self {
            ClientMessage::Move { x, y } => {
                return Ok(WireFrame::Binary(encode_move_frame(x, y).to_vec()))
            }
            ClientMessage::Hello(v) => ControlMessage::Init {
                width: v.width,
                height: v.height,
            },
            ClientMessage::Ping(t) => ControlMessage::Ping { t: t as f64 },
            ClientMessage::Pong(t) => ControlMessage::Pong { t: t as f64 },
        };
        control.to_json().map(WireFrame::Text)
    }
}

impl ServerMessage {
    /// Interprets a datagram packet received by a client.  Returns `None`
    /// for client-direction packets, which a client ignores.
    pub fn from_packet(packet: Packet) -> Option<Self> {
        match packet {
            Packet::Accept(size) => Some(ServerMessage::Accepted(size)),
            Packet::Reject => Some(ServerMessage::Rejected),
            Packet::Busy => Some(ServerMessage::Busy),
            Packet::Pong(t) => Some(ServerMessage::Pong(t)),
            Packet::Hello { .. } | Packet::Move { .. } | Packet::Ping(_) => None,
        }
    }

    /// Interprets a WebSocket frame received by a client.
    ///
    /// Text frames are either a status reply or a JSON control message.
    /// Binary frames never travel server → client.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] for frames that are neither.
    pub fn from_frame(frame: &WireFrame) -> Result<Option<Self>, ProtocolError> {
        let text = match frame {
            WireFrame::Text(text) => text,
            WireFrame::Binary(_) => return Ok(None),
        };

        if let Ok(status) = text.parse::<StatusReply>() {
            return Ok(Some(match status {
                // The host size follows in a separate remote_screen message.
                StatusReply::Connected => ServerMessage::Accepted(None),
                StatusReply::Rejected => ServerMessage::Rejected,
                StatusReply::AlreadyConnected => ServerMessage::Busy,
            }));
        }

        Ok(match ControlMessage::from_json(text)? {
            ControlMessage::Pong { t } => Some(ServerMessage::Pong(timestamp_from_json(t))),
            ControlMessage::Ping { t } => Some(ServerMessage::Ping(timestamp_from_json(t))),
            ControlMessage::RemoteScreen { width, height } => {
                Some(ServerMessage::RemoteScreen(ScreenSize::new(width, height)))
            }
            ControlMessage::Init { .. } => None,
        })
    }
}

/// JSON timestamps may be fractional or negative; the neutral vocabulary
/// uses whole milliseconds.
fn timestamp_from_json(t: f64) -> u64 {
    if t.is_finite() && t > 0.0 {
        t.round() as u64
    } else {
        0
    }
}
