//! Message formats for the reliable (WebSocket) transport.
//!
//! The reliable transport mixes three kinds of frames:
//!
//! - **JSON text frames** carrying a [`ControlMessage`], discriminated by a
//!   `"type"` field:
//!
//!   ```json
//!   {"type":"init","width":390,"height":844}
//!   {"type":"ping","t":1000}
//!   {"type":"pong","t":1000}
//!   {"type":"remote_screen","width":1920,"height":1080}
//!   ```
//!
//! - **Plain-text status replies** from the server ([`StatusReply`]):
//!   `"connected"`, `"rejected"`, `"Already connected"`.
//!
//! - **4-byte binary move frames**: `[x:u16be][y:u16be]`, no tag byte.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::protocol::codec::ProtocolError;

/// Exact length of a binary move frame.
pub const MOVE_FRAME_LEN: usize = 4;

/// A JSON control message on the reliable transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Client admission request announcing its viewport (the reliable
    /// transport's HELLO).
    Init { width: u16, height: u16 },
    /// Keepalive probe.  `t` is the sender's clock in milliseconds and may be
    /// fractional (browsers send `performance.now()`).
    Ping { t: f64 },
    /// Keepalive reply echoing the probe's `t` unchanged.
    Pong { t: f64 },
    /// Host screen size, sent by the server right after `"connected"`.
    RemoteScreen { width: u16, height: u16 },
}

impl ControlMessage {
    /// Parses a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidJson`] for anything that is not a
    /// well-formed control message, including out-of-range dimensions.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::InvalidJson(e.to_string()))
    }

    /// Serializes this message to a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidJson`] if serialization fails (only
    /// possible for a non-finite `t`).
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::InvalidJson(e.to_string()))
    }
}

/// Plain-text status reply sent by the server on the reliable transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusReply {
    /// Admission granted.
    Connected,
    /// Operator rejected the request.
    Rejected,
    /// Another device holds the session slot.
    AlreadyConnected,
}

impl StatusReply {
    /// The exact wire string for this reply.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusReply::Connected => "connected",
            StatusReply::Rejected => "rejected",
            StatusReply::AlreadyConnected => "Already connected",
        }
    }
}

impl fmt::Display for StatusReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusReply {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connected" => Ok(StatusReply::Connected),
            "rejected" => Ok(StatusReply::Rejected),
            "Already connected" => Ok(StatusReply::AlreadyConnected),
            other => Err(ProtocolError::UnknownStatus(other.to_string())),
        }
    }
}

/// Encodes a binary move frame.
pub fn encode_move_frame(x: u16, y: u16) -> [u8; MOVE_FRAME_LEN] {
    let [x0, x1] = x.to_be_bytes();
    let [y0, y1] = y.to_be_bytes();
    [x0, x1, y0, y1]
}

/// Decodes a binary move frame.
///
/// # Errors
///
/// Returns [`ProtocolError::Empty`] for an empty frame and
/// [`ProtocolError::LengthMismatch`] (with tag `0x00`, the frame has none)
/// for any length other than [`MOVE_FRAME_LEN`].
pub fn decode_move_frame(bytes: &[u8]) -> Result<(u16, u16), ProtocolError> {
    match bytes {
        [] => Err(ProtocolError::Empty),
        [x0, x1, y0, y1] => Ok((u16::from_be_bytes([*x0, *x1]), u16::from_be_bytes([*y0, *y1]))),
        _ => Err(ProtocolError::LengthMismatch {
            tag: 0x00,
            expected: MOVE_FRAME_LEN,
            actual: bytes.len(),
        }),
    }
}
