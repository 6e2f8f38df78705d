//! Datagram packet types.
//!
//! Every packet on the unreliable transport is a single tag byte followed by a
//! fixed-size payload.  All multi-byte integers are big-endian and unsigned.
//!
//! | Name   | Tag  | Payload                            | Direction       |
//! |--------|------|------------------------------------|-----------------|
//! | HELLO  | 0x01 | width:u16, height:u16              | client → server |
//! | MOVE   | 0x02 | x:u16, y:u16                       | client → server |
//! | PING   | 0x03 | t:u64 (ms)                         | client → server |
//! | ACCEPT | 0x10 | \[hostW:u16, hostH:u16\] optional  | server → client |
//! | REJECT | 0x11 | —                                  | server → client |
//! | BUSY   | 0x12 | —                                  | server → client |
//! | PONG   | 0x13 | t:u64 (echoed)                     | server → client |

use serde::{Deserialize, Serialize};

// ── Packet lengths ────────────────────────────────────────────────────────────

/// Length of HELLO and MOVE packets: tag + two u16 fields.
pub const POINT_PACKET_LEN: usize = 5;

/// Length of PING and PONG packets: tag + one u64 field.
pub const TIMESTAMP_PACKET_LEN: usize = 9;

/// Length of payload-less packets (REJECT, BUSY, bare ACCEPT).
pub const BARE_PACKET_LEN: usize = 1;

/// Largest packet defined by the protocol.  Receive buffers may be sized to
/// this; anything longer is malformed by definition.
pub const MAX_PACKET_LEN: usize = TIMESTAMP_PACKET_LEN;

// ── Dimension types ───────────────────────────────────────────────────────────

/// The handheld device's viewport in device pixels.
///
/// Both dimensions are in `1..=65535`; a zero dimension cannot be mapped to
/// and is rejected by [`Viewport::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Viewport {
    /// Returns `None` when either dimension is zero.
    pub fn new(width: u16, height: u16) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }

    /// Builds a viewport from fractional device pixels, rounding and clamping
    /// each dimension into `1..=65535`.
    pub fn from_f64(width: f64, height: f64) -> Self {
        Self {
            width: clamp_dimension(width),
            height: clamp_dimension(height),
        }
    }
}

/// The host's reported screen size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u16,
    pub height: u16,
}

impl ScreenSize {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Builds a screen size from a possibly fractional or oversized value,
    /// rounding and clamping each dimension into `1..=65535`.
    pub fn from_f64(width: f64, height: f64) -> Self {
        Self {
            width: clamp_dimension(width),
            height: clamp_dimension(height),
        }
    }

    /// `true` when both dimensions are non-zero.
    pub fn is_known(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

fn clamp_dimension(value: f64) -> u16 {
    if value.is_nan() {
        return 1;
    }
    value.round().clamp(1.0, f64::from(u16::MAX)) as u16
}

// ── Packet tags ───────────────────────────────────────────────────────────────

/// The leading tag byte of every datagram packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum PacketTag {
    // Client → server
    Hello = 0x01,
    Move = 0x02,
    Ping = 0x03,
    // Server → client
    Accept = 0x10,
    Reject = 0x11,
    Busy = 0x12,
    Pong = 0x13,
}

impl PacketTag {
    /// Returns `true` if `len` is a legal total packet length for this tag.
    ///
    /// ACCEPT is the only tag with two legal lengths: bare (host size
    /// unknown) and with the host size appended.
    pub fn accepts_len(self, len: usize) -> bool {
        match self {
            PacketTag::Hello | PacketTag::Move => len == POINT_PACKET_LEN,
            PacketTag::Ping | PacketTag::Pong => len == TIMESTAMP_PACKET_LEN,
            PacketTag::Reject | PacketTag::Busy => len == BARE_PACKET_LEN,
            PacketTag::Accept => len == BARE_PACKET_LEN || len == POINT_PACKET_LEN,
        }
    }

    /// The canonical (longest) length for this tag, used in error reports.
    pub fn expected_len(self) -> usize {
        match self {
            PacketTag::Hello | PacketTag::Move | PacketTag::Accept => POINT_PACKET_LEN,
            PacketTag::Ping | PacketTag::Pong => TIMESTAMP_PACKET_LEN,
            PacketTag::Reject | PacketTag::Busy => BARE_PACKET_LEN,
        }
    }
}

impl TryFrom<u8> for PacketTag {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(PacketTag::Hello),
            0x02 => Ok(PacketTag::Move),
            0x03 => Ok(PacketTag::Ping),
            0x10 => Ok(PacketTag::Accept),
            0x11 => Ok(PacketTag::Reject),
            0x12 => Ok(PacketTag::Busy),
            0x13 => Ok(PacketTag::Pong),
            _ => Err(()),
        }
    }
}

// ── Packet ────────────────────────────────────────────────────────────────────

/// A decoded datagram packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Packet {
    /// Admission request announcing the device viewport.
    ///
    /// The fields are carried as raw `u16`s so a zero dimension survives
    /// decoding; the server refuses to admit such a viewport.
    Hello { width: u16, height: u16 },
    /// Absolute pointer position in viewport pixels.
    Move { x: u16, y: u16 },
    /// Keepalive carrying the sender's monotonic timestamp in milliseconds.
    Ping(u64),
    /// Admission granted, optionally with the host screen size.
    Accept(Option<ScreenSize>),
    /// Operator rejected the admission request.
    Reject,
    /// Another device holds the session slot.
    Busy,
    /// Keepalive reply echoing the PING timestamp.
    Pong(u64),
}

impl Packet {
    /// Returns the tag byte identifying this packet on the wire.
    pub fn tag(&self) -> PacketTag {
        match self {
            Packet::Hello { .. } => PacketTag::Hello,
            Packet::Move { .. } => PacketTag::Move,
            Packet::Ping(_) => PacketTag::Ping,
            Packet::Accept(_) => PacketTag::Accept,
            Packet::Reject => PacketTag::Reject,
            Packet::Busy => PacketTag::Busy,
            Packet::Pong(_) => PacketTag::Pong,
        }
    }

    /// Returns the exact encoded length of this packet.
    pub fn encoded_len(&self) -> usize {
        match self {
            Packet::Accept(None) => BARE_PACKET_LEN,
            other => other.tag().expected_len(),
        }
    }

    /// Short name used in log messages.
    pub fn name(&self) -> &'static str {
        match self {
            Packet::Hello { .. } => "HELLO",
            Packet::Move { .. } => "MOVE",
            Packet::Ping(_) => "PING",
            Packet::Accept(_) => "ACCEPT",
            Packet::Reject => "REJECT",
            Packet::Busy => "BUSY",
            Packet::Pong(_) => "PONG",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_try_from_known_values() {
        for (byte, tag) in [
            (0x01, PacketTag::Hello),
            (0x02, PacketTag::Move),
            (0x03, PacketTag::Ping),
            (0x10, PacketTag::Accept),
            (0x11, PacketTag::Reject),
            (0x12, PacketTag::Busy),
            (0x13, PacketTag::Pong),
        ] {
            assert_eq!(PacketTag::try_from(byte), Ok(tag));
            assert_eq!(tag as u8, byte);
        }
    }

    #[test]
    fn test_tag_try_from_unknown_value_fails() {
        assert!(PacketTag::try_from(0x00).is_err());
        assert!(PacketTag::try_from(0x04).is_err());
        assert!(PacketTag::try_from(0xFF).is_err());
    }

    #[test]
    fn test_accept_allows_bare_and_sized_lengths() {
        assert!(PacketTag::Accept.accepts_len(1));
        assert!(PacketTag::Accept.accepts_len(5));
        assert!(!PacketTag::Accept.accepts_len(3));
    }

    #[test]
    fn test_encoded_len_matches_variant() {
        assert_eq!(Packet::Hello { width: 1, height: 1 }.encoded_len(), 5);
        assert_eq!(Packet::Ping(0).encoded_len(), 9);
        assert_eq!(Packet::Accept(None).encoded_len(), 1);
        assert_eq!(Packet::Accept(Some(ScreenSize::new(1, 1))).encoded_len(), 5);
        assert_eq!(Packet::Busy.encoded_len(), 1);
    }

    #[test]
    fn test_viewport_new_rejects_zero_dimension() {
        assert!(Viewport::new(0, 100).is_none());
        assert!(Viewport::new(100, 0).is_none());
        assert_eq!(
            Viewport::new(390, 844),
            Some(Viewport { width: 390, height: 844 })
        );
    }

    #[test]
    fn test_viewport_from_f64_clamps_into_range() {
        let v = Viewport::from_f64(0.2, 1.0e9);
        assert_eq!(v, Viewport { width: 1, height: 65535 });
        assert_eq!(Viewport::from_f64(f64::NAN, 389.6).height, 390);
    }
}
