//! Binary codec for the datagram transport.
//!
//! Wire format:
//! ```text
//! [tag:1][payload:N]
//! ```
//! `N` is fixed per tag (see [`crate::protocol::packet`]).  All multi-byte
//! integers are big-endian.  There is no framing, versioning, or streaming
//! decode: each datagram carries exactly one packet.

use thiserror::Error;

use crate::protocol::packet::{Packet, PacketTag, ScreenSize, BARE_PACKET_LEN};

/// Errors that can occur while decoding a packet or control message.
///
/// Every variant means the input is malformed; receivers drop it without
/// touching session state.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// A zero-length datagram or frame.
    #[error("malformed packet: empty buffer")]
    Empty,

    /// The leading tag byte is not a recognized packet type.
    #[error("malformed packet: unknown tag 0x{0:02X}")]
    UnknownTag(u8),

    /// The buffer length does not match the fixed length for its tag.
    #[error("malformed packet: tag 0x{tag:02X} expects {expected} bytes, got {actual}")]
    LengthMismatch {
        tag: u8,
        expected: usize,
        actual: usize,
    },

    /// A JSON control message could not be parsed.
    #[error("malformed control message: {0}")]
    InvalidJson(String),

    /// A plain-text status reply was not one of the known strings.
    #[error("unknown status reply: {0:?}")]
    UnknownStatus(String),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`Packet`] into its exact wire representation.
///
/// Encoding cannot fail: every variant has a fixed layout.
///
/// # Examples
///
/// ```rust
/// use touchlink_core::protocol::{decode_packet, encode_packet, Packet};
///
/// let bytes = encode_packet(&Packet::Move { x: 10, y: 300 });
/// assert_eq!(bytes, [0x02, 0x00, 0x0A, 0x01, 0x2C]);
/// assert_eq!(decode_packet(&bytes).unwrap(), Packet::Move { x: 10, y: 300 });
/// ```
pub fn encode_packet(packet: &Packet) -> Vec<u8> {
    let mut buf = Vec::with_capacity(packet.encoded_len());
    buf.push(packet.tag() as u8);
    match packet {
        Packet::Hello { width, height } => write_pair(&mut buf, *width, *height),
        Packet::Move { x, y } => write_pair(&mut buf, *x, *y),
        Packet::Ping(t) | Packet::Pong(t) => buf.extend_from_slice(&t.to_be_bytes()),
        Packet::Accept(Some(size)) => write_pair(&mut buf, size.width, size.height),
        Packet::Accept(None) | Packet::Reject | Packet::Busy => {} // tag only
    }
    buf
}

/// Decodes exactly one [`Packet`] from `bytes`.
///
/// # Errors
///
/// - [`ProtocolError::Empty`] for a zero-length buffer.
/// - [`ProtocolError::UnknownTag`] if the first byte is not a known tag.
/// - [`ProtocolError::LengthMismatch`] if the buffer is not exactly the
///   length defined for its tag (trailing bytes are *not* tolerated).
///
/// # Examples
///
/// ```rust
/// use touchlink_core::protocol::{decode_packet, Packet, ProtocolError};
///
/// assert_eq!(decode_packet(&[0x12]).unwrap(), Packet::Busy);
/// assert!(matches!(decode_packet(&[0x12, 0x00]), Err(ProtocolError::LengthMismatch { .. })));
/// ```
pub fn decode_packet(bytes: &[u8]) -> Result<Packet, ProtocolError> {
    let Some(&tag_byte) = bytes.first() else {
        return Err(ProtocolError::Empty);
    };
    let tag = PacketTag::try_from(tag_byte).map_err(|_| ProtocolError::UnknownTag(tag_byte))?;

    if !tag.accepts_len(bytes.len()) {
        return Err(ProtocolError::LengthMismatch {
            tag: tag_byte,
            expected: tag.expected_len(),
            actual: bytes.len(),
        });
    }

    let payload = &bytes[1..];
    let packet = match tag {
        PacketTag::Hello => {
            let (width, height) = read_pair(payload);
            Packet::Hello { width, height }
        }
        PacketTag::Move => {
            let (x, y) = read_pair(payload);
            Packet::Move { x, y }
        }
        PacketTag::Ping => Packet::Ping(read_u64(payload)),
        PacketTag::Pong => Packet::Pong(read_u64(payload)),
        PacketTag::Accept if bytes.len() == BARE_PACKET_LEN => Packet::Accept(None),
        PacketTag::Accept => {
            let (width, height) = read_pair(payload);
            Packet::Accept(Some(ScreenSize::new(width, height)))
        }
        PacketTag::Reject => Packet::Reject,
        PacketTag::Busy => Packet::Busy,
    };
    Ok(packet)
}

// ── Field helpers ─────────────────────────────────────────────────────────────
//
// Callers have already validated the length, so the fixed-offset reads below
// cannot go out of bounds.

fn write_pair(buf: &mut Vec<u8>, a: u16, b: u16) {
    buf.extend_from_slice(&a.to_be_bytes());
    buf.extend_from_slice(&b.to_be_bytes());
}

fn read_pair(p: &[u8]) -> (u16, u16) {
    (
        u16::from_be_bytes([p[0], p[1]]),
        u16::from_be_bytes([p[2], p[3]]),
    )
}

fn read_u64(p: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&p[..8]);
    u64::from_be_bytes(raw)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
