//! Protocol module containing packet types, the datagram codec, and the
//! reliable-transport control messages.

pub mod codec;
pub mod control;
pub mod message;
pub mod packet;

pub use codec::{decode_packet, encode_packet, ProtocolError};
pub use control::{decode_move_frame, encode_move_frame, ControlMessage, StatusReply};
pub use message::{ClientMessage, ServerMessage, WireFrame};
pub use packet::{Packet, PacketTag, ScreenSize, Viewport};
