//! ANT serial message framing.
//!
//! Every message on the wire is framed as:
//! - a sync byte (`0xA4`)
//! - a 1-byte payload length
//! - a 1-byte message id
//! - the payload
//! - a 1-byte XOR checksum over everything before it
//!
//! The [`Framer`] turns an arbitrarily fragmented byte stream into whole
//! [`Message`]s, skipping frames whose checksum does not match.

pub mod codec;
pub mod error;
pub mod framer;
pub mod ids;
pub mod message;

pub use codec::{
    checksum, decode_frame, encode_frame, RawFrame, FRAME_OVERHEAD, MAX_PAYLOAD, SYNC,
};
pub use error::{FrameError, Result};
pub use framer::{process_buffer, Framer, FramerStats};
pub use ids::{event_name, message_name};
pub use message::{decode_message, ChannelData, ChannelEvent, Message, MessageKind};
