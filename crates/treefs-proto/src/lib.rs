//! Wire protocol shared by the TreeFS server and client.
//!
//! Requests are single textual commands, one per datagram, at most
//! [`MAX_REQUEST_SIZE`] bytes. Replies are a single host-endian `i32`:
//! `0` for success, a non-negative inumber for lookups, or a negative
//! [`Status`] code. Both ends of a Unix-domain socket live on the same host,
//! so native endianness is unambiguous.

mod command;
mod status;

pub use command::{Command, NodeType, ProtocolError};
pub use status::Status;

/// Largest accepted request datagram, in bytes.
pub const MAX_REQUEST_SIZE: usize = 200;

/// Size of a reply datagram.
pub const REPLY_SIZE: usize = size_of::<i32>();

/// Encodes a reply status for the wire.
pub fn encode_reply(code: i32) -> [u8; REPLY_SIZE] {
    code.to_ne_bytes()
}

/// Decodes a reply received from the wire.
pub fn decode_reply(bytes: [u8; REPLY_SIZE]) -> i32 {
    i32::from_ne_bytes(bytes)
}
