//! CRC-protected packet framing over asynchronous byte links.
//!
//! Every packet is framed with:
//! - A 1-byte payload length plus its CRC-8 (header)
//! - The payload itself
//! - A little-endian CRC-16 over length + payload (trailer)
//!
//! Corruption drops a single frame and resynchronizes at the next byte
//! boundary; it never tears down the connection. There is no retransmission:
//! the framing detects damage, the endpoint client decides whether to
//! reissue.

pub mod codec;
pub mod crc;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, FrameConfig, CANONICAL_PREFIX, DEFAULT_MAX_PAYLOAD, HEADER_SIZE,
    MAX_FRAME_PAYLOAD, PROTOCOL_VERSION, TRAILER_SIZE,
};
pub use crc::{crc16, crc8, CRC16_INIT, CRC16_POLYNOMIAL, CRC8_INIT, CRC8_POLYNOMIAL};
pub use error::{FrameError, Result};
pub use reader::PacketUnwrapper;
pub use writer::PacketWrapper;
