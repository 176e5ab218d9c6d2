use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::crc::{crc16, crc8, CRC16_INIT, CRC8_INIT};
use crate::error::{FrameError, Result};

/// Frame header: length byte + CRC-8 of the length byte.
pub const HEADER_SIZE: usize = 2;

/// Frame trailer: CRC-16 over length + payload, little-endian.
pub const TRAILER_SIZE: usize = 2;

/// Largest payload the one-byte length field can describe.
pub const MAX_FRAME_PAYLOAD: usize = u8::MAX as usize;

/// Default maximum payload accepted by the de-framer. Sized to the
/// multiplexer's receive buffer.
pub const DEFAULT_MAX_PAYLOAD: usize = 128;

/// Prefix byte reserved for the transport's outer channel identification.
///
/// Not part of the frame checksums; connection-oriented transports never
/// send it and packet transports prepend it themselves.
pub const CANONICAL_PREFIX: u8 = 0xAA;

/// Protocol version advertised alongside [`CANONICAL_PREFIX`].
pub const PROTOCOL_VERSION: u16 = 1;

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 128.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────────┬──────────────┬──────────────────┬────────────────────┐
/// │ Length    │ CRC-8 of the │ Payload          │ CRC-16 over length │
/// │ (1B)      │ length (1B)  │ (Length bytes)   │ + payload (2B LE)  │
/// └───────────┴──────────────┴──────────────────┴────────────────────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_FRAME_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_FRAME_PAYLOAD,
        });
    }

    let len = payload.len() as u8;
    dst.reserve(HEADER_SIZE + payload.len() + TRAILER_SIZE);
    dst.put_u8(len);
    dst.put_u8(crc8(CRC8_INIT, &[len]));
    dst.put_slice(payload);
    dst.put_u16_le(crc16(crc16(CRC16_INIT, &[len]), payload));
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
///
/// Checksum mismatches consume the minimum needed to resynchronize before
/// returning the error: one byte for a bad header (parsing re-attempts at
/// the next byte boundary), the whole frame for a bad trailer. Either way
/// the buffer stays valid and decoding may continue.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Bytes>> {
    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    let len_byte = src[0];
    let expected = crc8(CRC8_INIT, &[len_byte]);
    let found = src[1];
    if expected != found {
        src.advance(1);
        return Err(FrameError::HeaderCrc { expected, found });
    }

    let payload_len = len_byte as usize;
    if payload_len > max_payload {
        // The length passed its checksum but exceeds what we can buffer.
        // Treat like a desynchronized header rather than waiting on a frame
        // we would refuse anyway.
        src.advance(1);
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + payload_len + TRAILER_SIZE;
    if src.len() < total {
        return Ok(None); // Need more data
    }

    let expected = crc16(
        crc16(CRC16_INIT, &[len_byte]),
        &src[HEADER_SIZE..HEADER_SIZE + payload_len],
    );
    let found = u16::from_le_bytes([src[total - 2], src[total - 1]]);
    if expected != found {
        src.advance(total);
        return Err(FrameError::TrailerCrc { expected, found });
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();
    src.advance(TRAILER_SIZE);

    Ok(Some(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire_for(payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_frame(payload, &mut buf).unwrap();
        buf
    }

    #[test]
    fn encode_decode_roundtrip() {
        let payload = b"endpoint operation bytes";
        let mut buf = wire_for(payload);

        assert_eq!(buf.len(), HEADER_SIZE + payload.len() + TRAILER_SIZE);

        let decoded = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!(decoded.as_ref(), payload);
        assert!(buf.is_empty());
    }

    #[test]
    fn roundtrip_all_lengths_up_to_mtu() {
        for len in 0..=127usize {
            let payload: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let mut buf = wire_for(&payload);
            let decoded = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
            assert_eq!(decoded.as_ref(), payload.as_slice(), "length {len}");
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn incomplete_header_needs_more_data() {
        let mut buf = BytesMut::from(&[0x05][..]);
        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn incomplete_payload_needs_more_data() {
        let mut buf = wire_for(b"hello");
        buf.truncate(HEADER_SIZE + 2);
        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
    }

    #[test]
    fn header_crc_mismatch_consumes_one_byte() {
        let mut buf = wire_for(b"x");
        buf[1] ^= 0x01; // corrupt the header checksum
        let before = buf.len();

        let err = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap_err();
        assert!(matches!(err, FrameError::HeaderCrc { .. }));
        assert!(err.is_recoverable());
        assert_eq!(buf.len(), before - 1);
    }

    #[test]
    fn trailer_crc_mismatch_discards_exactly_one_frame() {
        let mut buf = wire_for(b"corrupted");
        buf[HEADER_SIZE] ^= 0x80; // flip a payload bit
        encode_frame(b"survivor", &mut buf).unwrap();

        let err = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap_err();
        assert!(matches!(err, FrameError::TrailerCrc { .. }));
        assert!(err.is_recoverable());

        let next = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!(next.as_ref(), b"survivor");
        assert!(buf.is_empty());
    }

    #[test]
    fn every_single_bit_flip_is_detected() {
        let reference = wire_for(&[0x01, 0x02, 0x03, 0x04]);
        for byte in 0..reference.len() {
            for bit in 0..8 {
                let mut corrupted = BytesMut::from(reference.as_ref());
                corrupted[byte] ^= 1 << bit;
                let result = decode_frame(&mut corrupted, DEFAULT_MAX_PAYLOAD);
                assert!(result.is_err(), "flip byte {byte} bit {bit} went undetected");
            }
        }
    }

    #[test]
    fn oversized_length_is_rejected_and_resynced() {
        let len = 200u8;
        let mut buf = BytesMut::new();
        buf.put_u8(len);
        buf.put_u8(crate::crc::crc8(crate::crc::CRC8_INIT, &[len]));
        let before = buf.len();

        let err = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadTooLarge { size: 200, max: DEFAULT_MAX_PAYLOAD }
        ));
        assert_eq!(buf.len(), before - 1);
    }

    #[test]
    fn encode_rejects_payload_beyond_length_field() {
        let payload = vec![0u8; MAX_FRAME_PAYLOAD + 1];
        let mut buf = BytesMut::new();
        let err = encode_frame(&payload, &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(buf.is_empty());
    }

    #[test]
    fn multiple_frames_decode_in_order() {
        let mut buf = BytesMut::new();
        encode_frame(b"first", &mut buf).unwrap();
        encode_frame(b"second", &mut buf).unwrap();
        encode_frame(b"", &mut buf).unwrap();

        let f1 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        let f2 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        let f3 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();

        assert_eq!(f1.as_ref(), b"first");
        assert_eq!(f2.as_ref(), b"second");
        assert!(f3.is_empty());
        assert!(buf.is_empty());
    }
}
