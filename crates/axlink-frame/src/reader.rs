use axlink_transport::StreamSource;
use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::codec::{decode_frame, FrameConfig, HEADER_SIZE, TRAILER_SIZE};
use crate::error::Result;

const READ_CHUNK_SIZE: usize = 256;

/// De-frames an inbound byte stream back into validated payloads.
///
/// Handles partial reads internally — callers always get complete,
/// checksum-verified payloads. Checksum failures surface as recoverable
/// errors (see [`FrameError::is_recoverable`](crate::FrameError::is_recoverable));
/// the unwrapper has already resynchronized, so the caller may simply call
/// [`read_packet`](Self::read_packet) again.
pub struct PacketUnwrapper<S> {
    source: S,
    buf: BytesMut,
    config: FrameConfig,
}

impl<S: StreamSource> PacketUnwrapper<S> {
    /// Create a packet unwrapper with default configuration.
    pub fn new(source: S) -> Self {
        Self::with_config(source, FrameConfig::default())
    }

    /// Create a packet unwrapper with explicit configuration.
    pub fn with_config(source: S, config: FrameConfig) -> Self {
        let capacity = HEADER_SIZE + config.max_payload_size + TRAILER_SIZE;
        Self {
            source,
            buf: BytesMut::with_capacity(capacity.max(READ_CHUNK_SIZE)),
            config,
        }
    }

    /// Read the next validated payload.
    ///
    /// Returns [`FrameError::ConnectionClosed`](crate::FrameError::ConnectionClosed)
    /// once the source reports end of stream.
    pub async fn read_packet(&mut self) -> Result<Bytes> {
        loop {
            if let Some(payload) = decode_frame(&mut self.buf, self.config.max_payload_size)? {
                trace!(len = payload.len(), "read packet");
                return Ok(payload);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = self.source.read(&mut chunk).await?;
            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &S {
        &self.source
    }

    /// Consume the unwrapper and return the inner source.
    pub fn into_inner(self) -> S {
        self.source
    }

    /// Current unwrapper configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
