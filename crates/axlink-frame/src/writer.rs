use axlink_transport::StreamSink;
use tracing::trace;

use crate::codec::{FrameConfig, MAX_FRAME_PAYLOAD};
use crate::crc::{crc16, crc8, CRC16_INIT, CRC8_INIT};
use crate::error::{FrameError, Result};

/// Frames outbound payloads and writes them through a stream sink.
///
/// Each packet goes out as three strictly sequential sink transfers: header,
/// payload, trailer. No two segments are ever in flight at once, so the
/// wrapper itself satisfies the single-outstanding-write contract of
/// [`StreamSink`] towards its caller.
pub struct PacketWrapper<S> {
    sink: S,
    config: FrameConfig,
}

impl<S: StreamSink> PacketWrapper<S> {
    /// Create a packet wrapper with default configuration.
    pub fn new(sink: S) -> Self {
        Self::with_config(sink, FrameConfig::default())
    }

    /// Create a packet wrapper with explicit configuration.
    pub fn with_config(sink: S, config: FrameConfig) -> Self {
        Self { sink, config }
    }

    /// Frame `payload` and write it out.
    ///
    /// Resolves once the trailer transfer completes, covering the whole
    /// logical write. Dropping the returned future between segments leaves
    /// the peer mid-frame; callers that cancel should tear down the
    /// connection, which is what the protocol layer does.
    pub async fn write_packet(&mut self, payload: &[u8]) -> Result<()> {
        let max = self.config.max_payload_size.min(MAX_FRAME_PAYLOAD);
        if payload.len() > max {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max,
            });
        }

        let len = payload.len() as u8;
        let header = [len, crc8(CRC8_INIT, &[len])];
        let trailer = crc16(crc16(CRC16_INIT, &[len]), payload).to_le_bytes();

        self.sink.write_all(&header).await?;
        self.sink.write_all(payload).await?;
        self.sink.write_all(&trailer).await?;

        trace!(len = payload.len(), "wrote packet");
        Ok(())
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &S {
        &self.sink
    }

    /// Consume the wrapper and return the inner sink.
    pub fn into_inner(self) -> S {
        self.sink
    }

    /// Current wrapper configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
