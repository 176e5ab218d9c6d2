/// Errors that can occur while framing or de-framing packets.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The header checksum did not match the length byte. The unwrapper has
    /// already resynchronized at the next byte boundary; the caller may keep
    /// reading.
    #[error("header CRC mismatch (expected {expected:#04x}, found {found:#04x})")]
    HeaderCrc { expected: u8, found: u8 },

    /// The trailer checksum did not match the frame contents. The offending
    /// frame has been discarded; the caller may keep reading.
    #[error("trailer CRC mismatch (expected {expected:#06x}, found {found:#06x})")]
    TrailerCrc { expected: u16, found: u16 },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(axlink_transport::TransportError),

    /// The transport closed before a complete frame was transferred.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// Returns true if the byte stream is still usable after this error.
    ///
    /// CRC mismatches drop a single frame and resynchronize; transport
    /// failures and closure tear the connection down.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FrameError::HeaderCrc { .. }
                | FrameError::TrailerCrc { .. }
                | FrameError::PayloadTooLarge { .. }
        )
    }
}

impl From<axlink_transport::TransportError> for FrameError {
    fn from(err: axlink_transport::TransportError) -> Self {
        match err {
            axlink_transport::TransportError::Closed => FrameError::ConnectionClosed,
            other => FrameError::Transport(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
