/// Errors that can occur on endpoint operations and the connection itself.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Framing-level error (checksum mismatch, transport failure, ...).
    #[error("frame error: {0}")]
    Frame(#[from] axlink_frame::FrameError),

    /// The connection was torn down before the operation completed, or the
    /// operation was started on a connection that already stopped.
    #[error("connection closed")]
    Closed,

    /// The operation was cancelled by its caller.
    #[error("operation cancelled")]
    Cancelled,

    /// The request does not fit into a single frame at the configured MTU.
    #[error("request too large ({size} bytes, max {max})")]
    RequestTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
