/// Errors that can occur on a link transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// An I/O error was reported by the underlying byte stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport was closed, either by orderly shutdown or because the
    /// peer went away.
    #[error("transport closed")]
    Closed,

    /// The transfer was cancelled before the transport confirmed completion.
    ///
    /// Cancellation is advisory: a transfer that raced ahead of the cancel
    /// request still completes with its real outcome.
    #[error("transfer cancelled")]
    Cancelled,
}

impl TransportError {
    /// Returns true if this error means the stream is gone for good and no
    /// further transfers may be started on it.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransportError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_terminal() {
        let err = TransportError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(err.is_terminal());
        assert!(TransportError::Closed.is_terminal());
        assert!(!TransportError::Cancelled.is_terminal());
    }

    #[test]
    fn display_is_stable() {
        assert_eq!(TransportError::Closed.to_string(), "transport closed");
        assert_eq!(TransportError::Cancelled.to_string(), "transfer cancelled");
    }
}
