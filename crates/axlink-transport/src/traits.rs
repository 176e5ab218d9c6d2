use std::future::Future;

use crate::error::Result;

/// The receiving half of an asynchronous byte link.
///
/// A source allows at most one outstanding read at a time; the `&mut self`
/// receiver enforces this statically. The returned future is the transfer:
/// it resolves exactly once with the number of bytes consumed, and the
/// buffer is not touched after that point. Dropping the future (or racing it
/// against a cancellation token) is the cancellation request — advisory, so
/// a transfer that already finished still reports its real outcome.
pub trait StreamSource {
    /// Start a read transfer into `buf`.
    ///
    /// Resolves with the number of bytes read (at least 1) or
    /// [`TransportError::Closed`](crate::TransportError::Closed) when the
    /// stream has ended.
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize>> + Send;
}

/// The sending half of an asynchronous byte link.
///
/// Same single-outstanding-transfer contract as [`StreamSource`], for the
/// write direction.
pub trait StreamSink {
    /// Start a write transfer covering the whole of `buf`.
    ///
    /// Resolves once every byte has been handed to the transport, or with an
    /// error if the stream failed or closed mid-transfer.
    fn write_all(&mut self, buf: &[u8]) -> impl Future<Output = Result<()>> + Send;
}
