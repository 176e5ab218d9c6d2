//! In-process duplex link.
//!
//! Backed by a bounded byte pipe in each direction. Used by the loopback
//! examples and by tests that script one end of a connection; real deployments
//! hand the protocol a serial port or USB endpoint instead.

use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tracing::debug;

/// Receiving half of an in-process link.
pub type MemorySource = ReadHalf<DuplexStream>;

/// Sending half of an in-process link.
pub type MemorySink = WriteHalf<DuplexStream>;

/// One endpoint of an in-process link, already split into the source/sink
/// pair the protocol layers consume.
pub type MemoryEndpoint = (MemorySource, MemorySink);

/// Create a connected pair of in-process byte links.
///
/// `capacity` bounds the number of bytes buffered per direction; writers
/// stall once the peer stops draining. Dropping both halves of one endpoint
/// closes the link: the peer's source reports
/// [`Closed`](crate::TransportError::Closed) after draining buffered bytes,
/// and its sink starts failing.
pub fn memory_pair(capacity: usize) -> (MemoryEndpoint, MemoryEndpoint) {
    let (a, b) = tokio::io::duplex(capacity);
    debug!(capacity, "created in-process link pair");
    (tokio::io::split(a), tokio::io::split(b))
}
