//! Sequence-numbered endpoint multiplexing over framed packet links.
//!
//! Turns logical endpoint read/write requests into framed packets and
//! matches inbound packets back to the operation awaiting them, keyed by a
//! wrapping 16-bit sequence number. Any number of operations may await
//! their acknowledgment concurrently; exactly one frame is in flight on the
//! transmit side with one more queued behind it.
//!
//! There is no retransmission and no timeout in this layer: corruption is
//! detected and dropped by the framing beneath, and a caller wanting a
//! deadline races its own timer against the operation and cancels on
//! expiry.

pub mod error;
pub mod stream;

#[cfg(feature = "client")]
pub mod mux;
#[cfg(feature = "client")]
pub mod operation;

pub use error::{ProtocolError, Result};
pub use stream::{
    CloseReason, ProtocolConfig, ProtocolHandle, StreamProtocol, DEFAULT_MTU, MIN_MTU,
    RX_BUFFER_SIZE,
};

#[cfg(feature = "client")]
pub use mux::{EndpointClient, OPERATION_HEADER, TX_BUFFER_SIZE};
#[cfg(feature = "client")]
pub use operation::{OperationHandle, PendingCall};
