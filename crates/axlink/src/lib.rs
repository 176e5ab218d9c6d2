//! Umbrella crate for the axlink protocol stack.
//!
//! Re-exports the layered crates under stable module names so that
//! applications depend on a single crate:
//!
//! - [`transport`]: the byte stream contract and in-memory links
//! - [`frame`]: CRC-protected packet framing over a byte stream
//! - [`proto`]: the endpoint operation protocol and its multiplexer
//!
//! A device link is typically assembled bottom-up: obtain a pair of
//! stream halves from the transport layer, hand them to
//! [`proto::StreamProtocol`], and start the connection to get an
//! [`proto::EndpointClient`] for issuing endpoint operations.

/// Byte stream sources and sinks.
pub mod transport {
    pub use axlink_transport::*;
}

/// Packet framing with CRC8 header and CRC16 trailer protection.
pub mod frame {
    pub use axlink_frame::*;
}

/// Endpoint operations multiplexed over a framed stream.
pub mod proto {
    pub use axlink_proto::*;
}
