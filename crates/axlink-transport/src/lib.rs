//! Asynchronous single-shot stream contracts for motor-controller links.
//!
//! Defines the read/write interface every transport and every protocol layer
//! implements: one outstanding transfer per direction, exactly-once
//! completion, advisory cancellation. Concrete transports (UART DMA ring
//! buffers, USB bulk endpoints) live with their driver crates and plug in
//! through the [`io`] adapters; the [`mem`] module provides an in-process
//! link for tests and loopback wiring.
//!
//! This is the lowest layer of axlink. Everything else builds on top of the
//! [`StreamSource`] and [`StreamSink`] traits defined here.

pub mod error;
pub mod io;
pub mod mem;
pub mod traits;

pub use error::{Result, TransportError};
pub use mem::{memory_pair, MemoryEndpoint, MemorySink, MemorySource};
pub use traits::{StreamSink, StreamSource};
