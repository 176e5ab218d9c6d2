use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::error::{ProtocolError, Result};
use crate::mux::MuxShared;

/// Single-use completion channel for one endpoint operation.
pub(crate) type Completer = oneshot::Sender<Result<Bytes>>;

/// One logical request against a numbered remote endpoint, queued towards
/// the transmit worker.
///
/// Operations that expect a response park their completer in the
/// awaiting-ack table before transmission; fire-and-forget operations carry
/// it here and complete as soon as the frame is on the wire.
pub(crate) struct Operation {
    pub seqno: u16,
    pub endpoint_id: u16,
    pub request: Bytes,
    pub cancelled: Arc<AtomicBool>,
    pub completer: Option<Completer>,
}

impl Operation {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Cancellation handle for one endpoint operation.
///
/// Cancellation is a request, not a guarantee: an operation whose frame
/// already went out (or whose response already arrived) keeps its real
/// outcome. In every interleaving the operation completes exactly once.
#[derive(Clone)]
pub struct OperationHandle {
    seqno: u16,
    cancelled: Arc<AtomicBool>,
    shared: Weak<MuxShared>,
}

impl OperationHandle {
    pub(crate) fn new(seqno: u16, cancelled: Arc<AtomicBool>, shared: Weak<MuxShared>) -> Self {
        Self {
            seqno,
            cancelled,
            shared,
        }
    }

    /// The sequence number correlating this operation with its response.
    pub fn seqno(&self) -> u16 {
        self.seqno
    }

    /// Request cancellation of this operation.
    ///
    /// A queued operation is dropped before transmission; an operation
    /// already awaiting its acknowledgment is removed from the table and
    /// completed with [`ProtocolError::Cancelled`]. Calling this more than
    /// once is harmless.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(shared) = self.shared.upgrade() {
            if let Some(completer) = shared.take_waiter(self.seqno) {
                let _ = completer.send(Err(ProtocolError::Cancelled));
            }
        }
    }
}

/// An endpoint operation that has been queued and can be awaited.
pub struct PendingCall {
    handle: OperationHandle,
    rx: oneshot::Receiver<Result<Bytes>>,
}

impl PendingCall {
    pub(crate) fn new(handle: OperationHandle, rx: oneshot::Receiver<Result<Bytes>>) -> Self {
        Self { handle, rx }
    }

    /// Cancellation handle for this operation. Cheap to clone; usable from
    /// another task, e.g. the timer arm of a caller-imposed timeout.
    pub fn handle(&self) -> OperationHandle {
        self.handle.clone()
    }

    /// Await the operation's single completion.
    ///
    /// If the connection is torn down with the operation still queued, the
    /// completer is dropped and this resolves to
    /// [`ProtocolError::Closed`].
    pub async fn wait(self) -> Result<Bytes> {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProtocolError::Closed),
        }
    }
}
