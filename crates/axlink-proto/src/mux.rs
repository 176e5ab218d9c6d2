//! Endpoint multiplexer: sequence-number allocation, the awaiting-ack table
//! and the transmit worker.
//!
//! Many operations may be outstanding at once, each keyed by its unique
//! seqno; at most one frame is mid-transmission and at most one operation is
//! queued behind it (a bounded queue of one slot — further callers are
//! backpressured at `send`).

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axlink_frame::PacketWrapper;
use axlink_transport::StreamSink;
use bytes::{BufMut, Bytes, BytesMut};
use tokio::sync::{mpsc, oneshot};
use tracing::{trace, warn};

use crate::error::{ProtocolError, Result};
use crate::operation::{Completer, Operation, OperationHandle, PendingCall};
use crate::stream::CloseReason;

/// Bytes of multiplexer header inside each frame payload: seqno + endpoint id.
pub const OPERATION_HEADER: usize = 4;

/// Size of the shared transmit buffer. The usable MTU is configured
/// independently and never exceeds this.
pub const TX_BUFFER_SIZE: usize = 128;

pub(crate) struct MuxState {
    next_seqno: u16,
    waiting: HashMap<u16, Completer>,
    closed: bool,
}

/// State shared between the client handles, the transmit worker and the
/// receive pump. One mutex guards seqno allocation, the awaiting-ack table
/// and the closed flag so that completion, cancellation and teardown each
/// observe a consistent snapshot.
pub(crate) struct MuxShared {
    state: Mutex<MuxState>,
}

impl MuxShared {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MuxState {
                next_seqno: 0,
                waiting: HashMap::new(),
                closed: false,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MuxState> {
        // Completers never panic while holding the lock; recover the guard
        // rather than propagating poison.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate the next free sequence number, registering `completer` in
    /// the awaiting-ack table when the operation expects a response.
    ///
    /// Seqnos wrap modulo 2^16 and skip values still owned by outstanding
    /// operations; callers keep concurrency far below 2^16 in-flight
    /// operations.
    pub fn allocate(&self, completer: Option<Completer>) -> Result<u16> {
        let mut state = self.state();
        if state.closed {
            return Err(ProtocolError::Closed);
        }
        let mut seqno = state.next_seqno;
        while state.waiting.contains_key(&seqno) {
            seqno = seqno.wrapping_add(1);
        }
        state.next_seqno = seqno.wrapping_add(1);
        if let Some(completer) = completer {
            state.waiting.insert(seqno, completer);
        }
        Ok(seqno)
    }

    /// Remove and return the completer waiting on `seqno`, if any.
    pub fn take_waiter(&self, seqno: u16) -> Option<Completer> {
        self.state().waiting.remove(&seqno)
    }

    /// Route an inbound validated payload to the operation awaiting it.
    ///
    /// Packets whose seqno has no waiting operation are stale or foreign
    /// replies; they are discarded without escalating.
    pub fn dispatch(&self, payload: Bytes) {
        if payload.len() < 2 {
            warn!(len = payload.len(), "runt packet discarded");
            return;
        }
        let seqno = u16::from_le_bytes([payload[0], payload[1]]);
        match self.take_waiter(seqno) {
            Some(completer) => {
                let _ = completer.send(Ok(payload.slice(2..)));
            }
            None => trace!(seqno, "response without matching operation, discarded"),
        }
    }

    /// Tear down: refuse new operations and fail everything awaiting an
    /// acknowledgment. Idempotent; returns the number of operations failed.
    pub fn close_all(&self) -> usize {
        let drained: Vec<Completer> = {
            let mut state = self.state();
            state.closed = true;
            state.waiting.drain().map(|(_, completer)| completer).collect()
        };
        let failed = drained.len();
        for completer in drained {
            let _ = completer.send(Err(ProtocolError::Closed));
        }
        failed
    }

    #[cfg(test)]
    pub fn waiting_len(&self) -> usize {
        self.state().waiting.len()
    }
}

/// Handle for starting endpoint operations on a running connection.
///
/// Cheap to clone; all clones multiplex onto the same link.
#[derive(Clone)]
pub struct EndpointClient {
    shared: Arc<MuxShared>,
    queue: mpsc::Sender<Operation>,
    mtu: usize,
}

impl EndpointClient {
    pub(crate) fn new(shared: Arc<MuxShared>, queue: mpsc::Sender<Operation>, mtu: usize) -> Self {
        Self { shared, queue, mtu }
    }

    /// Largest request this connection can carry in one operation.
    pub fn max_request_size(&self) -> usize {
        self.mtu - OPERATION_HEADER
    }

    /// Issue a request against `endpoint_id` and await its response.
    pub async fn call(&self, endpoint_id: u16, request: &[u8]) -> Result<Bytes> {
        self.start_call(endpoint_id, request).await?.wait().await
    }

    /// Queue a request against `endpoint_id`, returning the pending
    /// operation for separate awaiting and cancellation.
    ///
    /// Resolves once the operation occupies the queue slot; if the slot is
    /// taken the caller is backpressured here.
    pub async fn start_call(&self, endpoint_id: u16, request: &[u8]) -> Result<PendingCall> {
        self.submit(endpoint_id, request, true).await
    }

    /// Fire-and-forget write against `endpoint_id`: completes once the frame
    /// is on the wire, without ever entering the awaiting-ack table.
    pub async fn notify(&self, endpoint_id: u16, request: &[u8]) -> Result<()> {
        self.submit(endpoint_id, request, false)
            .await?
            .wait()
            .await
            .map(|_| ())
    }

    async fn submit(
        &self,
        endpoint_id: u16,
        request: &[u8],
        expects_response: bool,
    ) -> Result<PendingCall> {
        if request.len() > self.max_request_size() {
            return Err(ProtocolError::RequestTooLarge {
                size: request.len(),
                max: self.max_request_size(),
            });
        }

        let (tx, rx) = oneshot::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let (registered, completer) = if expects_response {
            (Some(tx), None)
        } else {
            (None, Some(tx))
        };
        let seqno = self.shared.allocate(registered)?;

        let op = Operation {
            seqno,
            endpoint_id,
            request: Bytes::copy_from_slice(request),
            cancelled: Arc::clone(&cancelled),
            completer,
        };

        if self.queue.send(op).await.is_err() {
            // Connection tore down between allocation and queuing; reclaim
            // the table entry so the seqno is not leaked.
            let _ = self.shared.take_waiter(seqno);
            return Err(ProtocolError::Closed);
        }

        let handle = OperationHandle::new(seqno, cancelled, Arc::downgrade(&self.shared));
        Ok(PendingCall::new(handle, rx))
    }
}

/// Transmit worker: drains the single-slot queue, serializes each operation
/// into the shared transmit buffer and hands it to the packet wrapper, one
/// frame in flight at a time.
///
/// Returns the close reason once the sink fails terminally; resolves never
/// if the queue side simply goes away, leaving the connection up for the
/// receive pump.
pub(crate) async fn tx_loop<S: StreamSink>(
    mut wrapper: PacketWrapper<S>,
    shared: Arc<MuxShared>,
    mut queue: mpsc::Receiver<Operation>,
) -> CloseReason {
    let mut tx_buf = BytesMut::with_capacity(TX_BUFFER_SIZE);

    loop {
        let Some(op) = queue.recv().await else {
            // All client handles dropped; nothing left to transmit but the
            // connection itself stays up.
            std::future::pending::<()>().await;
            unreachable!()
        };

        if op.is_cancelled() {
            trace!(seqno = op.seqno, "operation cancelled before transmission");
            if let Some(completer) = op.completer {
                let _ = completer.send(Err(ProtocolError::Cancelled));
            }
            continue;
        }

        tx_buf.clear();
        tx_buf.put_u16_le(op.seqno);
        tx_buf.put_u16_le(op.endpoint_id);
        tx_buf.put_slice(&op.request);

        match wrapper.write_packet(&tx_buf).await {
            Ok(()) => {
                trace!(
                    seqno = op.seqno,
                    endpoint_id = op.endpoint_id,
                    "operation transmitted"
                );
                if let Some(completer) = op.completer {
                    let _ = completer.send(Ok(Bytes::new()));
                }
            }
            Err(err) => {
                let terminal = !err.is_recoverable();
                let reason = CloseReason::from_frame_error(&err);
                let outcome = Err(ProtocolError::Frame(err));
                if let Some(completer) = op.completer {
                    let _ = completer.send(outcome);
                } else if let Some(completer) = shared.take_waiter(op.seqno) {
                    let _ = completer.send(outcome);
                }
                if terminal {
                    return reason;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seqnos_are_sequential_and_unique() {
        let shared = MuxShared::new();
        let a = shared.allocate(None).unwrap();
        let b = shared.allocate(None).unwrap();
        assert_eq!(a, 0);
        assert_eq!(b, 1);
    }

    #[test]
    fn allocation_skips_outstanding_seqnos() {
        let shared = MuxShared::new();

        // Occupy seqno 0, then force the counter to wrap back onto it.
        let (tx, _rx) = oneshot::channel();
        let occupied = shared.allocate(Some(tx)).unwrap();
        assert_eq!(occupied, 0);
        shared.state().next_seqno = 0;

        let (tx, _rx) = oneshot::channel();
        let next = shared.allocate(Some(tx)).unwrap();
        assert_eq!(next, 1);
    }

    #[test]
    fn seqno_counter_wraps() {
        let shared = MuxShared::new();
        shared.state().next_seqno = u16::MAX;
        assert_eq!(shared.allocate(None).unwrap(), u16::MAX);
        assert_eq!(shared.allocate(None).unwrap(), 0);
    }

    #[tokio::test]
    async fn dispatch_routes_by_seqno() {
        let shared = MuxShared::new();
        let (tx, rx) = oneshot::channel();
        let seqno = shared.allocate(Some(tx)).unwrap();

        let mut payload = BytesMut::new();
        payload.put_u16_le(seqno);
        payload.put_slice(b"response bytes");
        shared.dispatch(payload.freeze());

        let outcome = rx.await.unwrap().unwrap();
        assert_eq!(outcome.as_ref(), b"response bytes");
        assert_eq!(shared.waiting_len(), 0);
    }

    #[tokio::test]
    async fn unmatched_and_runt_packets_are_discarded() {
        let shared = MuxShared::new();
        let (tx, mut rx) = oneshot::channel();
        let _seqno = shared.allocate(Some(tx)).unwrap();

        let mut foreign = BytesMut::new();
        foreign.put_u16_le(0x4242);
        shared.dispatch(foreign.freeze());
        shared.dispatch(Bytes::from_static(&[0x01]));

        assert!(rx.try_recv().is_err());
        assert_eq!(shared.waiting_len(), 1);
    }

    #[tokio::test]
    async fn close_all_fails_every_waiter_and_refuses_new_ones() {
        let shared = MuxShared::new();
        let mut waiters = Vec::new();
        for _ in 0..3 {
            let (tx, rx) = oneshot::channel();
            shared.allocate(Some(tx)).unwrap();
            waiters.push(rx);
        }

        assert_eq!(shared.close_all(), 3);
        assert_eq!(shared.close_all(), 0); // idempotent

        for rx in waiters {
            let outcome = rx.await.unwrap();
            assert!(matches!(outcome, Err(ProtocolError::Closed)));
        }
        assert!(matches!(
            shared.allocate(None),
            Err(ProtocolError::Closed)
        ));
    }
}
