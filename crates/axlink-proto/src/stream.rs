//! Composition root: one packet unwrapper on the raw source, one packet
//! wrapper on the raw sink, and the endpoint multiplexer between them.

use axlink_frame::{FrameConfig, FrameError, PacketUnwrapper, PacketWrapper};
use axlink_transport::{StreamSink, StreamSource};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[cfg(feature = "client")]
use std::sync::Arc;

#[cfg(feature = "client")]
use crate::mux::{EndpointClient, MuxShared};

/// Default maximum transmission unit: the largest frame payload this
/// protocol will emit. One less than the transmit buffer so the peer's
/// receive buffer always has headroom for the frame it is committing to.
pub const DEFAULT_MTU: usize = 127;

/// Smallest accepted MTU: a frame payload must at least hold the
/// multiplexer's operation header (seqno + endpoint id).
pub const MIN_MTU: usize = 4;

/// Size of the receive buffer: the largest inbound frame payload accepted.
pub const RX_BUFFER_SIZE: usize = 128;

/// Why a connection stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The transport reported an orderly close.
    Closed,
    /// The transport failed.
    Error,
    /// [`ProtocolHandle::stop`] was called locally.
    Stopped,
}

impl CloseReason {
    pub(crate) fn from_frame_error(err: &FrameError) -> Self {
        match err {
            FrameError::ConnectionClosed => CloseReason::Closed,
            _ => CloseReason::Error,
        }
    }
}

/// Configuration for a stream-based protocol instance.
#[derive(Debug, Clone)]
pub struct ProtocolConfig {
    /// Maximum outbound frame payload. Default: 127; clamped into
    /// [`MIN_MTU`]`..=`[`RX_BUFFER_SIZE`]` - 1` when the protocol is built.
    pub mtu: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self { mtu: DEFAULT_MTU }
    }
}

/// Lifecycle handle for a running connection.
pub struct ProtocolHandle {
    cancel: CancellationToken,
    stopped: oneshot::Receiver<CloseReason>,
}

impl ProtocolHandle {
    /// Request teardown of the connection.
    ///
    /// Asynchronous: any in-flight transfer is cancelled (advisory), every
    /// outstanding operation fails with closed, and the stopped
    /// notification fires exactly once. Await [`stopped`](Self::stopped)
    /// to observe completion.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Await the single stopped notification and its closing status.
    pub async fn stopped(self) -> CloseReason {
        self.stopped.await.unwrap_or(CloseReason::Error)
    }
}

/// A framed packet protocol over one raw duplex byte stream.
///
/// Owns the framing both ways; outer code only sees the lifecycle and (with
/// the `client` feature) the endpoint operation API.
pub struct StreamProtocol<Src, Snk> {
    unwrapper: PacketUnwrapper<Src>,
    wrapper: PacketWrapper<Snk>,
    #[cfg_attr(not(feature = "client"), allow(dead_code))]
    config: ProtocolConfig,
}

impl<Src, Snk> StreamProtocol<Src, Snk>
where
    Src: StreamSource + Send + 'static,
    Snk: StreamSink + Send + 'static,
{
    /// Wrap a raw source/sink pair with the default MTU.
    pub fn new(source: Src, sink: Snk) -> Self {
        Self::with_config(source, sink, ProtocolConfig::default())
    }

    /// Wrap a raw source/sink pair with explicit configuration.
    ///
    /// The MTU is clamped into `MIN_MTU..=RX_BUFFER_SIZE - 1`.
    pub fn with_config(source: Src, sink: Snk, mut config: ProtocolConfig) -> Self {
        config.mtu = config.mtu.clamp(MIN_MTU, RX_BUFFER_SIZE - 1);
        let rx_config = FrameConfig {
            max_payload_size: RX_BUFFER_SIZE,
        };
        let tx_config = FrameConfig {
            max_payload_size: config.mtu,
        };
        Self {
            unwrapper: PacketUnwrapper::with_config(source, rx_config),
            wrapper: PacketWrapper::with_config(sink, tx_config),
            config,
        }
    }

    /// Start the connection: arm the continuous read pump and the transmit
    /// worker, and hand out the endpoint client plus the lifecycle handle.
    #[cfg(feature = "client")]
    pub fn start(self) -> (EndpointClient, ProtocolHandle) {
        let cancel = CancellationToken::new();
        let (stopped_tx, stopped_rx) = oneshot::channel();
        let shared = Arc::new(MuxShared::new());
        // One slot: one operation queued behind the in-flight write.
        let (op_tx, op_rx) = tokio::sync::mpsc::channel(1);

        let client = EndpointClient::new(Arc::clone(&shared), op_tx, self.config.mtu);

        let conn_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut unwrapper = self.unwrapper;
            // Leaving this scope drops both loops, cancelling any in-flight
            // transfer (advisory, per the stream contract).
            let reason = {
                let rx = rx_loop(&mut unwrapper, |payload| shared.dispatch(payload));
                let tx = crate::mux::tx_loop(self.wrapper, Arc::clone(&shared), op_rx);
                tokio::pin!(rx, tx);

                tokio::select! {
                    _ = conn_cancel.cancelled() => CloseReason::Stopped,
                    reason = &mut rx => reason,
                    reason = &mut tx => reason,
                }
            };

            let failed = shared.close_all();
            debug!(?reason, failed, "connection stopped");
            let _ = stopped_tx.send(reason);
        });

        (
            client,
            ProtocolHandle {
                cancel,
                stopped: stopped_rx,
            },
        )
    }

    /// Start the connection without the endpoint-client subsystem: inbound
    /// frames are validated and discarded, the sink stays idle.
    #[cfg(not(feature = "client"))]
    pub fn start(self) -> ProtocolHandle {
        let cancel = CancellationToken::new();
        let (stopped_tx, stopped_rx) = oneshot::channel();

        let conn_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut unwrapper = self.unwrapper;
            let _wrapper = self.wrapper;
            let rx = rx_loop(&mut unwrapper, |payload| {
                debug!(len = payload.len(), "validated packet discarded (no client)");
            });
            tokio::pin!(rx);

            let reason = tokio::select! {
                _ = conn_cancel.cancelled() => CloseReason::Stopped,
                reason = &mut rx => reason,
            };
            debug!(?reason, "connection stopped");
            let _ = stopped_tx.send(reason);
        });

        ProtocolHandle {
            cancel,
            stopped: stopped_rx,
        }
    }
}

/// Continuous read pump: one read request always outstanding, re-armed
/// immediately after each delivered payload. Framing errors drop the
/// offending frame and keep the connection up; transport errors end the
/// loop with the close reason.
async fn rx_loop<Src: StreamSource>(
    unwrapper: &mut PacketUnwrapper<Src>,
    mut on_packet: impl FnMut(bytes::Bytes),
) -> CloseReason {
    loop {
        match unwrapper.read_packet().await {
            Ok(payload) => on_packet(payload),
            Err(err) if err.is_recoverable() => {
                warn!(%err, "dropped corrupt frame, resynchronizing");
            }
            Err(err) => {
                let reason = CloseReason::from_frame_error(&err);
                debug!(%err, "read channel ended");
                return reason;
            }
        }
    }
}
