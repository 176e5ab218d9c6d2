//! In-process loopback — a client and a scripted device on the two ends of
//! one memory link.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example loopback
//!
//! Endpoint 1 answers with a fixed identity string; every other endpoint
//! echoes the request bytes back.

use axlink::frame::{PacketUnwrapper, PacketWrapper};
use axlink::proto::StreamProtocol;
use axlink::transport::memory_pair;
use bytes::BufMut;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let ((client_rx, client_tx), (device_rx, device_tx)) = memory_pair(4096);

    // Scripted device end: unwrap each operation, answer on the same seqno.
    let device = tokio::spawn(async move {
        let mut unwrapper = PacketUnwrapper::new(device_rx);
        let mut wrapper = PacketWrapper::new(device_tx);
        while let Ok(packet) = unwrapper.read_packet().await {
            if packet.len() < 4 {
                continue;
            }
            let seqno = u16::from_le_bytes([packet[0], packet[1]]);
            let endpoint_id = u16::from_le_bytes([packet[2], packet[3]]);

            let mut response = bytes::BytesMut::new();
            response.put_u16_le(seqno);
            match endpoint_id {
                1 => response.put_slice(b"axlink demo device"),
                _ => response.put_slice(&packet[4..]),
            }
            if wrapper.write_packet(&response).await.is_err() {
                break;
            }
        }
    });

    let (client, handle) = StreamProtocol::new(client_rx, client_tx).start();

    let identity = client.call(1, &[]).await?;
    eprintln!("device identity: {}", String::from_utf8_lossy(&identity));

    let echoed = client.call(7, b"motor.vel = 2.0").await?;
    eprintln!("endpoint 7 echoed {} bytes", echoed.len());

    client.notify(9, b"clear errors").await?;
    eprintln!("endpoint 9 notified (no acknowledgment expected)");

    handle.stop();
    let reason = handle.stopped().await;
    eprintln!("connection stopped: {reason:?}");

    device.await?;
    Ok(())
}
