//! Serial link transmit task
//!
//! Frames and sends every message queued in the outbox.

use defmt::*;
use embassy_rp::uart::BufferedUartTx;
use embedded_io_async::Write;

use turret_protocol::MAX_FRAME_SIZE;

use crate::channels::OUTBOX;

/// Link TX task - sends status, replies and notifications
#[embassy_executor::task]
pub async fn link_tx_task(mut tx: BufferedUartTx) {
    info!("Link TX task started");

    let mut buf = [0u8; MAX_FRAME_SIZE];

    loop {
        let message = OUTBOX.receive().await;

        let frame = match message.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode message: {:?}", e);
                continue;
            }
        };

        match frame.encode(&mut buf) {
            Ok(len) => {
                if let Err(e) = tx.write_all(&buf[..len]).await {
                    warn!("UART write error: {:?}", e);
                } else {
                    trace!("TX: kind {:#x}, {} bytes", frame.kind, len);
                }
            }
            Err(e) => error!("Failed to frame message: {:?}", e),
        }
    }
}
