//! Serial link receive task
//!
//! Parses frames from the host commander and turns them into link events.
//! The first valid frame after silence is a connect; a `Disconnect` frame or
//! `link_timeout_ms` without a valid frame is a disconnect.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embassy_time::{with_timeout, Duration, Instant};
use embedded_io_async::Read;

use turret_protocol::{FrameParser, HostMessage, TurretMessage};

use crate::channels::{LinkEvent, LINK_EVENTS, OUTBOX};

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 64;

/// Link RX task - receives and parses frames from the commander
#[embassy_executor::task]
pub async fn link_rx_task(mut rx: BufferedUartRx, link_timeout_ms: u32) {
    info!("Link RX task started");

    let timeout = Duration::from_millis(link_timeout_ms as u64);
    let mut parser = FrameParser::new();
    let mut buf = [0u8; RX_BUF_SIZE];
    let mut connected = false;
    let mut last_frame = Instant::now();

    loop {
        let n = match with_timeout(timeout, rx.read(&mut buf)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                warn!("UART read error: {:?}", e);
                0
            }
            // No bytes at all within the timeout
            Err(_) => 0,
        };
        trace!("RX: {} bytes", n);

        for &byte in &buf[..n] {
            match parser.feed(byte) {
                Ok(Some(frame)) => {
                    last_frame = Instant::now();
                    match HostMessage::from_frame(&frame) {
                        Ok(message) => handle_message(message, &mut connected).await,
                        Err(e) => {
                            warn!("Failed to decode host message: {:?}", e);
                            send_event(LinkEvent::Malformed).await;
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Frame parse error: {:?}", e);
                    send_event(LinkEvent::Malformed).await;
                }
            }
        }

        // Noise alone does not keep the link alive
        if connected && last_frame.elapsed() > timeout {
            info!("Link silent for {}ms", link_timeout_ms);
            connected = false;
            parser.reset();
            send_event(LinkEvent::Disconnected).await;
        }
    }
}

async fn handle_message(message: HostMessage, connected: &mut bool) {
    if !*connected && message != HostMessage::Disconnect {
        *connected = true;
        send_event(LinkEvent::Connected).await;
    }

    match message {
        HostMessage::Ping => {
            trace!("PING received");
            if OUTBOX.try_send(TurretMessage::Pong).is_err() {
                warn!("Outbox full, dropping PONG");
            }
        }
        HostMessage::Disconnect => {
            if *connected {
                *connected = false;
                send_event(LinkEvent::Disconnected).await;
            }
        }
        HostMessage::Command(command) => {
            debug!("Command: {:?}", command);
            send_event(LinkEvent::Command(command)).await;
        }
    }
}

/// Queue an event for the control task, waiting if it is behind
async fn send_event(event: LinkEvent) {
    LINK_EVENTS.send(event).await;
}
