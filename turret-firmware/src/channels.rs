//! Inter-task communication channels
//!
//! The link tasks and the control task never share state directly: inbound
//! traffic becomes [`LinkEvent`]s, outbound traffic is queued as protocol
//! messages. Sensor flags are the only shared cells.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use turret_core::SensorState;
use turret_protocol::{Command, TurretMessage};

/// Inbound events queued between control ticks
const LINK_EVENT_CHANNEL_SIZE: usize = 8;

/// Outbound messages waiting for the UART
const OUTBOX_SIZE: usize = 4;

/// What the receive side of the link saw
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    /// First valid frame after silence
    Connected,
    /// Explicit disconnect or link timeout
    Disconnected,
    /// A frame or payload that could not be decoded
    Malformed,
    Command(Command),
}

/// Debounced home and limit inputs, written only by the sensor task
pub static SENSORS: SensorState = SensorState::new();

/// Link receive task -> control task
pub static LINK_EVENTS: Channel<CriticalSectionRawMutex, LinkEvent, LINK_EVENT_CHANNEL_SIZE> =
    Channel::new();

/// Any task -> link transmit task
pub static OUTBOX: Channel<CriticalSectionRawMutex, TurretMessage, OUTBOX_SIZE> = Channel::new();
