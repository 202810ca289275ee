//! Turret link protocol
//!
//! This crate defines the serial protocol between a host commander (the
//! bridge relaying joystick and UI input) and the turret controller.
//!
//! # Protocol Overview
//!
//! All messages use a simple binary frame format:
//! ```text
//! ┌───────┬────────┬──────┬─────────────┬──────────┐
//! │ START │ LENGTH │ KIND │ PAYLOAD     │ CHECKSUM │
//! │ 1B    │ 1B     │ 1B   │ 0–250B      │ 1B       │
//! └───────┴────────┴──────┴─────────────┴──────────┘
//! ```
//!
//! Payloads are postcard-encoded message bodies. The first frame from a
//! host marks the commander as connected; a `Disconnect` frame or a long
//! silence marks it gone.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod frame;
pub mod messages;

pub use frame::{Frame, FrameError, FrameParser, FRAME_START, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
pub use messages::{
    AngleRequest, Angles, AxisSelect, Command, ErrorCode, ErrorEntry, FireMode, HostMessage,
    ModeTag, Positions, SensorFlags, Status, TurretMessage,
};
