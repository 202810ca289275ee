//! Message types carried over the turret link
//!
//! Message kinds are divided into two directions:
//! - Host → Turret: commands, heartbeat pings, graceful disconnect
//! - Turret → Host: status snapshots, movement notifications, heartbeat replies
//!
//! Bodies are postcard-encoded. Field names serialize in camelCase so a
//! bridge to a JSON client can map them one-to-one.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::frame::{Frame, FrameError, MAX_PAYLOAD_SIZE};

// Message kinds: Host → Turret
pub const MSG_COMMAND: u8 = 0x01;
pub const MSG_PING: u8 = 0x02;
pub const MSG_DISCONNECT: u8 = 0x03;

// Message kinds: Turret → Host
pub const MSG_STATUS: u8 = 0x20;
pub const MSG_MOVEMENT_COMPLETE: u8 = 0x21;
pub const MSG_CURRENT_ANGLES: u8 = 0x22;
pub const MSG_PONG: u8 = 0x24;

/// Number of recent errors carried in a status snapshot
pub const MAX_ERROR_ENTRIES: usize = 8;

/// Trigger request mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "lowercase")]
pub enum FireMode {
    /// One pull/return cycle
    Single,
    /// Fixed-count burst
    Burst,
}

/// Axis selector for single-axis calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "lowercase")]
pub enum AxisSelect {
    Yaw,
    Tilt,
}

/// Angle request; a missing component leaves that axis out of the move
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct AngleRequest {
    /// Yaw angle in degrees
    pub horizontal: Option<f32>,
    /// Tilt angle in degrees
    pub vertical: Option<f32>,
}

/// Command from the host
///
/// Every field is optional and independent; several may arrive together.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default, rename_all = "camelCase")]
pub struct Command {
    /// Joystick yaw axis in [-1, 1]
    pub x: Option<f32>,
    /// Joystick tilt axis in [-1, 1]
    pub y: Option<f32>,
    /// Run full calibration
    pub calibrate: Option<bool>,
    /// Re-run calibration for a single axis
    pub calibrate_axis: Option<AxisSelect>,
    /// Home (full calibration when uncalibrated, else rehome yaw and recenter tilt)
    pub home: Option<bool>,
    /// Trigger request
    pub fire: Option<FireMode>,
    /// Absolute angular move
    pub move_to_angle: Option<AngleRequest>,
    /// Relative angular move
    pub move_by_angle: Option<AngleRequest>,
    /// Absolute move to (0°, 0°)
    pub move_to_center: Option<bool>,
    /// Abort the active angular move
    pub cancel_angular_movement: Option<bool>,
    /// Request an immediate angles reply
    pub get_current_angles: Option<bool>,
}

/// Current turret angles in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Angles {
    /// Yaw in [0, 360)
    pub horizontal: f32,
    /// Tilt relative to the calibrated center
    pub vertical: f32,
}

/// Raw actuator positions in native units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Positions {
    pub yaw: i64,
    pub tilt: i64,
}

/// Home and limit sensor readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "camelCase")]
pub struct SensorFlags {
    pub yaw_home: bool,
    pub tilt_up: bool,
    pub tilt_down: bool,
}

/// Reported motion mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "camelCase")]
pub enum ModeTag {
    #[default]
    Jogging,
    AngularMove,
    Calibrating,
}

/// Reasons a command was refused or an operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    /// Command refused while calibration runs
    CalibrationInProgress,
    /// Angular command on an uncalibrated axis
    NotCalibrated,
    /// Target lies outside the calibrated soft limits
    TargetOutOfLimits,
    /// Fire request while the trigger is not idle
    TriggerBusy,
    /// Burst request while a burst is running
    BurstActive,
    /// Frame or payload could not be decoded
    MalformedMessage,
    /// Non-finite joystick or angle value
    InvalidValue,
    /// Yaw home sensor not found during calibration
    YawHomeNotFound,
    /// Tilt limit switch not found during calibration
    TiltLimitNotFound,
    /// Tilt did not reach its center after the limit sweep
    TiltCenterTimeout,
    /// Angular move did not reach its target in time
    AngularMoveTimeout,
}

impl ErrorCode {
    /// Human readable message for the host's error log
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::CalibrationInProgress => "calibration in progress",
            ErrorCode::NotCalibrated => "not calibrated",
            ErrorCode::TargetOutOfLimits => "target outside limits",
            ErrorCode::TriggerBusy => "trigger busy",
            ErrorCode::BurstActive => "burst already active",
            ErrorCode::MalformedMessage => "malformed message",
            ErrorCode::InvalidValue => "invalid value",
            ErrorCode::YawHomeNotFound => "yaw home sensor not found",
            ErrorCode::TiltLimitNotFound => "tilt limit not found",
            ErrorCode::TiltCenterTimeout => "tilt center not reached",
            ErrorCode::AngularMoveTimeout => "angular move timed out",
        }
    }
}

/// One entry in the error ring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    pub code: ErrorCode,
    /// Controller uptime when the error was recorded
    pub at_ms: u64,
}

/// Status snapshot pushed periodically and on significant events
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "camelCase")]
pub struct Status {
    /// Both axes calibrated
    pub calibrated: bool,
    pub calibrating: bool,
    pub yaw_homed: bool,
    pub tilt_calibrated: bool,
    pub angles: Angles,
    pub positions: Positions,
    pub mode: ModeTag,
    pub sensors: SensorFlags,
    /// Trigger is pulled, returning, or a burst is running
    pub trigger_active: bool,
    pub burst_active: bool,
    /// Safety stop engaged because input is stale or no commander is connected
    pub input_stale: bool,
    pub client_connected: bool,
    /// Calibrated tilt limits (down, up) in native units
    pub tilt_limits: Option<(i64, i64)>,
    /// Most recent errors, oldest first
    pub errors: Vec<ErrorEntry, MAX_ERROR_ENTRIES>,
}

/// Messages from the host to the turret
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostMessage {
    Command(Command),
    Ping,
    Disconnect,
}

impl HostMessage {
    /// Parse a host message from a frame
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        match frame.kind {
            MSG_COMMAND => decode(&frame.payload).map(HostMessage::Command),
            MSG_PING => Ok(HostMessage::Ping),
            MSG_DISCONNECT => Ok(HostMessage::Disconnect),
            other => Err(FrameError::UnknownKind(other)),
        }
    }

    /// Encode this message into a frame (host side and tests)
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        match self {
            HostMessage::Command(cmd) => encode(MSG_COMMAND, cmd),
            HostMessage::Ping => Ok(Frame::empty(MSG_PING)),
            HostMessage::Disconnect => Ok(Frame::empty(MSG_DISCONNECT)),
        }
    }
}

/// Messages from the turret to the host
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TurretMessage {
    Status(Status),
    MovementComplete(Angles),
    CurrentAngles(Angles),
    Pong,
}

impl TurretMessage {
    /// Encode this message into a frame
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        match self {
            TurretMessage::Status(status) => encode(MSG_STATUS, status),
            TurretMessage::MovementComplete(angles) => encode(MSG_MOVEMENT_COMPLETE, angles),
            TurretMessage::CurrentAngles(angles) => encode(MSG_CURRENT_ANGLES, angles),
            TurretMessage::Pong => Ok(Frame::empty(MSG_PONG)),
        }
    }

    /// Parse a turret message from a frame (host side and tests)
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        match frame.kind {
            MSG_STATUS => decode(&frame.payload).map(TurretMessage::Status),
            MSG_MOVEMENT_COMPLETE => decode(&frame.payload).map(TurretMessage::MovementComplete),
            MSG_CURRENT_ANGLES => decode(&frame.payload).map(TurretMessage::CurrentAngles),
            MSG_PONG => Ok(TurretMessage::Pong),
            other => Err(FrameError::UnknownKind(other)),
        }
    }
}

fn encode<T: Serialize>(kind: u8, body: &T) -> Result<Frame, FrameError> {
    let mut buf = [0u8; MAX_PAYLOAD_SIZE];
    let used = postcard::to_slice(body, &mut buf).map_err(|_| FrameError::PayloadTooLarge)?;
    Frame::new(kind, used)
}

fn decode<'a, T: Deserialize<'a>>(payload: &'a [u8]) -> Result<T, FrameError> {
    postcard::from_bytes(payload).map_err(|_| FrameError::Malformed)
}
