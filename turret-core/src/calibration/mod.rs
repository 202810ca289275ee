//! Axis calibration and homing
//!
//! Yaw homes by sweeping onto its hall sensor; tilt sweeps between its two
//! limit switches and centers between them. The engine is a phase machine
//! advanced once per control tick, so nothing blocks on motor motion.

pub mod engine;

pub use engine::{CalibrationEngine, CalibrationPhase};

use turret_protocol::ErrorCode;

/// What to do with the yaw axis during a calibration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum YawStep {
    /// Leave yaw and its homing untouched
    Keep,
    /// Search for the home sensor and re-zero
    Home,
}

/// What to do with the tilt axis during a calibration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TiltStep {
    /// Leave tilt and its limits untouched
    Keep,
    /// Find both limits and center between them
    Sweep,
    /// Drive back to the known center using existing limits
    Recenter,
}

/// Steps of one calibration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationPlan {
    pub yaw: YawStep,
    pub tilt: TiltStep,
}

impl CalibrationPlan {
    /// Home yaw and sweep tilt, discarding all prior calibration
    pub const fn full() -> Self {
        Self {
            yaw: YawStep::Home,
            tilt: TiltStep::Sweep,
        }
    }

    /// Re-home yaw and recenter tilt on an already calibrated turret
    pub const fn rehome() -> Self {
        Self {
            yaw: YawStep::Home,
            tilt: TiltStep::Recenter,
        }
    }

    /// Retry yaw homing only
    pub const fn yaw_only() -> Self {
        Self {
            yaw: YawStep::Home,
            tilt: TiltStep::Keep,
        }
    }

    /// Retry the tilt limit sweep only
    pub const fn tilt_only() -> Self {
        Self {
            yaw: YawStep::Keep,
            tilt: TiltStep::Sweep,
        }
    }
}

/// Why an axis failed calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationFault {
    /// Home sensor not seen within the sweep bound or phase timeout
    YawHomeNotFound,
    /// A limit switch not seen within the phase timeout
    TiltLimitNotFound,
    /// Limits found but the center move never finished
    TiltCenterTimeout,
}

impl From<CalibrationFault> for ErrorCode {
    fn from(fault: CalibrationFault) -> Self {
        match fault {
            CalibrationFault::YawHomeNotFound => ErrorCode::YawHomeNotFound,
            CalibrationFault::TiltLimitNotFound => ErrorCode::TiltLimitNotFound,
            CalibrationFault::TiltCenterTimeout => ErrorCode::TiltCenterTimeout,
        }
    }
}

/// Outcome of a calibration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationResult {
    pub yaw_homed: bool,
    pub tilt_calibrated: bool,
    /// Yaw zero in native units; homing makes the sensor position zero
    pub center_yaw: i64,
    /// Tilt native position that reads as 0°
    pub center_tilt: i64,
    /// Tilt (down, up) limits in native units
    pub limits: Option<(i64, i64)>,
    pub yaw_fault: Option<CalibrationFault>,
    pub tilt_fault: Option<CalibrationFault>,
}

impl CalibrationResult {
    /// Both axes usable for angular moves
    pub fn calibrated(&self) -> bool {
        self.yaw_homed && self.tilt_calibrated
    }
}
