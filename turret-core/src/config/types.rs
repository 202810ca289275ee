//! Behavior configuration types
//!
//! Tuning for jogging, calibration, the trigger and the safety supervisor.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Joystick jogging tuning
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct JogConfig {
    /// Stick magnitude treated as zero
    pub deadzone: f32,
    /// Response curve exponent applied past the deadzone (1 = linear)
    pub exponent: u8,
    /// Low-pass time constant applied to raw stick input
    pub filter_tau_ms: u16,
    /// Time constant for the yaw jog target settling onto the axis after release
    pub release_tau_ms: u16,
    /// Largest integration step; longer gaps are treated as this long
    pub max_dt_ms: u16,
    /// Yaw speed at full deflection in native units per second
    pub yaw_max_speed: f32,
    /// Tilt speed at full deflection in native units per second
    pub tilt_max_speed: f32,
    /// Tilt commanded speed change limit in native units per second squared
    pub tilt_slew_rate: f32,
}

impl Default for JogConfig {
    fn default() -> Self {
        Self {
            deadzone: 0.1,
            exponent: 2,
            filter_tau_ms: 60,
            release_tau_ms: 30,
            max_dt_ms: 50,
            yaw_max_speed: 2000.0,
            tilt_max_speed: 1200.0,
            tilt_slew_rate: 4000.0,
        }
    }
}

/// Homing and limit sweep tuning
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CalibrationConfig {
    /// Sweep speed as a fraction of the axis maximum speed
    pub speed_factor: f32,
    /// Yaw back-off before searching when starting on the home sensor
    pub yaw_backoff_degrees: f32,
    /// Tilt back-off before sweeping when starting on a limit switch
    pub tilt_backoff_degrees: f32,
    /// Yaw search gives up after this many rotations
    pub max_yaw_rotations: f32,
    /// Wall-clock bound on every calibration phase
    pub phase_timeout_ms: u32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            speed_factor: 0.3,
            yaw_backoff_degrees: 10.0,
            tilt_backoff_degrees: 5.0,
            max_yaw_rotations: 1.5,
            phase_timeout_ms: 15_000,
        }
    }
}

/// Trigger servo timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TriggerConfig {
    /// Time the trigger stays in the fire position
    pub hold_ms: u32,
    /// Time allowed for the servo to return before the next pull
    pub settle_ms: u32,
    /// Shots per burst
    pub burst_count: u8,
    /// Spacing between burst shots
    pub burst_interval_ms: u32,
    /// A burst is abandoned after this long regardless of shots fired
    pub burst_timeout_ms: u32,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            hold_ms: 150,
            settle_ms: 200,
            burst_count: 3,
            burst_interval_ms: 500,
            burst_timeout_ms: 3000,
        }
    }
}

/// Safety supervisor thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SafetyConfig {
    /// Joystick input older than this stops jogging
    pub input_timeout_ms: u32,
    /// Angular moves not finished within this are cancelled
    pub angular_timeout_ms: u32,
    /// Link silence treated as a disconnect
    pub link_timeout_ms: u32,
    /// Status push interval on the link
    pub status_interval_ms: u32,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            input_timeout_ms: 500,
            angular_timeout_ms: 10_000,
            link_timeout_ms: 2000,
            status_interval_ms: 200,
        }
    }
}
