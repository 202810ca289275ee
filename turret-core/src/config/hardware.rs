//! Hardware configuration types
//!
//! Drive-train geometry and dynamics for each axis, and sensor polarity.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Geometry and dynamics of one stepper-driven axis
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AxisConfig {
    /// Full steps per motor rotation (typically 200 for 1.8° motors)
    pub full_steps_per_rotation: u16,
    /// Microstep factor configured on the driver
    pub microsteps: u16,
    /// Gear ratio numerator (e.g., 4 for 4:1)
    pub gear_ratio_num: u16,
    /// Gear ratio denominator (e.g., 1 for 4:1)
    pub gear_ratio_den: u16,
    /// Maximum speed in native units per second
    pub max_speed: f32,
    /// Acceleration in native units per second squared
    pub acceleration: f32,
    /// Slowest non-zero step rate the driver produces, in Hz
    pub min_step_rate: u16,
}

impl AxisConfig {
    /// Native units per output degree
    pub fn steps_per_degree(&self) -> f32 {
        let per_rotation = self.full_steps_per_rotation as f32
            * self.microsteps as f32
            * self.gear_ratio_num as f32
            / self.gear_ratio_den as f32;
        per_rotation / 360.0
    }

    /// Yaw drive default: 200-step motor, 2x microstepping, 4:1 reduction
    pub const fn yaw_default() -> Self {
        Self {
            full_steps_per_rotation: 200,
            microsteps: 2,
            gear_ratio_num: 4,
            gear_ratio_den: 1,
            max_speed: 2000.0,
            acceleration: 4000.0,
            min_step_rate: 8,
        }
    }

    /// Tilt drive default: 200-step motor, 2x microstepping, 3:1 reduction
    pub const fn tilt_default() -> Self {
        Self {
            full_steps_per_rotation: 200,
            microsteps: 2,
            gear_ratio_num: 3,
            gear_ratio_den: 1,
            max_speed: 1200.0,
            acceleration: 3000.0,
            min_step_rate: 8,
        }
    }
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self::yaw_default()
    }
}

/// Home and limit input configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SensorConfig {
    /// Hall sensor pulls low when the magnet is present
    pub yaw_home_active_low: bool,
    /// Up limit switch pulls low when pressed
    pub tilt_up_active_low: bool,
    /// Down limit switch pulls low when pressed
    pub tilt_down_active_low: bool,
    /// Consecutive agreeing samples before a reading changes
    pub debounce_samples: u8,
    /// Sensor poll interval in milliseconds
    pub poll_interval_ms: u16,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            yaw_home_active_low: true,
            tilt_up_active_low: true,
            tilt_down_active_low: true,
            debounce_samples: 3,
            poll_interval_ms: 1,
        }
    }
}
