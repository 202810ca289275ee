//! Configuration types
//!
//! Board-agnostic configuration stored as postcard binary data and
//! validated before the controller is built.

pub mod hardware;
pub mod types;

pub use hardware::*;
pub use types::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Steps, microsteps or gear ratio of zero
    InvalidGeometry,
    /// Non-positive or non-finite speed or acceleration, or a step rate floor above the speed limit
    InvalidDynamics,
    /// Deadzone outside [0, 1)
    InvalidDeadzone,
    /// Calibration speed factor or sweep bound out of range
    InvalidCalibration,
    /// Burst settings that can never complete
    InvalidTrigger,
    /// Zero tick interval or timeouts shorter than a tick
    InvalidTiming,
}

/// Complete turret configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TurretConfig {
    /// Control loop period
    pub tick_interval_ms: u16,
    pub yaw: AxisConfig,
    pub tilt: AxisConfig,
    pub sensors: SensorConfig,
    pub jog: JogConfig,
    pub calibration: CalibrationConfig,
    pub trigger: TriggerConfig,
    pub safety: SafetyConfig,
}

impl Default for TurretConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 5,
            yaw: AxisConfig::yaw_default(),
            tilt: AxisConfig::tilt_default(),
            sensors: SensorConfig::default(),
            jog: JogConfig::default(),
            calibration: CalibrationConfig::default(),
            trigger: TriggerConfig::default(),
            safety: SafetyConfig::default(),
        }
    }
}

fn positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

impl TurretConfig {
    /// Check the configuration for values the controller cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        for axis in [&self.yaw, &self.tilt] {
            if axis.full_steps_per_rotation == 0
                || axis.microsteps == 0
                || axis.gear_ratio_num == 0
                || axis.gear_ratio_den == 0
            {
                return Err(ConfigError::InvalidGeometry);
            }
            if !positive(axis.max_speed)
                || !positive(axis.acceleration)
                || axis.min_step_rate == 0
                || axis.min_step_rate as f32 > axis.max_speed
            {
                return Err(ConfigError::InvalidDynamics);
            }
        }

        let jog = &self.jog;
        if !(jog.deadzone >= 0.0 && jog.deadzone < 1.0) {
            return Err(ConfigError::InvalidDeadzone);
        }
        if !positive(jog.yaw_max_speed)
            || !positive(jog.tilt_max_speed)
            || !positive(jog.tilt_slew_rate)
            || jog.yaw_max_speed > self.yaw.max_speed
            || jog.tilt_max_speed > self.tilt.max_speed
        {
            return Err(ConfigError::InvalidDynamics);
        }

        let cal = &self.calibration;
        if !(cal.speed_factor > 0.0 && cal.speed_factor <= 1.0)
            || !(cal.max_yaw_rotations >= 1.0)
            || !(cal.yaw_backoff_degrees >= 0.0)
            || !(cal.tilt_backoff_degrees >= 0.0)
        {
            return Err(ConfigError::InvalidCalibration);
        }

        let trigger = &self.trigger;
        if trigger.burst_count == 0
            || trigger.burst_timeout_ms < trigger.hold_ms.saturating_add(trigger.settle_ms)
        {
            return Err(ConfigError::InvalidTrigger);
        }

        let tick = self.tick_interval_ms as u32;
        if tick == 0
            || jog.max_dt_ms == 0
            || cal.phase_timeout_ms <= tick
            || self.safety.input_timeout_ms <= tick
            || self.safety.angular_timeout_ms <= tick
            || self.safety.link_timeout_ms <= tick
            || self.sensors.debounce_samples == 0
        {
            return Err(ConfigError::InvalidTiming);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(TurretConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_steps_per_degree() {
        let yaw = AxisConfig::yaw_default();
        // 200 * 2 * 4 / 360
        assert!((yaw.steps_per_degree() - 1600.0 / 360.0).abs() < 1e-5);
    }

    #[test]
    fn test_zero_gear_rejected() {
        let mut config = TurretConfig::default();
        config.tilt.gear_ratio_den = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidGeometry));
    }

    #[test]
    fn test_jog_faster_than_axis_rejected() {
        let mut config = TurretConfig::default();
        config.jog.yaw_max_speed = config.yaw.max_speed * 2.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidDynamics));
    }

    #[test]
    fn test_deadzone_range() {
        let mut config = TurretConfig::default();
        config.jog.deadzone = 1.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidDeadzone));
        config.jog.deadzone = f32::NAN;
        assert_eq!(config.validate(), Err(ConfigError::InvalidDeadzone));
    }

    #[test]
    fn test_burst_must_fit_timeout() {
        let mut config = TurretConfig::default();
        config.trigger.burst_timeout_ms = 100;
        assert_eq!(config.validate(), Err(ConfigError::InvalidTrigger));
    }

    #[test]
    fn test_huge_trigger_timing_rejected() {
        let mut config = TurretConfig::default();
        config.trigger.hold_ms = u32::MAX;
        config.trigger.settle_ms = u32::MAX;
        config.trigger.burst_timeout_ms = u32::MAX - 1;
        assert_eq!(config.validate(), Err(ConfigError::InvalidTrigger));
    }

    #[test]
    fn test_min_step_rate_bounds() {
        let mut config = TurretConfig::default();
        config.yaw.min_step_rate = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidDynamics));
        config.yaw.min_step_rate = 8;
        config.tilt.max_speed = 5.0;
        config.jog.tilt_max_speed = 5.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidDynamics));
    }
}
