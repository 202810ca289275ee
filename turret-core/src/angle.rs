//! Degree and native-unit conversion
//!
//! Yaw rotates continuously, so its angles wrap at 360° and absolute moves
//! are planned as the shortest signed delta from the current heading. Tilt
//! has no wraparound; its angles are offsets from the calibrated center.

use crate::config::AxisConfig;
use crate::math;
use crate::motion::Axis;

/// Largest single move in native units (2^31), far past any real travel
pub const MAX_MOVE_UNITS: f32 = 2_147_483_648.0;

/// Wrap an angle into [0, 360)
pub fn wrap360(deg: f32) -> f32 {
    let r = deg % 360.0;
    let r = if r < 0.0 { r + 360.0 } else { r };
    // -tiny + 360 rounds up to 360 in f32
    if r >= 360.0 {
        0.0
    } else {
        r
    }
}

/// Wrap an angle into (-180, 180]
pub fn wrap180(deg: f32) -> f32 {
    let w = wrap360(deg);
    if w > 180.0 {
        w - 360.0
    } else {
        w
    }
}

/// Shortest signed rotation from `current_deg` to `target_deg`, in (-180, 180]
pub fn shortest_delta(current_deg: f32, target_deg: f32) -> f32 {
    wrap180(target_deg - current_deg)
}

/// Fixed conversion constants of one axis
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisScale {
    steps_per_degree: f32,
    full_rotation: i64,
}

impl AxisScale {
    /// Derive the scale from an axis drive train
    pub fn from_config(config: &AxisConfig) -> Self {
        let steps_per_degree = config.steps_per_degree();
        Self {
            steps_per_degree,
            full_rotation: math::round(steps_per_degree * 360.0),
        }
    }

    /// Native units per degree
    pub fn steps_per_degree(&self) -> f32 {
        self.steps_per_degree
    }

    /// Native units in one full output rotation
    pub fn full_rotation(&self) -> i64 {
        self.full_rotation
    }
}

/// Angle conversion for both axes
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AngleModel {
    yaw: AxisScale,
    tilt: AxisScale,
}

impl AngleModel {
    pub fn new(yaw: &AxisConfig, tilt: &AxisConfig) -> Self {
        Self {
            yaw: AxisScale::from_config(yaw),
            tilt: AxisScale::from_config(tilt),
        }
    }

    pub fn scale(&self, axis: Axis) -> &AxisScale {
        match axis {
            Axis::Yaw => &self.yaw,
            Axis::Tilt => &self.tilt,
        }
    }

    /// Convert degrees to the nearest native unit count
    pub fn degrees_to_units(&self, deg: f32, axis: Axis) -> i64 {
        math::round(deg * self.scale(axis).steps_per_degree)
    }

    /// Convert degrees to native units for a move
    ///
    /// `None` for a non-finite angle or one larger than [`MAX_MOVE_UNITS`].
    pub fn checked_degrees_to_units(&self, deg: f32, axis: Axis) -> Option<i64> {
        let units = deg * self.scale(axis).steps_per_degree;
        (units.is_finite() && math::abs(units) <= MAX_MOVE_UNITS).then(|| math::round(units))
    }

    /// Convert a native unit count to degrees
    pub fn units_to_degrees(&self, units: i64, axis: Axis) -> f32 {
        units as f32 / self.scale(axis).steps_per_degree
    }

    /// Yaw heading in [0, 360) for a raw yaw position
    ///
    /// The position is reduced modulo one rotation first so multi-turn
    /// windup does not cost float precision.
    pub fn yaw_heading(&self, position: i64) -> f32 {
        let within_turn = position.rem_euclid(self.yaw.full_rotation);
        wrap360(self.units_to_degrees(within_turn, Axis::Yaw))
    }
}
