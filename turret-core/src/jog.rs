//! Joystick jogging
//!
//! Raw stick values are low-pass filtered, passed through a deadzone and a
//! response curve, and turned into axis motion. Yaw integrates a floating
//! jog target and tracks it in position mode; tilt slews a commanded speed
//! and runs in speed mode.

use crate::config::JogConfig;
use crate::math;
use crate::motion::AxisController;
use crate::sensor::SensorSnapshot;

/// Map a stick value to a signed speed
///
/// Values within the deadzone map to exactly zero. Past it, the remaining
/// travel is rescaled to [0, 1], raised to `exponent` and scaled to
/// `max_speed`, keeping the sign.
pub fn map_axis(value: f32, deadzone: f32, exponent: u8, max_speed: f32) -> f32 {
    let magnitude = math::abs(value);
    if magnitude <= deadzone {
        return 0.0;
    }
    let normalized = ((magnitude - deadzone) / (1.0 - deadzone)).min(1.0);
    math::signum(value) * math::powi(normalized, exponent) * max_speed
}

/// Filter and integration state, reset on every mode or client change
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JogState {
    pub filtered_x: f32,
    pub filtered_y: f32,
    /// Yaw position the axis is chasing, in native units
    pub yaw_jog_target: f32,
    /// Tilt speed after slew limiting
    pub tilt_smoothed_speed: f32,
}

#[derive(Debug, Clone)]
pub struct JogController {
    config: JogConfig,
    state: JogState,
}

impl JogController {
    pub fn new(config: JogConfig) -> Self {
        Self {
            config,
            state: JogState::default(),
        }
    }

    pub fn state(&self) -> &JogState {
        &self.state
    }

    pub fn deadzone(&self) -> f32 {
        self.config.deadzone
    }

    /// Clear filters and resync the yaw jog target to the axis position
    pub fn reset(&mut self, yaw_position: i64) {
        self.state = JogState {
            yaw_jog_target: yaw_position as f32,
            ..JogState::default()
        };
    }

    /// Run one jogging step and advance both axes
    ///
    /// Filtering and target integration use `dt_ms` clamped to
    /// `max_dt_ms`; the axes integrate the full elapsed time.
    pub fn tick(
        &mut self,
        dt_ms: u64,
        stick: (f32, f32),
        sensors: SensorSnapshot,
        yaw: &mut AxisController,
        tilt: &mut AxisController,
    ) {
        let dt = dt_ms.min(self.config.max_dt_ms as u64) as f32 / 1000.0;
        let elapsed = dt_ms as f32 / 1000.0;

        let alpha = math::smoothing(dt, self.config.filter_tau_ms as f32 / 1000.0);
        self.state.filtered_x += alpha * (stick.0 - self.state.filtered_x);
        self.state.filtered_y += alpha * (stick.1 - self.state.filtered_y);

        self.tick_yaw(dt, yaw);
        yaw.tick_position_mode(elapsed);
        self.tick_tilt(dt, sensors, tilt);
        tilt.tick_speed_mode(elapsed);
    }

    fn tick_yaw(&mut self, dt: f32, yaw: &mut AxisController) {
        let cfg = &self.config;
        let speed = map_axis(self.state.filtered_x, cfg.deadzone, cfg.exponent, cfg.yaw_max_speed);

        if speed != 0.0 {
            self.state.yaw_jog_target += speed * dt;
        } else {
            // Released: pull the target back onto the axis so nothing winds up
            let position = yaw.current_position() as f32;
            let beta = math::smoothing(dt, cfg.release_tau_ms as f32 / 1000.0);
            self.state.yaw_jog_target += beta * (position - self.state.yaw_jog_target);
        }

        yaw.track(math::round(self.state.yaw_jog_target));
    }

    fn tick_tilt(&mut self, dt: f32, sensors: SensorSnapshot, tilt: &mut AxisController) {
        let cfg = &self.config;
        let target = map_axis(self.state.filtered_y, cfg.deadzone, cfg.exponent, cfg.tilt_max_speed);

        let max_change = cfg.tilt_slew_rate * dt;
        let change = (target - self.state.tilt_smoothed_speed).clamp(-max_change, max_change);
        let mut speed = self.state.tilt_smoothed_speed + change;

        let position = tilt.current_position();
        let (at_low, at_high) = match tilt.soft_limits() {
            Some((low, high)) => (position <= low, position >= high),
            None => (false, false),
        };
        if (speed > 0.0 && (sensors.tilt_up || at_high)) || (speed < 0.0 && (sensors.tilt_down || at_low)) {
            speed = 0.0;
        }

        self.state.tilt_smoothed_speed = speed;
        tilt.set_speed(speed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AxisConfig;
    use crate::motion::Axis;
    use proptest::prelude::*;

    fn axes() -> (AxisController, AxisController) {
        (
            AxisController::new(Axis::Yaw, &AxisConfig::yaw_default()),
            AxisController::new(Axis::Tilt, &AxisConfig::tilt_default()),
        )
    }

    fn jog() -> JogController {
        JogController::new(JogConfig::default())
    }

    #[test]
    fn test_map_axis_curve() {
        assert_eq!(map_axis(0.1, 0.1, 2, 1000.0), 0.0);
        assert_eq!(map_axis(1.0, 0.1, 2, 1000.0), 1000.0);
        assert_eq!(map_axis(-1.0, 0.1, 2, 1000.0), -1000.0);
        let half = map_axis(0.55, 0.1, 2, 1000.0);
        assert!((half - 250.0).abs() < 0.1);
        let linear = map_axis(-0.55, 0.1, 1, 1000.0);
        assert!((linear + 500.0).abs() < 0.1);
    }

    #[test]
    fn test_full_stick_moves_both_axes() {
        let mut jog = jog();
        let (mut yaw, mut tilt) = axes();
        for _ in 0..200 {
            jog.tick(5, (1.0, -1.0), SensorSnapshot::default(), &mut yaw, &mut tilt);
        }
        assert!(yaw.current_position() > 0);
        assert!(tilt.current_position() < 0);
        assert!(tilt.speed() < 0.0);
    }

    #[test]
    fn test_release_settles_yaw_target_on_axis() {
        let mut jog = jog();
        let (mut yaw, mut tilt) = axes();
        for _ in 0..200 {
            jog.tick(5, (1.0, 0.0), SensorSnapshot::default(), &mut yaw, &mut tilt);
        }
        for _ in 0..1000 {
            jog.tick(5, (0.0, 0.0), SensorSnapshot::default(), &mut yaw, &mut tilt);
        }
        assert_eq!(yaw.speed(), 0.0);
        let gap = jog.state().yaw_jog_target - yaw.current_position() as f32;
        assert!(gap.abs() < 1.0);
    }

    #[test]
    fn test_tilt_slew_limited() {
        let mut jog = jog();
        let (mut yaw, mut tilt) = axes();
        let cfg = JogConfig::default();
        let mut last = 0.0f32;
        for _ in 0..100 {
            jog.tick(5, (0.0, 1.0), SensorSnapshot::default(), &mut yaw, &mut tilt);
            let speed = tilt.speed();
            assert!(speed - last <= cfg.tilt_slew_rate * 0.005 + 1e-3);
            last = speed;
        }
    }

    #[test]
    fn test_tilt_zeroed_into_active_limit() {
        let mut jog = jog();
        let (mut yaw, mut tilt) = axes();
        let up = SensorSnapshot {
            tilt_up: true,
            ..Default::default()
        };
        for _ in 0..50 {
            jog.tick(5, (0.0, 1.0), up, &mut yaw, &mut tilt);
            assert_eq!(tilt.speed(), 0.0);
        }
        // Moving away from the pressed switch is allowed
        for _ in 0..50 {
            jog.tick(5, (0.0, -1.0), up, &mut yaw, &mut tilt);
        }
        assert!(tilt.speed() < 0.0);
    }

    #[test]
    fn test_tilt_zeroed_at_soft_limit() {
        let mut jog = jog();
        let (mut yaw, mut tilt) = axes();
        tilt.mark_calibrated(Some((-50, 0)));
        for _ in 0..50 {
            jog.tick(5, (0.0, 1.0), SensorSnapshot::default(), &mut yaw, &mut tilt);
            assert_eq!(tilt.speed(), 0.0);
        }
        assert_eq!(tilt.current_position(), 0);
    }

    #[test]
    fn test_long_gap_is_clamped() {
        let mut jog = jog();
        let (mut yaw, mut tilt) = axes();
        jog.reset(0);
        jog.tick(10_000, (1.0, 0.0), SensorSnapshot::default(), &mut yaw, &mut tilt);
        // One clamped step of full-speed integration at most
        let max_step = JogConfig::default().yaw_max_speed * 0.05;
        assert!(jog.state().yaw_jog_target <= max_step);
    }

    #[test]
    fn test_long_gap_still_counts_axis_travel() {
        let mut jog = jog();
        let (mut yaw, mut tilt) = axes();
        for _ in 0..200 {
            jog.tick(5, (0.0, 1.0), SensorSnapshot::default(), &mut yaw, &mut tilt);
        }
        let speed = tilt.speed();
        assert!(speed > 0.0);
        let before = tilt.current_position();
        jog.tick(200, (0.0, 1.0), SensorSnapshot::default(), &mut yaw, &mut tilt);
        let travelled = (tilt.current_position() - before) as f32;
        assert!((travelled - tilt.speed() * 0.2).abs() <= 1.0);
    }

    proptest! {
        #[test]
        fn prop_inputs_within_deadzone_never_move(
            samples in proptest::collection::vec((-0.09f32..=0.09, -0.09f32..=0.09), 1..100),
        ) {
            let mut jog = jog();
            let (mut yaw, mut tilt) = axes();
            for (x, y) in samples {
                jog.tick(5, (x, y), SensorSnapshot::default(), &mut yaw, &mut tilt);
                prop_assert_eq!(yaw.speed(), 0.0);
                prop_assert_eq!(tilt.speed(), 0.0);
            }
            prop_assert_eq!(yaw.current_position(), 0);
            prop_assert_eq!(tilt.current_position(), 0);
        }

        #[test]
        fn prop_map_axis_deadzone_is_zero(v in -1.0f32..=1.0, dz in 0.0f32..0.9) {
            let speed = map_axis(v, dz, 2, 1000.0);
            if v.abs() <= dz {
                prop_assert_eq!(speed, 0.0);
            } else {
                prop_assert!(speed.abs() <= 1000.0);
                prop_assert_eq!(speed > 0.0, v > 0.0);
            }
        }
    }
}
