//! Single-axis motion control
//!
//! Tracks the axis position in native units by integrating the commanded
//! speed each tick, and drives either toward an absolute target with a
//! trapezoidal speed profile or at a commanded speed.
//!
//! Speeds are snapped to rates the step generator can emit before they are
//! integrated, so the position count follows the pulses actually sent.

use turret_protocol::ErrorCode;

use crate::config::AxisConfig;
use crate::math;

/// Axis identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    /// Continuous-rotation pan axis, homed on a hall sensor
    Yaw,
    /// Pitch axis between two limit switches
    Tilt,
}

/// Reasons an axis refuses a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AxisError {
    /// Axis has not been homed/calibrated since power-on or its last failure
    NotCalibrated,
    /// Target lies outside the calibrated soft limits
    OutOfLimits,
    /// Target does not fit the position counter
    OutOfRange,
}

impl From<AxisError> for ErrorCode {
    fn from(err: AxisError) -> Self {
        match err {
            AxisError::NotCalibrated => ErrorCode::NotCalibrated,
            AxisError::OutOfLimits => ErrorCode::TargetOutOfLimits,
            AxisError::OutOfRange => ErrorCode::InvalidValue,
        }
    }
}

/// Position and calibration state of one axis
///
/// Invariant: `soft_limits` is `None` whenever `calibrated` is false.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisState {
    /// Position in native units relative to the axis zero
    pub position: i64,
    /// Absolute target while in position mode
    pub target: Option<i64>,
    /// Speed ceiling in native units per second
    pub max_speed: f32,
    /// Acceleration in native units per second squared
    pub acceleration: f32,
    pub calibrated: bool,
    /// Inclusive (low, high) bounds derived from calibration
    pub soft_limits: Option<(i64, i64)>,
}

/// Controller for one stepper-driven axis
#[derive(Debug, Clone)]
pub struct AxisController {
    axis: Axis,
    state: AxisState,
    /// Raw step count at the axis zero
    origin: i64,
    /// Signed speed applied during the last tick
    speed: f32,
    /// Speed requested for speed mode
    commanded: f32,
    /// Fractional units not yet accounted in `position`
    remainder: f32,
    /// Slowest non-zero rate the driver emits
    min_step_rate: f32,
}

impl AxisController {
    pub fn new(axis: Axis, config: &AxisConfig) -> Self {
        Self {
            axis,
            state: AxisState {
                position: 0,
                target: None,
                max_speed: config.max_speed,
                acceleration: config.acceleration,
                calibrated: false,
                soft_limits: None,
            },
            origin: 0,
            speed: 0.0,
            commanded: 0.0,
            remainder: 0.0,
            min_step_rate: config.min_step_rate as f32,
        }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn state(&self) -> &AxisState {
        &self.state
    }

    pub fn current_position(&self) -> i64 {
        self.state.position
    }

    /// Step count since power-on, unaffected by re-zeroing
    pub fn raw_position(&self) -> i64 {
        self.state.position + self.origin
    }

    /// Signed speed to apply to the driver
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn target(&self) -> Option<i64> {
        self.state.target
    }

    pub fn is_calibrated(&self) -> bool {
        self.state.calibrated
    }

    pub fn soft_limits(&self) -> Option<(i64, i64)> {
        self.state.soft_limits
    }

    /// Signed units left to the position-mode target, zero without one
    pub fn distance_to_target(&self) -> i64 {
        self.state
            .target
            .map_or(0, |target| target - self.state.position)
    }

    /// Check whether `position` is an acceptable absolute target
    pub fn check_target(&self, position: i64) -> Result<(), AxisError> {
        if !self.state.calibrated {
            return Err(AxisError::NotCalibrated);
        }
        match self.state.soft_limits {
            Some((low, high)) if position < low || position > high => Err(AxisError::OutOfLimits),
            _ => Ok(()),
        }
    }

    /// Move to an absolute position in native units
    pub fn set_target_absolute(&mut self, position: i64) -> Result<(), AxisError> {
        self.check_target(position)?;
        self.track(position);
        Ok(())
    }

    /// Absolute target for a move of `delta` from the current position
    pub fn check_relative(&self, delta: i64) -> Result<i64, AxisError> {
        let position = self
            .state
            .position
            .checked_add(delta)
            .ok_or(AxisError::OutOfRange)?;
        self.check_target(position)?;
        Ok(position)
    }

    /// Move by a signed offset from the current position
    pub fn set_target_relative(&mut self, delta: i64) -> Result<(), AxisError> {
        let position = self.check_relative(delta)?;
        self.track(position);
        Ok(())
    }

    /// Aim position mode at `position` without calibration checks
    ///
    /// Used by calibration sweeps and yaw jogging.
    pub fn track(&mut self, position: i64) {
        self.state.target = Some(position);
    }

    /// Switch to speed mode at `speed`, clamped to the axis maximum
    pub fn set_speed(&mut self, speed: f32) {
        self.state.target = None;
        self.commanded = speed.clamp(-self.state.max_speed, self.state.max_speed);
    }

    /// Stop immediately and drop any target
    pub fn stop(&mut self) {
        self.state.target = None;
        self.speed = 0.0;
        self.commanded = 0.0;
        self.remainder = 0.0;
    }

    /// Stop immediately and hold the current position in position mode
    pub fn hold(&mut self) {
        self.stop();
        self.state.target = Some(self.state.position);
    }

    /// Make the current position the axis zero
    pub fn zero(&mut self) {
        self.origin += self.state.position;
        self.state.position = 0;
        self.state.target = self.state.target.map(|_| 0);
        self.remainder = 0.0;
    }

    pub fn mark_calibrated(&mut self, soft_limits: Option<(i64, i64)>) {
        self.state.calibrated = true;
        self.state.soft_limits = soft_limits;
    }

    pub fn mark_uncalibrated(&mut self) {
        self.state.calibrated = false;
        self.state.soft_limits = None;
    }

    /// Advance in whichever mode the last command selected
    pub fn tick(&mut self, dt: f32) {
        if self.state.target.is_some() {
            self.tick_position_mode(dt);
        } else {
            self.tick_speed_mode(dt);
        }
    }

    /// Advance toward the target, braking in time to stop on it
    pub fn tick_position_mode(&mut self, dt: f32) {
        let Some(target) = self.state.target else {
            self.speed = 0.0;
            return;
        };
        let remaining = target - self.state.position;
        if remaining == 0 {
            self.speed = 0.0;
            self.remainder = 0.0;
            return;
        }

        let dir = if remaining > 0 { 1.0 } else { -1.0 };
        let distance = remaining.unsigned_abs() as f32;
        let accel = self.state.acceleration;
        let accel_step = accel * dt;

        // Speed component toward the target; negative while moving away
        let toward = self.speed * dir;
        let stopping = toward * toward / (2.0 * accel);
        let next = if toward > 0.0 && stopping >= distance {
            // Keep creeping so the last few units are still covered
            (toward - accel_step).max(accel_step)
        } else {
            toward + accel_step
        };
        let next = next.min(self.state.max_speed);
        // Short of the target, so never round down to a stop
        let next = if next > 0.0 {
            next.max(self.min_step_rate)
        } else {
            next
        };
        self.speed = self.step_rate(next * dir);

        self.integrate(dt);

        let after = target - self.state.position;
        if after == 0 || (after > 0) != (remaining > 0) {
            self.state.position = target;
            self.speed = 0.0;
            self.remainder = 0.0;
        }
    }

    /// Advance at the commanded speed, stopping at the soft limits
    pub fn tick_speed_mode(&mut self, dt: f32) {
        self.speed = self.step_rate(self.commanded);
        self.integrate(dt);

        if let Some((low, high)) = self.state.soft_limits {
            let clamped = self.state.position.clamp(low, high);
            if clamped != self.state.position {
                self.state.position = clamped;
                self.speed = 0.0;
                self.commanded = 0.0;
                self.remainder = 0.0;
            }
        }
    }

    /// Snap a signed speed to a rate the step generator emits
    ///
    /// Under half a step per second is a stop. Anything faster rounds to
    /// whole hertz, no slower than the driver floor.
    fn step_rate(&self, speed: f32) -> f32 {
        let rate = math::abs(speed);
        if !(rate >= 0.5) {
            return 0.0;
        }
        let hz = (math::round(rate) as f32).max(self.min_step_rate);
        math::signum(speed) * hz
    }

    fn integrate(&mut self, dt: f32) {
        self.remainder += self.speed * dt;
        // Truncation keeps the sign of the remainder
        let whole = self.remainder as i64;
        self.remainder -= whole as f32;
        self.state.position += whole;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DT: f32 = 0.005;

    fn config() -> AxisConfig {
        AxisConfig {
            full_steps_per_rotation: 200,
            microsteps: 2,
            gear_ratio_num: 1,
            gear_ratio_den: 1,
            max_speed: 2000.0,
            acceleration: 4000.0,
            min_step_rate: 8,
        }
    }

    fn calibrated_tilt(limits: (i64, i64)) -> AxisController {
        let mut axis = AxisController::new(Axis::Tilt, &config());
        axis.mark_calibrated(Some(limits));
        axis
    }

    fn run_to_target(axis: &mut AxisController, max_ticks: usize) -> usize {
        for tick in 0..max_ticks {
            if axis.distance_to_target() == 0 && axis.speed() == 0.0 {
                return tick;
            }
            axis.tick_position_mode(DT);
            assert!(axis.speed().abs() <= axis.state().max_speed);
        }
        panic!("target not reached in {max_ticks} ticks");
    }

    #[test]
    fn test_uncalibrated_axis_rejects_targets() {
        let mut axis = AxisController::new(Axis::Tilt, &config());
        assert_eq!(axis.set_target_absolute(10), Err(AxisError::NotCalibrated));
        assert_eq!(axis.set_target_relative(10), Err(AxisError::NotCalibrated));
        assert_eq!(axis.target(), None);
    }

    #[test]
    fn test_soft_limits_are_inclusive() {
        let mut axis = calibrated_tilt((-500, 700));
        assert_eq!(axis.set_target_absolute(700), Ok(()));
        assert_eq!(axis.set_target_absolute(-500), Ok(()));
        assert_eq!(axis.set_target_absolute(701), Err(AxisError::OutOfLimits));
        // Rejection leaves the previous target in place
        assert_eq!(axis.target(), Some(-500));
    }

    #[test]
    fn test_homed_yaw_accepts_any_target() {
        let mut axis = AxisController::new(Axis::Yaw, &config());
        axis.mark_calibrated(None);
        assert_eq!(axis.set_target_absolute(1_000_000), Ok(()));
        assert_eq!(axis.set_target_relative(-3_000_000), Ok(()));
        assert_eq!(axis.target(), Some(-3_000_000));
    }

    #[test]
    fn test_relative_target_past_counter_range() {
        let mut axis = AxisController::new(Axis::Yaw, &config());
        axis.mark_calibrated(None);
        axis.set_target_absolute(10).unwrap();
        run_to_target(&mut axis, 1000);
        assert_eq!(axis.set_target_relative(i64::MAX), Err(AxisError::OutOfRange));
        assert_eq!(axis.check_relative(i64::MAX), Err(AxisError::OutOfRange));
        assert_eq!(axis.target(), Some(10));
        assert_eq!(ErrorCode::from(AxisError::OutOfRange), ErrorCode::InvalidValue);
    }

    #[test]
    fn test_uncalibrating_drops_limits() {
        let mut axis = calibrated_tilt((-10, 10));
        axis.mark_uncalibrated();
        assert!(!axis.is_calibrated());
        assert_eq!(axis.soft_limits(), None);
    }

    #[test]
    fn test_position_mode_lands_exactly() {
        let mut axis = calibrated_tilt((-10_000, 10_000));
        axis.set_target_absolute(3000).unwrap();
        run_to_target(&mut axis, 2000);
        assert_eq!(axis.current_position(), 3000);
        assert_eq!(axis.speed(), 0.0);
    }

    #[test]
    fn test_position_mode_reverses_through_zero_speed() {
        let mut axis = calibrated_tilt((-10_000, 10_000));
        axis.set_target_absolute(5000).unwrap();
        for _ in 0..100 {
            axis.tick_position_mode(DT);
        }
        assert!(axis.speed() > 0.0);
        axis.set_target_absolute(0).unwrap();
        run_to_target(&mut axis, 4000);
        assert_eq!(axis.current_position(), 0);
    }

    #[test]
    fn test_speed_mode_stops_at_soft_limit() {
        let mut axis = calibrated_tilt((-100, 100));
        axis.set_speed(2000.0);
        for _ in 0..100 {
            axis.tick_speed_mode(DT);
        }
        assert_eq!(axis.current_position(), 100);
        assert_eq!(axis.speed(), 0.0);
    }

    #[test]
    fn test_speed_command_is_clamped() {
        let mut axis = AxisController::new(Axis::Yaw, &config());
        axis.set_speed(-1.0e9);
        axis.tick_speed_mode(DT);
        assert_eq!(axis.speed(), -2000.0);
        assert!((-10..=-9).contains(&axis.current_position()));
    }

    #[test]
    fn test_speed_snaps_to_emitted_rates() {
        let mut axis = AxisController::new(Axis::Tilt, &config());

        axis.set_speed(0.3);
        for _ in 0..400 {
            axis.tick_speed_mode(DT);
            assert_eq!(axis.speed(), 0.0);
        }
        assert_eq!(axis.current_position(), 0);

        // 8 Hz for two seconds
        axis.set_speed(3.0);
        for _ in 0..400 {
            axis.tick_speed_mode(DT);
            assert_eq!(axis.speed(), 8.0);
        }
        assert!((15..=16).contains(&axis.current_position()));

        axis.set_speed(-100.4);
        axis.tick_speed_mode(DT);
        assert_eq!(axis.speed(), -100.0);
    }

    #[test]
    fn test_slow_approach_never_stalls_below_floor() {
        let mut slow = config();
        slow.acceleration = 40.0;
        let mut axis = AxisController::new(Axis::Tilt, &slow);
        axis.mark_calibrated(Some((-100, 100)));
        axis.set_target_absolute(3).unwrap();
        for _ in 0..2000 {
            if axis.distance_to_target() == 0 {
                break;
            }
            axis.tick_position_mode(DT);
            let speed = axis.speed();
            assert!(speed == 0.0 || speed >= 8.0);
            assert_eq!(speed, math::round(speed) as f32);
        }
        assert_eq!(axis.current_position(), 3);
    }

    #[test]
    fn test_zero_keeps_raw_count() {
        let mut axis = AxisController::new(Axis::Yaw, &config());
        axis.set_speed(1000.0);
        for _ in 0..20 {
            axis.tick_speed_mode(DT);
        }
        let raw = axis.raw_position();
        axis.stop();
        axis.zero();
        assert_eq!(axis.current_position(), 0);
        assert_eq!(axis.raw_position(), raw);
    }

    #[test]
    fn test_hold_pins_current_position() {
        let mut axis = AxisController::new(Axis::Yaw, &config());
        axis.set_speed(1000.0);
        axis.tick(DT);
        axis.hold();
        assert_eq!(axis.distance_to_target(), 0);
        axis.tick(DT);
        assert_eq!(axis.speed(), 0.0);
    }

    proptest! {
        #[test]
        fn prop_position_mode_never_overshoots(target in -5000i64..5000) {
            let mut axis = calibrated_tilt((-5000, 5000));
            axis.set_target_absolute(target).unwrap();
            let (low, high) = if target < 0 { (target, 0) } else { (0, target) };
            for _ in 0..3000 {
                axis.tick_position_mode(DT);
                let pos = axis.current_position();
                prop_assert!(pos >= low && pos <= high);
            }
            prop_assert_eq!(axis.current_position(), target);
        }
    }
}
