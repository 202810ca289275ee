//! Command routing
//!
//! Every field of a command is independent. Each is applied in a fixed
//! order and a refused field is logged without touching any state.

use turret_protocol::{AngleRequest, Angles, AxisSelect, Command, ErrorCode, FireMode};

use super::{Controller, ControllerEvent};
use crate::angle::{shortest_delta, wrap360};
use crate::calibration::CalibrationPlan;
use crate::math;
use crate::motion::{Axis, AxisController, AxisError};
use crate::state::MotionEvent;

/// Validated target for one axis of an angular move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AxisGoal {
    Absolute(i64),
    Relative(i64),
}

fn commit(axis: &mut AxisController, goal: Option<AxisGoal>) -> Result<(), AxisError> {
    match goal {
        Some(AxisGoal::Absolute(position)) => axis.set_target_absolute(position),
        Some(AxisGoal::Relative(delta)) => axis.set_target_relative(delta),
        None => {
            axis.hold();
            Ok(())
        }
    }
}

impl Controller {
    /// Apply one host command
    ///
    /// Returns the current angles when the command asked for them.
    pub fn handle_command(&mut self, command: &Command, now_ms: u64) -> Option<Angles> {
        self.now_ms = self.now_ms.max(now_ms);

        self.apply_stick(command.x, command.y, now_ms);

        if command.cancel_angular_movement == Some(true) && self.cancel_move(MotionEvent::Cancelled) {
            self.push_event(ControllerEvent::MoveCancelled);
        }

        if command.calibrate == Some(true) {
            self.request_calibration(CalibrationPlan::full());
        }
        if let Some(axis) = command.calibrate_axis {
            let plan = match axis {
                AxisSelect::Yaw => CalibrationPlan::yaw_only(),
                AxisSelect::Tilt => CalibrationPlan::tilt_only(),
            };
            self.request_calibration(plan);
        }
        if command.home == Some(true) {
            let plan = if self.is_calibrated() {
                CalibrationPlan::rehome()
            } else {
                CalibrationPlan::full()
            };
            self.request_calibration(plan);
        }

        if command.move_to_center == Some(true) {
            self.move_to_center(now_ms);
        }
        if let Some(request) = command.move_to_angle {
            self.move_to_angle(request, now_ms);
        }
        if let Some(request) = command.move_by_angle {
            self.move_by_angle(request, now_ms);
        }

        if let Some(mode) = command.fire {
            self.fire(mode, now_ms);
        }

        (command.get_current_angles == Some(true)).then(|| self.angles())
    }

    fn apply_stick(&mut self, x: Option<f32>, y: Option<f32>, now_ms: u64) {
        let x = x.and_then(|v| self.sanitize_stick(v));
        let y = y.and_then(|v| self.sanitize_stick(v));
        if x.is_none() && y.is_none() {
            return;
        }

        if let Some(x) = x {
            self.stick.0 = x;
        }
        if let Some(y) = y {
            self.stick.1 = y;
        }
        self.safety.input_received(now_ms);

        let deadzone = self.jog.deadzone();
        let deflected = [x, y]
            .into_iter()
            .flatten()
            .any(|v| math::abs(v) > deadzone);
        if deflected && self.cancel_move(MotionEvent::JoystickDeflected) {
            self.push_event(ControllerEvent::MoveCancelled);
        }
    }

    /// Clamp a finite stick value; non-finite values are malformed
    fn sanitize_stick(&mut self, value: f32) -> Option<f32> {
        if value.is_finite() {
            Some(value.clamp(-1.0, 1.0))
        } else {
            self.reject(ErrorCode::InvalidValue);
            None
        }
    }

    fn request_calibration(&mut self, plan: CalibrationPlan) {
        if self.is_calibrating() {
            self.reject(ErrorCode::CalibrationInProgress);
            return;
        }
        if self.cancel_move(MotionEvent::CalibrationStarted) {
            self.push_event(ControllerEvent::MoveCancelled);
        }
        self.pending_calibration = Some(plan);
        self.status_dirty = true;
    }

    /// Refuse motion and trigger commands while calibrating
    fn ensure_not_calibrating(&mut self) -> bool {
        if self.is_calibrating() {
            self.reject(ErrorCode::CalibrationInProgress);
            false
        } else {
            true
        }
    }

    fn move_to_center(&mut self, now_ms: u64) {
        self.move_to_angle(
            AngleRequest {
                horizontal: Some(0.0),
                vertical: Some(0.0),
            },
            now_ms,
        );
    }

    fn move_to_angle(&mut self, request: AngleRequest, now_ms: u64) {
        if request.horizontal.is_none() && request.vertical.is_none() {
            return;
        }
        if !self.ensure_not_calibrating() {
            return;
        }

        let targets = request
            .horizontal
            .map(|heading| self.yaw_heading_target(heading))
            .transpose()
            .and_then(|yaw| {
                request
                    .vertical
                    .map(|deg| self.tilt_angle_target(deg))
                    .transpose()
                    .map(|tilt| (yaw, tilt))
            });

        match targets {
            Ok((yaw, tilt)) => self.start_move(yaw, tilt, now_ms),
            Err(code) => self.reject(code),
        }
    }

    fn move_by_angle(&mut self, request: AngleRequest, now_ms: u64) {
        if request.horizontal.is_none() && request.vertical.is_none() {
            return;
        }
        if !self.ensure_not_calibrating() {
            return;
        }

        let targets = request
            .horizontal
            .map(|deg| self.relative_target(Axis::Yaw, deg))
            .transpose()
            .and_then(|yaw| {
                request
                    .vertical
                    .map(|deg| self.relative_target(Axis::Tilt, deg))
                    .transpose()
                    .map(|tilt| (yaw, tilt))
            });

        match targets {
            Ok((yaw, tilt)) => self.start_move(yaw, tilt, now_ms),
            Err(code) => self.reject(code),
        }
    }

    /// Yaw offset for an absolute heading, along the shorter rotation
    fn yaw_heading_target(&self, heading: f32) -> Result<AxisGoal, ErrorCode> {
        if !heading.is_finite() {
            return Err(ErrorCode::InvalidValue);
        }
        let current = self.angles.yaw_heading(self.yaw.current_position());
        let delta = shortest_delta(current, wrap360(heading));
        let units = self.units(delta, Axis::Yaw)?;
        self.yaw.check_relative(units)?;
        Ok(AxisGoal::Relative(units))
    }

    /// Tilt target for an angle relative to the calibrated center
    fn tilt_angle_target(&self, deg: f32) -> Result<AxisGoal, ErrorCode> {
        let target = self
            .center_tilt
            .checked_add(self.units(deg, Axis::Tilt)?)
            .ok_or(ErrorCode::InvalidValue)?;
        self.tilt.check_target(target)?;
        Ok(AxisGoal::Absolute(target))
    }

    fn relative_target(&self, axis: Axis, deg: f32) -> Result<AxisGoal, ErrorCode> {
        let units = self.units(deg, axis)?;
        self.axis(axis).check_relative(units)?;
        Ok(AxisGoal::Relative(units))
    }

    /// Native units for a requested angle
    fn units(&self, deg: f32, axis: Axis) -> Result<i64, ErrorCode> {
        self.angles
            .checked_degrees_to_units(deg, axis)
            .ok_or(ErrorCode::InvalidValue)
    }

    fn axis(&self, axis: Axis) -> &AxisController {
        match axis {
            Axis::Yaw => &self.yaw,
            Axis::Tilt => &self.tilt,
        }
    }

    /// Enter an angular move toward checked goals; absent axes hold
    fn start_move(&mut self, yaw: Option<AxisGoal>, tilt: Option<AxisGoal>, now_ms: u64) {
        let committed = commit(&mut self.yaw, yaw).and_then(|_| commit(&mut self.tilt, tilt));
        if let Err(err) = committed {
            self.yaw.stop();
            self.tilt.stop();
            self.resync_jog();
            self.reject(err.into());
            return;
        }
        self.mode = self.mode.transition(MotionEvent::MoveCommanded { at: now_ms });
        self.push_event(ControllerEvent::MoveStarted);
    }

    fn fire(&mut self, mode: FireMode, now_ms: u64) {
        if !self.ensure_not_calibrating() {
            return;
        }
        let outcome = match mode {
            FireMode::Single => self.trigger.fire(now_ms),
            FireMode::Burst => self.trigger.start_burst(now_ms),
        };
        if let Err(err) = outcome {
            self.reject(err.into());
        }
        self.status_dirty = true;
    }
}
