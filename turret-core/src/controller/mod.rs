//! Turret controller
//!
//! One owned aggregate holding every piece of motion and safety state. The
//! control loop calls [`Controller::tick`] at a fixed interval with a sensor
//! snapshot and applies the returned [`ActuatorCommand`]; the link task
//! feeds decoded commands through [`Controller::handle_command`] between
//! ticks. Nothing here blocks or allocates.

mod router;
mod status;


use heapless::{Deque, HistoryBuffer};
use turret_protocol::{Angles, ErrorCode, ErrorEntry};
use turret_protocol::messages::MAX_ERROR_ENTRIES;

use crate::angle::AngleModel;
use crate::calibration::{CalibrationEngine, CalibrationPlan, CalibrationResult};
use crate::config::{ConfigError, TurretConfig};
use crate::jog::JogController;
use crate::motion::{Axis, AxisController};
use crate::safety::{SafetyStatus, SafetySupervisor};
use crate::sensor::SensorSnapshot;
use crate::state::{MotionEvent, MotionMode};
use crate::traits::{StepperDriver, TriggerActuator};
use crate::trigger::{BurstEnd, TriggerSequencer};

/// Pending controller events kept for the firmware
pub const EVENT_QUEUE_SIZE: usize = 16;

/// Outputs for one control tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActuatorCommand {
    /// Signed yaw step rate in native units per second
    pub yaw_speed: f32,
    /// Signed tilt step rate in native units per second
    pub tilt_speed: f32,
    pub trigger_pulled: bool,
}

impl ActuatorCommand {
    /// Drive the hardware outputs
    pub fn apply<Y, P, T>(&self, yaw: &mut Y, tilt: &mut P, trigger: &mut T)
    where
        Y: StepperDriver,
        P: StepperDriver,
        T: TriggerActuator,
    {
        yaw.set_speed(self.yaw_speed);
        tilt.set_speed(self.tilt_speed);
        trigger.set_pulled(self.trigger_pulled);
    }
}

/// Things the firmware should log or report
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControllerEvent {
    ClientConnected,
    ClientDisconnected,
    CalibrationStarted(CalibrationPlan),
    CalibrationFinished(CalibrationResult),
    MoveStarted,
    /// Angular move reached both targets
    MovementComplete(Angles),
    MoveCancelled,
    MoveTimedOut,
    /// Stale input or no commander: motion stopped
    SafetyStopEngaged,
    SafetyStopCleared,
    BurstFinished(BurstEnd),
    CommandRejected(ErrorCode),
}

/// The motion-and-safety controller
#[derive(Debug)]
pub struct Controller {
    angles: AngleModel,
    yaw: AxisController,
    tilt: AxisController,
    /// Tilt native position reading as 0°
    center_tilt: i64,
    calibration: CalibrationEngine,
    /// Requested run, started on the next tick
    pending_calibration: Option<CalibrationPlan>,
    jog: JogController,
    trigger: TriggerSequencer,
    safety: SafetySupervisor,
    safety_stop: bool,
    mode: MotionMode,
    /// Raw joystick (x, y) in [-1, 1]
    stick: (f32, f32),
    sensors: SensorSnapshot,
    last_tick_ms: Option<u64>,
    now_ms: u64,
    errors: HistoryBuffer<ErrorEntry, MAX_ERROR_ENTRIES>,
    events: Deque<ControllerEvent, EVENT_QUEUE_SIZE>,
    status_dirty: bool,
}

impl Controller {
    /// Build a controller from a configuration
    pub fn new(config: TurretConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let angles = AngleModel::new(&config.yaw, &config.tilt);
        Ok(Self {
            angles,
            yaw: AxisController::new(Axis::Yaw, &config.yaw),
            tilt: AxisController::new(Axis::Tilt, &config.tilt),
            center_tilt: 0,
            calibration: CalibrationEngine::new(&config, &angles),
            pending_calibration: None,
            jog: JogController::new(config.jog),
            trigger: TriggerSequencer::new(config.trigger),
            safety: SafetySupervisor::new(config.safety),
            safety_stop: false,
            mode: MotionMode::Jogging,
            stick: (0.0, 0.0),
            sensors: SensorSnapshot::default(),
            last_tick_ms: None,
            now_ms: 0,
            errors: HistoryBuffer::new(),
            events: Deque::new(),
            status_dirty: true,
        })
    }

    /// Run one control step
    ///
    /// Order: safety, trigger, then calibration, angular move or jogging.
    pub fn tick(&mut self, now_ms: u64, sensors: SensorSnapshot) -> ActuatorCommand {
        // Unclamped: the drivers kept stepping for the whole interval
        let dt_ms = self
            .last_tick_ms
            .map_or(0, |last| now_ms.saturating_sub(last));
        let dt = dt_ms as f32 / 1000.0;
        self.last_tick_ms = Some(now_ms);
        self.now_ms = now_ms;
        if sensors != self.sensors {
            self.status_dirty = true;
        }
        self.sensors = sensors;

        self.supervise(now_ms);

        if let Some(end) = self.trigger.tick(now_ms) {
            self.push_event(ControllerEvent::BurstFinished(end));
        }

        if self.is_calibrating() {
            self.step_calibration(now_ms, sensors, dt);
        } else if self.mode.is_angular() {
            self.yaw.tick_position_mode(dt);
            self.tilt.tick_position_mode(dt);
            if self.yaw.distance_to_target() == 0 && self.tilt.distance_to_target() == 0 {
                self.mode = self.mode.transition(MotionEvent::TargetReached);
                self.resync_jog();
                let angles = self.angles();
                self.push_event(ControllerEvent::MovementComplete(angles));
            }
        } else {
            self.jog
                .tick(dt_ms, self.stick, sensors, &mut self.yaw, &mut self.tilt);
        }

        self.actuator_command()
    }

    /// Outputs reflecting the current state
    pub fn actuator_command(&self) -> ActuatorCommand {
        ActuatorCommand {
            yaw_speed: self.yaw.speed(),
            tilt_speed: self.tilt.speed(),
            trigger_pulled: self.trigger.is_pulled(),
        }
    }

    /// A commander connected; counts as fresh input
    pub fn client_connected(&mut self, now_ms: u64) {
        self.safety.set_connected(true, now_ms);
        self.client_changed();
        self.push_event(ControllerEvent::ClientConnected);
    }

    /// The commander left or went silent
    pub fn client_disconnected(&mut self, now_ms: u64) {
        self.safety.set_connected(false, now_ms);
        self.client_changed();
        self.push_event(ControllerEvent::ClientDisconnected);
    }

    /// Record an undecodable message
    pub fn report_malformed(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
        self.reject(ErrorCode::MalformedMessage);
    }

    /// Next queued event, oldest first
    pub fn take_event(&mut self) -> Option<ControllerEvent> {
        self.events.pop_front()
    }

    /// Whether a status push is due since the last call
    pub fn take_status_dirty(&mut self) -> bool {
        core::mem::replace(&mut self.status_dirty, false)
    }

    pub fn yaw(&self) -> &AxisController {
        &self.yaw
    }

    pub fn tilt(&self) -> &AxisController {
        &self.tilt
    }

    pub fn mode(&self) -> MotionMode {
        self.mode
    }

    pub fn trigger(&self) -> &TriggerSequencer {
        &self.trigger
    }

    pub fn angle_model(&self) -> &AngleModel {
        &self.angles
    }

    pub fn center_tilt(&self) -> i64 {
        self.center_tilt
    }

    pub fn stick(&self) -> (f32, f32) {
        self.stick
    }

    pub fn is_calibrating(&self) -> bool {
        self.pending_calibration.is_some() || self.calibration.is_running()
    }

    /// Both axes usable for angular moves
    pub fn is_calibrated(&self) -> bool {
        self.yaw.is_calibrated() && self.tilt.is_calibrated()
    }

    /// Current angles: yaw heading in [0, 360), tilt relative to center
    pub fn angles(&self) -> Angles {
        Angles {
            horizontal: self.angles.yaw_heading(self.yaw.current_position()),
            vertical: self
                .angles
                .units_to_degrees(self.tilt.current_position() - self.center_tilt, Axis::Tilt),
        }
    }

    fn supervise(&mut self, now_ms: u64) {
        match self.safety.check(now_ms, self.mode) {
            SafetyStatus::AngularTimeout => {
                self.cancel_move(MotionEvent::TimedOut);
                self.record_error(ErrorCode::AngularMoveTimeout);
                self.push_event(ControllerEvent::MoveTimedOut);
            }
            SafetyStatus::InputStale => {
                if !self.safety_stop {
                    self.safety_stop = true;
                    self.push_event(ControllerEvent::SafetyStopEngaged);
                }
                // Calibration is bounded by its own phase timeouts
                if !self.is_calibrating() {
                    self.stick = (0.0, 0.0);
                    self.yaw.stop();
                    self.tilt.stop();
                    self.resync_jog();
                }
            }
            SafetyStatus::Ok => {
                if self.safety_stop && !self.safety.is_input_stale(now_ms) {
                    self.safety_stop = false;
                    self.push_event(ControllerEvent::SafetyStopCleared);
                }
            }
        }
    }

    fn step_calibration(&mut self, now_ms: u64, sensors: SensorSnapshot, dt: f32) {
        let finished = match self.pending_calibration.take() {
            Some(plan) => {
                self.push_event(ControllerEvent::CalibrationStarted(plan));
                self.calibration.start(
                    plan,
                    now_ms,
                    sensors,
                    self.center_tilt,
                    &mut self.yaw,
                    &mut self.tilt,
                )
            }
            None => self
                .calibration
                .advance(now_ms, sensors, &mut self.yaw, &mut self.tilt),
        };

        match finished {
            Some(result) => self.finish_calibration(result),
            None => {
                self.yaw.tick(dt);
                self.tilt.tick(dt);
            }
        }
    }

    fn finish_calibration(&mut self, result: CalibrationResult) {
        self.center_tilt = result.center_tilt;
        for fault in [result.yaw_fault, result.tilt_fault].into_iter().flatten() {
            self.record_error(fault.into());
        }
        self.yaw.stop();
        self.tilt.stop();
        self.resync_jog();
        self.push_event(ControllerEvent::CalibrationFinished(result));
    }

    /// Leave an angular move, stopping both axes
    fn cancel_move(&mut self, event: MotionEvent) -> bool {
        if !self.mode.is_angular() {
            return false;
        }
        self.mode = self.mode.transition(event);
        self.yaw.stop();
        self.tilt.stop();
        self.resync_jog();
        true
    }

    fn client_changed(&mut self) {
        self.stick = (0.0, 0.0);
        if self.cancel_move(MotionEvent::ClientChanged) {
            self.push_event(ControllerEvent::MoveCancelled);
        }
        if !self.is_calibrating() {
            self.yaw.stop();
            self.tilt.stop();
        }
        self.resync_jog();
    }

    fn resync_jog(&mut self) {
        self.jog.reset(self.yaw.current_position());
    }

    fn push_event(&mut self, event: ControllerEvent) {
        if self.events.is_full() {
            self.events.pop_front();
        }
        // Space was made above
        let _ = self.events.push_back(event);
        self.status_dirty = true;
    }
}
