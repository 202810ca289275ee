//! Status snapshots and the error log

use heapless::Vec;
use turret_protocol::{ErrorCode, ErrorEntry, ModeTag, Positions, Status};

use super::{Controller, ControllerEvent};
use crate::state::MotionMode;

impl Controller {
    /// Assemble a status snapshot
    pub fn status(&self) -> Status {
        let mode = if self.is_calibrating() {
            ModeTag::Calibrating
        } else {
            match self.mode {
                MotionMode::Jogging => ModeTag::Jogging,
                MotionMode::AngularMove { .. } => ModeTag::AngularMove,
            }
        };

        let mut errors = Vec::new();
        for entry in self.errors.oldest_ordered() {
            // Ring and snapshot share one capacity
            let _ = errors.push(*entry);
        }

        Status {
            calibrated: self.is_calibrated(),
            calibrating: self.is_calibrating(),
            yaw_homed: self.yaw.is_calibrated(),
            tilt_calibrated: self.tilt.is_calibrated(),
            angles: self.angles(),
            positions: Positions {
                yaw: self.yaw.current_position(),
                tilt: self.tilt.current_position(),
            },
            mode,
            sensors: self.sensors.to_flags(),
            trigger_active: self.trigger.is_active(),
            burst_active: self.trigger.burst().active,
            input_stale: self.safety.is_input_stale(self.now_ms),
            client_connected: self.safety.is_client_connected(),
            tilt_limits: self.tilt.soft_limits(),
            errors,
        }
    }

    /// Recent errors, oldest first
    pub fn errors(&self) -> impl Iterator<Item = &ErrorEntry> + '_ {
        self.errors.oldest_ordered()
    }

    pub(super) fn record_error(&mut self, code: ErrorCode) {
        self.errors.write(ErrorEntry {
            code,
            at_ms: self.now_ms,
        });
        self.status_dirty = true;
    }

    /// Log a refused command; no other state changes
    pub(super) fn reject(&mut self, code: ErrorCode) {
        self.record_error(code);
        self.push_event(ControllerEvent::CommandRejected(code));
    }
}
