//! Motion mode state machine
//!
//! Exactly one motion mode is active. Joystick jogging is the resting mode;
//! angular moves run until their targets are reached or something cancels
//! them.

use super::events::MotionEvent;

/// Global motion mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionMode {
    /// Joystick controls both axes
    #[default]
    Jogging,
    /// Point-to-point move toward absolute targets
    AngularMove {
        /// Controller time the move was commanded
        started_at: u64,
    },
}

impl MotionMode {
    pub fn is_angular(&self) -> bool {
        matches!(self, MotionMode::AngularMove { .. })
    }

    /// Milliseconds an angular move has been running
    pub fn angular_elapsed(&self, now_ms: u64) -> Option<u64> {
        match self {
            MotionMode::AngularMove { started_at } => Some(now_ms.saturating_sub(*started_at)),
            MotionMode::Jogging => None,
        }
    }

    /// Process an event and return the next mode
    pub fn transition(self, event: MotionEvent) -> Self {
        use MotionEvent::*;
        use MotionMode::*;

        match (self, event) {
            // A new move replaces the running one and restarts its clock
            (_, MoveCommanded { at }) => AngularMove { started_at: at },

            (AngularMove { .. }, TargetReached)
            | (AngularMove { .. }, TimedOut)
            | (AngularMove { .. }, Cancelled)
            | (AngularMove { .. }, JoystickDeflected) => Jogging,

            (_, CalibrationStarted) | (_, ClientChanged) => Jogging,

            // Everything else leaves the mode unchanged
            (mode, _) => mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_enters_angular_mode() {
        let mode = MotionMode::Jogging.transition(MotionEvent::MoveCommanded { at: 40 });
        assert_eq!(mode, MotionMode::AngularMove { started_at: 40 });
        assert_eq!(mode.angular_elapsed(100), Some(60));
    }

    #[test]
    fn test_every_exit_returns_to_jogging() {
        let moving = MotionMode::AngularMove { started_at: 0 };
        for event in [
            MotionEvent::TargetReached,
            MotionEvent::TimedOut,
            MotionEvent::Cancelled,
            MotionEvent::JoystickDeflected,
            MotionEvent::CalibrationStarted,
            MotionEvent::ClientChanged,
        ] {
            assert_eq!(moving.transition(event), MotionMode::Jogging);
        }
    }

    #[test]
    fn test_jogging_ignores_move_exits() {
        for event in [
            MotionEvent::TargetReached,
            MotionEvent::TimedOut,
            MotionEvent::Cancelled,
            MotionEvent::JoystickDeflected,
        ] {
            assert_eq!(MotionMode::Jogging.transition(event), MotionMode::Jogging);
        }
    }

    #[test]
    fn test_new_move_restarts_clock() {
        let moving = MotionMode::AngularMove { started_at: 0 };
        assert_eq!(
            moving.transition(MotionEvent::MoveCommanded { at: 900 }),
            MotionMode::AngularMove { started_at: 900 }
        );
    }
}
