//! Events that trigger motion mode transitions

/// Events that can change the motion mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionEvent {
    /// Accepted absolute or relative angular move
    MoveCommanded { at: u64 },
    /// Both axes reached their targets
    TargetReached,
    /// Angular move exceeded its time budget
    TimedOut,
    /// Explicit cancel request
    Cancelled,
    /// Fresh joystick input beyond the deadzone
    JoystickDeflected,
    /// Calibration or homing started
    CalibrationStarted,
    /// Commander connected or disconnected
    ClientChanged,
}
