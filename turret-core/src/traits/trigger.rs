//! Trigger actuator trait

/// Two-position trigger output (servo or solenoid)
pub trait TriggerActuator {
    /// Move to the fire position (`true`) or the rest position (`false`)
    fn set_pulled(&mut self, pulled: bool);
}
