//! Stepper motor driver trait
//!
//! Abstracts the raw pulse generator (PIO state machine, timer, or a mock)
//! behind a signed-speed interface. Position bookkeeping lives in the
//! core's axis controller, not in the driver.

/// Trait for speed-driven stepper outputs
pub trait StepperDriver {
    /// Set the signed step rate in native units per second
    ///
    /// The sign selects the direction pin; zero stops pulse output. Values
    /// above the driver's pulse ceiling are clamped by the driver.
    fn set_speed(&mut self, steps_per_s: f32);

    /// Enable or disable the motor driver
    ///
    /// When disabled, the motor is free to rotate and does not hold position.
    fn enable(&mut self, enabled: bool);

    /// Check if the motor driver is enabled
    fn is_enabled(&self) -> bool;
}
