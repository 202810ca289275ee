//! Hardware abstraction traits
//!
//! These traits define the interface between the controller's actuator
//! commands and hardware-specific implementations.

pub mod stepper;
pub mod trigger;

pub use stepper::StepperDriver;
pub use trigger::TriggerActuator;
