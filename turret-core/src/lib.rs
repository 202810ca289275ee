//! Board-agnostic core logic for the turret firmware
//!
//! This crate contains all motion and safety logic that does not depend
//! on specific hardware:
//!
//! - Hardware abstraction traits (stepper, trigger)
//! - Angle conversion between degrees and native step units
//! - Per-axis motion with trapezoidal position moves
//! - Joystick jogging, calibration and trigger sequencing
//! - Safety supervision of commander input
//! - The [`Controller`] aggregate tying it together
//!
//! Everything is driven by explicit timestamps so it runs the same on the
//! target and in host tests.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod angle;
pub mod calibration;
pub mod config;
pub mod controller;
pub mod jog;
pub mod math;
pub mod motion;
pub mod safety;
pub mod sensor;
pub mod state;
pub mod traits;
pub mod trigger;

pub use config::{ConfigError, TurretConfig};
pub use controller::{ActuatorCommand, Controller, ControllerEvent};
pub use sensor::{SensorSnapshot, SensorState};
