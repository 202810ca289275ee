//! RP2040-specific HAL for the turret firmware
//!
//! Implements the core's hardware traits on RP2040 peripherals:
//!
//! - PIO-based step pulse generation with a GPIO direction pin
//!   (implements `turret_core::traits::StepperDriver`)
//! - PWM hobby-servo trigger (implements `turret_core::traits::TriggerActuator`)

#![no_std]
#![deny(unsafe_code)]

pub mod pio;
pub mod servo;
pub mod stepper;

pub use servo::{ServoConfig, ServoTrigger};
pub use stepper::{PioStepper, StepProgram};
