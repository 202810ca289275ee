//! Axis motion control
//!
//! Position and speed mode stepping for the yaw and tilt axes.

pub mod axis;

pub use axis::{Axis, AxisController, AxisError, AxisState};
