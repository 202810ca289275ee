//! Motion mode state machine
//!
//! The mode switch between joystick jogging and angular moves is explicit,
//! finite, and deterministic.

pub mod events;
pub mod machine;

pub use events::MotionEvent;
pub use machine::MotionMode;
