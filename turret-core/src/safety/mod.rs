//! Safety supervision
//!
//! Detects stale control input and runaway angular moves.

pub mod monitor;

pub use monitor::{ControlFreshness, SafetyStatus, SafetySupervisor};
