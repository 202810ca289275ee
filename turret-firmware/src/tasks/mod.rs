//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels.

pub mod control;
pub mod link_rx;
pub mod link_tx;
pub mod sensors;

pub use control::{control_task, Actuators};
pub use link_rx::link_rx_task;
pub use link_tx::link_tx_task;
pub use sensors::{sensor_task, SensorInputs};
