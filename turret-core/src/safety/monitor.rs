//! Safety supervisor implementation
//!
//! Monitors control input freshness, commander connectivity and angular
//! move duration.

use crate::config::SafetyConfig;
use crate::state::MotionMode;

/// Safety condition status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SafetyStatus {
    /// All conditions normal
    Ok,
    /// No commander or stale input while jogging: stop everything
    InputStale,
    /// Angular move ran past its time budget: cancel it
    AngularTimeout,
}

/// Control freshness tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlFreshness {
    pub last_input_at: u64,
    pub client_connected: bool,
}

/// Safety supervisor for forced stops
///
/// Pure bookkeeping; the controller applies the stop.
#[derive(Debug, Clone)]
pub struct SafetySupervisor {
    freshness: ControlFreshness,
    config: SafetyConfig,
}

impl SafetySupervisor {
    /// Create a supervisor with no commander connected
    pub fn new(config: SafetyConfig) -> Self {
        Self {
            freshness: ControlFreshness::default(),
            config,
        }
    }

    /// Record an accepted joystick input
    pub fn input_received(&mut self, now_ms: u64) {
        self.freshness.last_input_at = now_ms;
    }

    /// Record a commander connecting or leaving
    ///
    /// A new connection counts as fresh input.
    pub fn set_connected(&mut self, connected: bool, now_ms: u64) {
        self.freshness.client_connected = connected;
        if connected {
            self.freshness.last_input_at = now_ms;
        }
    }

    pub fn freshness(&self) -> &ControlFreshness {
        &self.freshness
    }

    pub fn is_client_connected(&self) -> bool {
        self.freshness.client_connected
    }

    /// No commander, or no input within the hard threshold
    pub fn is_input_stale(&self, now_ms: u64) -> bool {
        !self.freshness.client_connected
            || now_ms.saturating_sub(self.freshness.last_input_at) > self.config.input_timeout_ms as u64
    }

    /// Check all safety conditions for this tick
    pub fn check(&self, now_ms: u64, mode: MotionMode) -> SafetyStatus {
        match mode.angular_elapsed(now_ms) {
            Some(elapsed) if elapsed > self.config.angular_timeout_ms as u64 => {
                SafetyStatus::AngularTimeout
            }
            // Commanded moves run to completion without joystick input
            Some(_) => SafetyStatus::Ok,
            None if self.is_input_stale(now_ms) => SafetyStatus::InputStale,
            None => SafetyStatus::Ok,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supervisor() -> SafetySupervisor {
        SafetySupervisor::new(SafetyConfig {
            input_timeout_ms: 500,
            angular_timeout_ms: 10_000,
            ..SafetyConfig::default()
        })
    }

    #[test]
    fn test_no_commander_is_stale() {
        let safety = supervisor();
        assert_eq!(safety.check(0, MotionMode::Jogging), SafetyStatus::InputStale);
    }

    #[test]
    fn test_fresh_input_is_ok() {
        let mut safety = supervisor();
        safety.set_connected(true, 0);
        safety.input_received(300);
        assert_eq!(safety.check(800, MotionMode::Jogging), SafetyStatus::Ok);
        assert_eq!(safety.check(801, MotionMode::Jogging), SafetyStatus::InputStale);
    }

    #[test]
    fn test_disconnect_is_immediately_stale() {
        let mut safety = supervisor();
        safety.set_connected(true, 0);
        safety.input_received(10);
        safety.set_connected(false, 20);
        assert!(safety.is_input_stale(20));
    }

    #[test]
    fn test_angular_move_ignores_stale_input() {
        let safety = supervisor();
        let mode = MotionMode::AngularMove { started_at: 0 };
        assert_eq!(safety.check(5000, mode), SafetyStatus::Ok);
        assert!(safety.is_input_stale(5000));
    }

    #[test]
    fn test_angular_timeout() {
        let safety = supervisor();
        let mode = MotionMode::AngularMove { started_at: 1000 };
        assert_eq!(safety.check(11_000, mode), SafetyStatus::Ok);
        assert_eq!(safety.check(11_001, mode), SafetyStatus::AngularTimeout);
    }
}
