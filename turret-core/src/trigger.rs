//! Trigger sequencing
//!
//! A single pull is `Idle → Pulled → Returning → Idle`, one transition per
//! tick at most. Bursts layer a fixed shot count and spacing on top, each
//! shot waiting for the trigger to be idle, with a hard total timeout.

use turret_protocol::ErrorCode;

use crate::config::TriggerConfig;

/// Trigger actuator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerState {
    #[default]
    Idle,
    /// In the fire position since the given time
    Pulled { since: u64 },
    /// Travelling back to rest since the given time
    Returning { since: u64 },
}

/// Reasons a fire request is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerError {
    /// Trigger is mid-cycle
    Busy,
    /// A burst owns the trigger
    BurstActive,
}

impl From<TriggerError> for ErrorCode {
    fn from(err: TriggerError) -> Self {
        match err {
            TriggerError::Busy => ErrorCode::TriggerBusy,
            TriggerError::BurstActive => ErrorCode::BurstActive,
        }
    }
}

/// Progress of a fixed-count burst
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BurstState {
    pub active: bool,
    pub shots_fired: u8,
    pub next_shot_due: u64,
    pub started_at: u64,
}

/// How a burst ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BurstEnd {
    /// All shots fired and the trigger returned to rest
    Completed { shots: u8 },
    /// Total timeout hit first
    TimedOut { shots: u8 },
}

/// Non-blocking trigger and burst sequencer
#[derive(Debug, Clone)]
pub struct TriggerSequencer {
    state: TriggerState,
    burst: BurstState,
    config: TriggerConfig,
}

impl TriggerSequencer {
    pub fn new(config: TriggerConfig) -> Self {
        Self {
            state: TriggerState::Idle,
            burst: BurstState::default(),
            config,
        }
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    pub fn burst(&self) -> &BurstState {
        &self.burst
    }

    /// Trigger output should be in the fire position
    pub fn is_pulled(&self) -> bool {
        matches!(self.state, TriggerState::Pulled { .. })
    }

    /// Trigger mid-cycle or a burst running
    pub fn is_active(&self) -> bool {
        self.state != TriggerState::Idle || self.burst.active
    }

    /// Request a single shot
    pub fn fire(&mut self, now_ms: u64) -> Result<(), TriggerError> {
        if self.burst.active {
            return Err(TriggerError::BurstActive);
        }
        if self.state != TriggerState::Idle {
            return Err(TriggerError::Busy);
        }
        self.state = TriggerState::Pulled { since: now_ms };
        Ok(())
    }

    /// Request a burst; the first shot goes out on the next idle tick
    pub fn start_burst(&mut self, now_ms: u64) -> Result<(), TriggerError> {
        if self.burst.active {
            return Err(TriggerError::BurstActive);
        }
        self.burst = BurstState {
            active: true,
            shots_fired: 0,
            next_shot_due: now_ms,
            started_at: now_ms,
        };
        Ok(())
    }

    /// Advance the trigger, then the burst
    pub fn tick(&mut self, now_ms: u64) -> Option<BurstEnd> {
        self.state = match self.state {
            TriggerState::Pulled { since } if now_ms.saturating_sub(since) >= self.config.hold_ms as u64 => {
                TriggerState::Returning { since: now_ms }
            }
            TriggerState::Returning { since }
                if now_ms.saturating_sub(since) >= self.config.settle_ms as u64 =>
            {
                TriggerState::Idle
            }
            state => state,
        };

        if !self.burst.active {
            return None;
        }

        let shots = self.burst.shots_fired;
        if shots >= self.config.burst_count && self.state == TriggerState::Idle {
            self.burst.active = false;
            return Some(BurstEnd::Completed { shots });
        }
        if now_ms.saturating_sub(self.burst.started_at) >= self.config.burst_timeout_ms as u64 {
            self.burst.active = false;
            return Some(BurstEnd::TimedOut { shots });
        }
        if shots < self.config.burst_count
            && now_ms >= self.burst.next_shot_due
            && self.state == TriggerState::Idle
        {
            self.state = TriggerState::Pulled { since: now_ms };
            self.burst.shots_fired += 1;
            self.burst.next_shot_due = now_ms + self.config.burst_interval_ms as u64;
        }
        None
    }
}
