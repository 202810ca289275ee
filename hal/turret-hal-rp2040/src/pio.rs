//! PIO step pulse timing
//!
//! Each stepper gets its own PIO state machine, all running one shared
//! program that toggles the step pin forever. The step rate is set purely
//! through the state machine clock divider, so changing speed never stalls
//! the pulse train.
//!
//! The program spends [`CYCLES_PER_STEP`] PIO cycles per step. With the
//! 16.8 fixed-point divider capped at 65535, that puts the slowest rate at
//! about 7.5 Hz; anything slower is rounded up to [`MIN_STEP_FREQ_HZ`].

use turret_core::math;

/// System clock frequency (RP2040 default)
pub const SYS_CLK_HZ: u32 = 125_000_000;

/// PIO cycles per step pulse: eight instructions of 32 cycles each
pub const CYCLES_PER_STEP: u32 = 256;

/// Slowest step rate reachable with the largest divider
pub const MIN_STEP_FREQ_HZ: u32 = 8;

/// Step rate ceiling, well under what common drivers accept
pub const MAX_STEP_FREQ_HZ: u32 = 100_000;

/// Pulse output for one signed speed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepCommand {
    /// Positive direction (native position increasing)
    pub forward: bool,
    /// Step rate in Hz, 0 when stopped
    pub freq_hz: u32,
}

impl StepCommand {
    pub const STOP: Self = Self {
        forward: true,
        freq_hz: 0,
    };

    /// Convert a signed step rate into a direction and a pulse frequency
    pub fn from_speed(steps_per_s: f32) -> Self {
        if !steps_per_s.is_finite() {
            return Self::STOP;
        }
        let rate = math::round(math::abs(steps_per_s));
        if rate <= 0 {
            return Self::STOP;
        }
        Self {
            forward: steps_per_s > 0.0,
            freq_hz: (rate as u64).clamp(MIN_STEP_FREQ_HZ as u64, MAX_STEP_FREQ_HZ as u64) as u32,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.freq_hz == 0
    }
}

/// Clock divider for a step frequency
///
/// The program runs at SYS_CLK / divider and takes [`CYCLES_PER_STEP`]
/// cycles per step, so divider = SYS_CLK / (freq * CYCLES_PER_STEP).
///
/// Returns the raw 16.8 fixed-point bits.
pub fn clock_divider_bits(freq_hz: u32) -> u32 {
    if freq_hz == 0 {
        return 0xFFFF_FF;
    }
    let divisor = freq_hz as u64 * CYCLES_PER_STEP as u64;
    let divider_x256 = (SYS_CLK_HZ as u64 * 256) / divisor;
    // A divider below 1.0 is not allowed
    divider_x256.clamp(256, 0xFFFF_FF) as u32
}
