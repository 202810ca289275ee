//! PWM hobby-servo trigger output
//!
//! The servo expects a 50 Hz frame with a 1-2 ms pulse. The PWM slice runs
//! at 125 MHz / 64, giving 125/64 counter ticks per microsecond. Both
//! channel compares carry the pulse, so the servo may sit on either pin of
//! the slice.

use embassy_rp::pwm::{Config as PwmConfig, Pwm};

use turret_core::traits::TriggerActuator;

/// PWM clock divider (integer part)
pub const PWM_DIVIDER: u8 = 64;

/// Servo frame period
pub const SERVO_PERIOD_US: u32 = 20_000;

/// Counter wrap value for a 20 ms frame
pub const PWM_TOP: u16 = (SERVO_PERIOD_US * 125 / 64 - 1) as u16;

/// Compare value for a pulse width in microseconds
pub const fn pulse_to_compare(pulse_us: u16) -> u16 {
    let ticks = pulse_us as u32 * 125 / 64;
    if ticks > PWM_TOP as u32 {
        PWM_TOP
    } else {
        ticks as u16
    }
}

/// Servo pulse widths for the two trigger positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServoConfig {
    pub rest_us: u16,
    pub pulled_us: u16,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            rest_us: 1000,
            pulled_us: 2000,
        }
    }
}

/// Trigger servo on one PWM slice
pub struct ServoTrigger<'d> {
    pwm: Pwm<'d>,
    pwm_config: PwmConfig,
    servo: ServoConfig,
    pulled: bool,
}

impl<'d> ServoTrigger<'d> {
    /// Take over a PWM slice and park the servo at rest
    pub fn new(mut pwm: Pwm<'d>, servo: ServoConfig) -> Self {
        let mut pwm_config = PwmConfig::default();
        pwm_config.divider = PWM_DIVIDER.into();
        pwm_config.top = PWM_TOP;
        pwm_config.compare_a = pulse_to_compare(servo.rest_us);
        pwm_config.compare_b = pwm_config.compare_a;
        pwm.set_config(&pwm_config);

        Self {
            pwm,
            pwm_config,
            servo,
            pulled: false,
        }
    }

    pub fn is_pulled(&self) -> bool {
        self.pulled
    }
}

impl<'d> TriggerActuator for ServoTrigger<'d> {
    fn set_pulled(&mut self, pulled: bool) {
        if pulled == self.pulled {
            return;
        }
        let pulse = if pulled {
            self.servo.pulled_us
        } else {
            self.servo.rest_us
        };
        self.pwm_config.compare_a = pulse_to_compare(pulse);
        self.pwm_config.compare_b = self.pwm_config.compare_a;
        self.pwm.set_config(&self.pwm_config);
        self.pulled = pulled;
    }
}
