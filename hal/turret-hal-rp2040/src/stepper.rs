//! PIO-based stepper motor driver
//!
//! Step pulses come from a PIO state machine; direction and enable are
//! plain GPIO outputs.

use embassy_rp::gpio::{Level, Output, Pin};
use embassy_rp::pio::{
    Common, Config, Direction as PioDirection, Instance, LoadedProgram, PioPin, StateMachine,
};
use embassy_rp::Peri;
use fixed::types::U24F8;

use turret_core::traits::StepperDriver;

use crate::pio::{clock_divider_bits, StepCommand};

/// Step program loaded once per PIO block and shared by its state machines
pub struct StepProgram<'d, PIO: Instance> {
    program: LoadedProgram<'d, PIO>,
}

impl<'d, PIO: Instance> StepProgram<'d, PIO> {
    /// Load the square-wave step program
    pub fn load(common: &mut Common<'d, PIO>) -> Self {
        let prg = pio::pio_asm!(
            ".wrap_target",
            "set pins, 1 [31]",
            "nop [31]",
            "nop [31]",
            "nop [31]",
            "set pins, 0 [31]",
            "nop [31]",
            "nop [31]",
            "nop [31]",
            ".wrap"
        );
        Self {
            program: common.load_program(&prg.program),
        }
    }
}

/// Output polarity for one stepper driver board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepperPolarity {
    /// Enable pin is active low (A4988, DRV8825, TMC2209)
    pub enable_inverted: bool,
    /// Swap the direction pin so positive speed matches positive position
    pub dir_inverted: bool,
}

impl Default for StepperPolarity {
    fn default() -> Self {
        Self {
            enable_inverted: true,
            dir_inverted: false,
        }
    }
}

/// PIO stepper driver
pub struct PioStepper<'d, PIO: Instance, const SM: usize> {
    sm: StateMachine<'d, PIO, SM>,
    dir_pin: Output<'d>,
    enable_pin: Output<'d>,
    polarity: StepperPolarity,
    current: StepCommand,
    running: bool,
    enabled: bool,
}

impl<'d, PIO: Instance, const SM: usize> PioStepper<'d, PIO, SM> {
    /// Create a stopped, disabled stepper on one state machine
    pub fn new<STEP: PioPin, DIR: Pin, EN: Pin>(
        common: &mut Common<'d, PIO>,
        mut sm: StateMachine<'d, PIO, SM>,
        program: &StepProgram<'d, PIO>,
        step_pin: Peri<'d, STEP>,
        dir_pin: Peri<'d, DIR>,
        enable_pin: Peri<'d, EN>,
        polarity: StepperPolarity,
    ) -> Self {
        let step_pio_pin = common.make_pio_pin(step_pin);

        let mut cfg = Config::default();
        cfg.use_program(&program.program, &[]);
        cfg.set_set_pins(&[&step_pio_pin]);
        cfg.clock_divider = U24F8::from_bits(clock_divider_bits(0));

        sm.set_config(&cfg);
        sm.set_pin_dirs(PioDirection::Out, &[&step_pio_pin]);

        let dir_pin = Output::new(dir_pin, Level::Low);
        let disabled = if polarity.enable_inverted {
            Level::High
        } else {
            Level::Low
        };
        let enable_pin = Output::new(enable_pin, disabled);

        Self {
            sm,
            dir_pin,
            enable_pin,
            polarity,
            current: StepCommand::STOP,
            running: false,
            enabled: false,
        }
    }

    /// Pulse output currently programmed
    pub fn current(&self) -> StepCommand {
        self.current
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn apply(&mut self, command: StepCommand) {
        if command.is_stopped() {
            if self.running {
                self.sm.set_enable(false);
                self.running = false;
            }
            self.current = command;
            return;
        }

        if command.forward != self.current.forward || !self.running {
            let high = command.forward != self.polarity.dir_inverted;
            self.dir_pin.set_level(if high { Level::High } else { Level::Low });
        }
        if command.freq_hz != self.current.freq_hz {
            self.sm
                .set_clock_divider(U24F8::from_bits(clock_divider_bits(command.freq_hz)));
        }
        if !self.running {
            self.sm.set_enable(true);
            self.running = true;
        }
        self.current = command;
    }
}

impl<'d, PIO: Instance, const SM: usize> StepperDriver for PioStepper<'d, PIO, SM> {
    fn set_speed(&mut self, steps_per_s: f32) {
        self.apply(StepCommand::from_speed(steps_per_s));
    }

    fn enable(&mut self, enabled: bool) {
        let high = enabled != self.polarity.enable_inverted;
        self.enable_pin
            .set_level(if high { Level::High } else { Level::Low });
        self.enabled = enabled;
        if !enabled {
            self.apply(StepCommand::STOP);
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}
