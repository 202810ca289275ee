//! Turret - Two-Axis Turret Controller Firmware
//!
//! Main firmware binary for RP2040-based pan/tilt turrets. A host
//! commander drives the turret over a framed UART link; the motion and
//! safety logic lives in `turret-core`.
//!
//! Pin assignments follow the SKR Pico layout: the X and Y driver sockets
//! carry yaw and tilt, the endstop headers carry the sensors and the servo
//! header carries the trigger.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Pull};
use embassy_rp::peripherals::{PIO0, UART0};
use embassy_rp::pio::Pio;
use embassy_rp::pwm::{Config as PwmConfig, Pwm};
use embassy_rp::uart::{BufferedInterruptHandler, BufferedUart, Config as UartConfig};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use turret_core::Controller;
use turret_hal_rp2040::stepper::StepperPolarity;
use turret_hal_rp2040::{PioStepper, ServoConfig, ServoTrigger, StepProgram};

mod channels;
mod config;
mod tasks;

/// Link baud rate
const LINK_BAUD: u32 = 115_200;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
    PIO0_IRQ_0 => embassy_rp::pio::InterruptHandler<PIO0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 512]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

// The controller lives for the whole program and is owned by the control task
static CONTROLLER: StaticCell<Controller> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Turret firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = config::load_config();
    info!(
        "Yaw: {} units/rev, tilt: {} units/rev",
        config.yaw.steps_per_degree() * 360.0,
        config.tilt.steps_per_degree() * 360.0
    );

    // Serial link to the commander
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = LINK_BAUD;
    let tx_buf = TX_BUF.init([0u8; 512]);
    let rx_buf = RX_BUF.init([0u8; 256]);
    let uart = BufferedUart::new(p.UART0, p.PIN_0, p.PIN_1, Irqs, tx_buf, rx_buf, uart_config);
    let (tx, rx) = uart.split();
    info!("UART initialized for commander link");

    // PIO0 state machines 0 and 1 generate yaw and tilt step pulses
    let Pio {
        mut common, sm0, sm1, ..
    } = Pio::new(p.PIO0, Irqs);
    let program = StepProgram::load(&mut common);
    let polarity = StepperPolarity::default();

    // X socket: STEP=GPIO11, DIR=GPIO10, EN=GPIO12
    let yaw = PioStepper::new(
        &mut common,
        sm0,
        &program,
        p.PIN_11,
        p.PIN_10,
        p.PIN_12,
        polarity,
    );
    // Y socket: STEP=GPIO6, DIR=GPIO5, EN=GPIO7
    let tilt = PioStepper::new(
        &mut common,
        sm1,
        &program,
        p.PIN_6,
        p.PIN_5,
        p.PIN_7,
        polarity,
    );
    info!("PIO steppers initialized");

    // Servo header: GPIO29 is PWM slice 6 channel B
    let pwm = Pwm::new_output_b(p.PWM_SLICE6, p.PIN_29, PwmConfig::default());
    let trigger = ServoTrigger::new(pwm, ServoConfig::default());
    info!("Trigger servo initialized");

    // Endstop headers: X-STOP=GPIO4, Y-STOP=GPIO3, Z-STOP=GPIO25
    let sensors = tasks::SensorInputs {
        yaw_home: Input::new(p.PIN_4, Pull::Up),
        tilt_up: Input::new(p.PIN_3, Pull::Up),
        tilt_down: Input::new(p.PIN_25, Pull::Up),
    };

    let controller = CONTROLLER.init(unwrap!(Controller::new(config)));
    let outputs = tasks::Actuators { yaw, tilt, trigger };

    unwrap!(spawner.spawn(tasks::sensor_task(sensors, config.sensors)));
    unwrap!(spawner.spawn(tasks::link_rx_task(rx, config.safety.link_timeout_ms)));
    unwrap!(spawner.spawn(tasks::link_tx_task(tx)));
    unwrap!(spawner.spawn(tasks::control_task(
        controller,
        outputs,
        config.tick_interval_ms,
        config.safety.status_interval_ms,
    )));

    info!("All tasks spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}
