//! Control loop task
//!
//! Owns the controller. Every tick it applies queued link events, advances
//! the controller with a fresh sensor snapshot, drives the outputs and
//! reports what happened.

use defmt::*;
use embassy_rp::peripherals::PIO0;
use embassy_time::{Duration, Instant, Ticker};

use turret_core::traits::StepperDriver;
use turret_core::{Controller, ControllerEvent};
use turret_hal_rp2040::{PioStepper, ServoTrigger};
use turret_protocol::TurretMessage;

use crate::channels::{LinkEvent, LINK_EVENTS, OUTBOX, SENSORS};

/// Hardware outputs driven by the control loop
pub struct Actuators {
    pub yaw: PioStepper<'static, PIO0, 0>,
    pub tilt: PioStepper<'static, PIO0, 1>,
    pub trigger: ServoTrigger<'static>,
}

/// Control task - fixed-rate motion and safety loop
#[embassy_executor::task]
pub async fn control_task(
    controller: &'static mut Controller,
    mut outputs: Actuators,
    tick_interval_ms: u16,
    status_interval_ms: u32,
) {
    info!("Control task started, tick={}ms", tick_interval_ms);

    outputs.yaw.enable(true);
    outputs.tilt.enable(true);

    let start = Instant::now();
    let status_every = status_interval_ms as u64;
    let mut last_status_ms = 0u64;
    let mut ticker = Ticker::every(Duration::from_millis(tick_interval_ms as u64));

    loop {
        ticker.next().await;
        let now_ms = start.elapsed().as_millis();

        while let Ok(event) = LINK_EVENTS.try_receive() {
            handle_link_event(controller, event, now_ms);
        }

        let command = controller.tick(now_ms, SENSORS.snapshot());
        command.apply(&mut outputs.yaw, &mut outputs.tilt, &mut outputs.trigger);

        while let Some(event) = controller.take_event() {
            report_event(event);
        }

        let dirty = controller.take_status_dirty();
        if dirty || now_ms.saturating_sub(last_status_ms) >= status_every {
            // A full outbox means the host is not draining; skip this one
            if OUTBOX.try_send(TurretMessage::Status(controller.status())).is_ok() {
                last_status_ms = now_ms;
            }
        }
    }
}

fn handle_link_event(controller: &mut Controller, event: LinkEvent, now_ms: u64) {
    match event {
        LinkEvent::Connected => controller.client_connected(now_ms),
        LinkEvent::Disconnected => controller.client_disconnected(now_ms),
        LinkEvent::Malformed => controller.report_malformed(now_ms),
        LinkEvent::Command(command) => {
            if let Some(angles) = controller.handle_command(&command, now_ms) {
                if OUTBOX.try_send(TurretMessage::CurrentAngles(angles)).is_err() {
                    warn!("Outbox full, dropping angle reply");
                }
            }
        }
    }
}

fn report_event(event: ControllerEvent) {
    match event {
        ControllerEvent::ClientConnected => info!("Commander connected"),
        ControllerEvent::ClientDisconnected => info!("Commander disconnected, motion stopped"),
        ControllerEvent::CalibrationStarted(plan) => info!("Calibration started: {:?}", plan),
        ControllerEvent::CalibrationFinished(result) => {
            if result.calibrated() {
                info!(
                    "Calibration complete: center_tilt={} limits={:?}",
                    result.center_tilt, result.limits
                );
            } else {
                warn!(
                    "Calibration incomplete: yaw={:?} tilt={:?}",
                    result.yaw_fault, result.tilt_fault
                );
            }
        }
        ControllerEvent::MoveStarted => debug!("Angular move started"),
        ControllerEvent::MovementComplete(angles) => {
            info!("Movement complete: {:?}", angles);
            if OUTBOX.try_send(TurretMessage::MovementComplete(angles)).is_err() {
                warn!("Outbox full, dropping movement complete");
            }
        }
        ControllerEvent::MoveCancelled => debug!("Angular move cancelled"),
        ControllerEvent::MoveTimedOut => warn!("Angular move timed out"),
        ControllerEvent::SafetyStopEngaged => warn!("Input stale, safety stop engaged"),
        ControllerEvent::SafetyStopCleared => info!("Input fresh, safety stop cleared"),
        ControllerEvent::BurstFinished(end) => debug!("Burst finished: {:?}", end),
        ControllerEvent::CommandRejected(code) => warn!("Command rejected: {}", code.as_str()),
    }
}
