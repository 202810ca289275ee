//! Home and limit sensor polling task
//!
//! Samples the three inputs faster than the control loop, debounces them
//! and publishes the stable levels to [`SENSORS`].

use defmt::*;
use embassy_rp::gpio::Input;
use embassy_time::{Duration, Ticker};

use turret_core::config::SensorConfig;
use turret_core::sensor::Debouncer;

use crate::channels::SENSORS;

/// Sensor inputs for the task
pub struct SensorInputs {
    pub yaw_home: Input<'static>,
    pub tilt_up: Input<'static>,
    pub tilt_down: Input<'static>,
}

/// Active level of an input given its polarity
fn active(input: &Input<'static>, active_low: bool) -> bool {
    input.is_low() == active_low
}

/// Sensor task - sole writer of the shared sensor flags
#[embassy_executor::task]
pub async fn sensor_task(inputs: SensorInputs, config: SensorConfig) {
    info!("Sensor task started");

    let threshold = config.debounce_samples;
    let sample = |input: &Input<'static>, active_low| Debouncer::new(active(input, active_low), threshold);
    let mut yaw_home = sample(&inputs.yaw_home, config.yaw_home_active_low);
    let mut tilt_up = sample(&inputs.tilt_up, config.tilt_up_active_low);
    let mut tilt_down = sample(&inputs.tilt_down, config.tilt_down_active_low);

    let mut ticker = Ticker::every(Duration::from_millis(config.poll_interval_ms.max(1) as u64));

    loop {
        let home = yaw_home.update(active(&inputs.yaw_home, config.yaw_home_active_low));
        let up = tilt_up.update(active(&inputs.tilt_up, config.tilt_up_active_low));
        let down = tilt_down.update(active(&inputs.tilt_down, config.tilt_down_active_low));

        if home != SENSORS.yaw_home() {
            debug!("Yaw home sensor: {}", home);
        }
        if up != SENSORS.tilt_up() || down != SENSORS.tilt_down() {
            debug!("Tilt limits: up={} down={}", up, down);
        }

        SENSORS.set_yaw_home(home);
        SENSORS.set_tilt_up(up);
        SENSORS.set_tilt_down(down);

        ticker.next().await;
    }
}
