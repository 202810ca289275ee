//! Calibration phase machine

use super::{CalibrationFault, CalibrationPlan, CalibrationResult, TiltStep, YawStep};
use crate::angle::AngleModel;
use crate::config::TurretConfig;
use crate::math;
use crate::motion::{Axis, AxisController};
use crate::sensor::SensorSnapshot;

/// Current calibration phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationPhase {
    /// Not calibrating
    #[default]
    Idle,
    /// Moving off the home sensor before searching
    YawBackoff,
    /// Sweeping toward the home sensor
    YawSearch {
        /// Sensor has read inactive since the sweep began
        armed: bool,
        /// Position the sweep started from
        origin: i64,
    },
    /// Moving off a tilt limit switch before sweeping
    TiltBackoff,
    /// Sweeping toward the down limit
    TiltSeekDown,
    /// Sweeping toward the up limit
    TiltSeekUp { down: i64 },
    /// Driving to the tilt center
    TiltCenter {
        center: i64,
        /// Freshly measured limits to trust on arrival
        limits: Option<(i64, i64)>,
    },
}

/// Sweep speeds and distances derived from configuration
#[derive(Debug, Clone, Copy)]
struct SweepSettings {
    yaw_speed: f32,
    tilt_speed: f32,
    yaw_backoff: i64,
    tilt_backoff: i64,
    yaw_bound: i64,
    timeout_ms: u64,
}

/// Non-blocking calibration engine
#[derive(Debug, Clone)]
pub struct CalibrationEngine {
    phase: CalibrationPhase,
    phase_started_at: u64,
    plan: CalibrationPlan,
    result: CalibrationResult,
    settings: SweepSettings,
}

impl CalibrationEngine {
    pub fn new(config: &TurretConfig, angles: &AngleModel) -> Self {
        let cal = &config.calibration;
        let rotation = angles.scale(Axis::Yaw).full_rotation() as f32;
        Self {
            phase: CalibrationPhase::Idle,
            phase_started_at: 0,
            plan: CalibrationPlan::full(),
            result: CalibrationResult::default(),
            settings: SweepSettings {
                yaw_speed: config.yaw.max_speed * cal.speed_factor,
                tilt_speed: config.tilt.max_speed * cal.speed_factor,
                yaw_backoff: angles.degrees_to_units(cal.yaw_backoff_degrees, Axis::Yaw),
                tilt_backoff: angles.degrees_to_units(cal.tilt_backoff_degrees, Axis::Tilt),
                yaw_bound: math::round(rotation * cal.max_yaw_rotations),
                timeout_ms: cal.phase_timeout_ms as u64,
            },
        }
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase != CalibrationPhase::Idle
    }

    /// Begin a run
    ///
    /// Axes being calibrated lose their calibration immediately. Returns the
    /// result at once when the plan has nothing to do.
    pub fn start(
        &mut self,
        plan: CalibrationPlan,
        now_ms: u64,
        sensors: SensorSnapshot,
        center_tilt: i64,
        yaw: &mut AxisController,
        tilt: &mut AxisController,
    ) -> Option<CalibrationResult> {
        self.plan = plan;
        self.result = CalibrationResult {
            yaw_homed: yaw.is_calibrated(),
            tilt_calibrated: tilt.is_calibrated(),
            center_yaw: 0,
            center_tilt,
            limits: tilt.soft_limits(),
            yaw_fault: None,
            tilt_fault: None,
        };
        yaw.stop();
        tilt.stop();

        if plan.yaw == YawStep::Home {
            yaw.mark_uncalibrated();
            self.result.yaw_homed = false;
        }
        if plan.tilt == TiltStep::Sweep {
            tilt.mark_uncalibrated();
            self.result.tilt_calibrated = false;
            self.result.center_tilt = 0;
            self.result.limits = None;
        }

        match plan.yaw {
            YawStep::Home if sensors.yaw_home => {
                yaw.track(yaw.current_position() - self.settings.yaw_backoff);
                self.enter(CalibrationPhase::YawBackoff, now_ms);
                None
            }
            YawStep::Home => {
                self.begin_yaw_search(now_ms, sensors, yaw);
                None
            }
            YawStep::Keep => self.begin_tilt(now_ms, sensors, tilt),
        }
    }

    /// Advance the current phase, returning the result when the run ends
    ///
    /// Reads sensors captured at the start of the tick; the caller ticks
    /// both axes afterwards.
    pub fn advance(
        &mut self,
        now_ms: u64,
        sensors: SensorSnapshot,
        yaw: &mut AxisController,
        tilt: &mut AxisController,
    ) -> Option<CalibrationResult> {
        let timed_out = now_ms.saturating_sub(self.phase_started_at) > self.settings.timeout_ms;

        match self.phase {
            CalibrationPhase::Idle => None,

            CalibrationPhase::YawBackoff => {
                if timed_out {
                    self.fail_yaw(now_ms, sensors, yaw, tilt)
                } else if yaw.distance_to_target() == 0 {
                    self.begin_yaw_search(now_ms, sensors, yaw);
                    None
                } else {
                    None
                }
            }

            CalibrationPhase::YawSearch { armed, origin } => {
                if armed && sensors.yaw_home {
                    yaw.stop();
                    yaw.zero();
                    yaw.mark_calibrated(None);
                    self.result.yaw_homed = true;
                    self.result.center_yaw = 0;
                    self.begin_tilt(now_ms, sensors, tilt)
                } else if timed_out
                    || (yaw.current_position() - origin).abs() >= self.settings.yaw_bound
                {
                    self.fail_yaw(now_ms, sensors, yaw, tilt)
                } else {
                    if !armed && !sensors.yaw_home {
                        self.phase = CalibrationPhase::YawSearch { armed: true, origin };
                    }
                    None
                }
            }

            CalibrationPhase::TiltBackoff => {
                if timed_out {
                    Some(self.fail_tilt(CalibrationFault::TiltLimitNotFound, tilt))
                } else if tilt.distance_to_target() == 0 {
                    tilt.set_speed(-self.settings.tilt_speed);
                    self.enter(CalibrationPhase::TiltSeekDown, now_ms);
                    None
                } else {
                    None
                }
            }

            CalibrationPhase::TiltSeekDown => {
                if sensors.tilt_down {
                    tilt.stop();
                    let down = tilt.current_position();
                    tilt.set_speed(self.settings.tilt_speed);
                    self.enter(CalibrationPhase::TiltSeekUp { down }, now_ms);
                    None
                } else if timed_out {
                    Some(self.fail_tilt(CalibrationFault::TiltLimitNotFound, tilt))
                } else {
                    None
                }
            }

            CalibrationPhase::TiltSeekUp { down } => {
                if sensors.tilt_up {
                    tilt.stop();
                    let up = tilt.current_position();
                    let center = down + (up - down) / 2;
                    tilt.track(center);
                    self.enter(
                        CalibrationPhase::TiltCenter {
                            center,
                            limits: Some((down, up)),
                        },
                        now_ms,
                    );
                    None
                } else if timed_out {
                    Some(self.fail_tilt(CalibrationFault::TiltLimitNotFound, tilt))
                } else {
                    None
                }
            }

            CalibrationPhase::TiltCenter { center, limits } => {
                if tilt.distance_to_target() == 0 {
                    if let Some(limits) = limits {
                        tilt.mark_calibrated(Some(limits));
                        self.result.tilt_calibrated = true;
                        self.result.center_tilt = center;
                        self.result.limits = Some(limits);
                    }
                    Some(self.finish())
                } else if timed_out {
                    Some(self.fail_tilt(CalibrationFault::TiltCenterTimeout, tilt))
                } else {
                    None
                }
            }
        }
    }

    fn enter(&mut self, phase: CalibrationPhase, now_ms: u64) {
        self.phase = phase;
        self.phase_started_at = now_ms;
    }

    fn begin_yaw_search(&mut self, now_ms: u64, sensors: SensorSnapshot, yaw: &mut AxisController) {
        yaw.set_speed(self.settings.yaw_speed);
        self.enter(
            CalibrationPhase::YawSearch {
                armed: !sensors.yaw_home,
                origin: yaw.current_position(),
            },
            now_ms,
        );
    }

    fn begin_tilt(
        &mut self,
        now_ms: u64,
        sensors: SensorSnapshot,
        tilt: &mut AxisController,
    ) -> Option<CalibrationResult> {
        match self.plan.tilt {
            TiltStep::Keep => Some(self.finish()),
            TiltStep::Sweep => {
                let position = tilt.current_position();
                if sensors.tilt_down {
                    tilt.track(position + self.settings.tilt_backoff);
                    self.enter(CalibrationPhase::TiltBackoff, now_ms);
                } else if sensors.tilt_up {
                    tilt.track(position - self.settings.tilt_backoff);
                    self.enter(CalibrationPhase::TiltBackoff, now_ms);
                } else {
                    tilt.set_speed(-self.settings.tilt_speed);
                    self.enter(CalibrationPhase::TiltSeekDown, now_ms);
                }
                None
            }
            TiltStep::Recenter if tilt.is_calibrated() => {
                let center = self.result.center_tilt;
                tilt.track(center);
                self.enter(CalibrationPhase::TiltCenter { center, limits: None }, now_ms);
                None
            }
            TiltStep::Recenter => Some(self.finish()),
        }
    }

    fn fail_yaw(
        &mut self,
        now_ms: u64,
        sensors: SensorSnapshot,
        yaw: &mut AxisController,
        tilt: &mut AxisController,
    ) -> Option<CalibrationResult> {
        yaw.stop();
        yaw.mark_uncalibrated();
        self.result.yaw_homed = false;
        self.result.yaw_fault = Some(CalibrationFault::YawHomeNotFound);
        self.begin_tilt(now_ms, sensors, tilt)
    }

    fn fail_tilt(&mut self, fault: CalibrationFault, tilt: &mut AxisController) -> CalibrationResult {
        tilt.stop();
        tilt.mark_uncalibrated();
        self.result.tilt_calibrated = false;
        self.result.limits = None;
        self.result.tilt_fault = Some(fault);
        self.finish()
    }

    fn finish(&mut self) -> CalibrationResult {
        self.phase = CalibrationPhase::Idle;
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AxisConfig;

    const TICK_MS: u64 = 5;

    /// Physical sensor positions in raw step counts
    struct Rig {
        /// Inclusive raw yaw window (within one rotation) where the hall sensor reads
        home: Option<(i64, i64)>,
        rotation: i64,
        down: Option<i64>,
        up: Option<i64>,
    }

    impl Rig {
        fn sense(&self, yaw: &AxisController, tilt: &AxisController) -> SensorSnapshot {
            let heading = yaw.raw_position().rem_euclid(self.rotation);
            let tilt_raw = tilt.raw_position();
            let yaw_home = self.home.is_some_and(|(lo, hi)| {
                let (lo, hi) = (lo.rem_euclid(self.rotation), hi.rem_euclid(self.rotation));
                if lo <= hi {
                    heading >= lo && heading <= hi
                } else {
                    // Window straddles the wrap point
                    heading >= lo || heading <= hi
                }
            });
            SensorSnapshot {
                yaw_home,
                tilt_up: self.up.is_some_and(|up| tilt_raw >= up),
                tilt_down: self.down.is_some_and(|down| tilt_raw <= down),
            }
        }
    }

    struct Bench {
        engine: CalibrationEngine,
        angles: AngleModel,
        yaw: AxisController,
        tilt: AxisController,
        now: u64,
    }

    fn config() -> TurretConfig {
        TurretConfig {
            // One native unit per degree keeps tilt numbers readable
            tilt: AxisConfig {
                full_steps_per_rotation: 360,
                microsteps: 1,
                gear_ratio_num: 1,
                gear_ratio_den: 1,
                max_speed: 600.0,
                acceleration: 2000.0,
                min_step_rate: 8,
            },
            ..TurretConfig::default()
        }
    }

    impl Bench {
        fn new() -> Self {
            let config = config();
            let angles = AngleModel::new(&config.yaw, &config.tilt);
            Self {
                engine: CalibrationEngine::new(&config, &angles),
                angles,
                yaw: AxisController::new(Axis::Yaw, &config.yaw),
                tilt: AxisController::new(Axis::Tilt, &config.tilt),
                now: 0,
            }
        }

        fn rotation(&self) -> i64 {
            self.angles.scale(Axis::Yaw).full_rotation()
        }

        fn run(&mut self, plan: CalibrationPlan, rig: &Rig, center_tilt: i64) -> CalibrationResult {
            let sensors = rig.sense(&self.yaw, &self.tilt);
            if let Some(result) =
                self.engine
                    .start(plan, self.now, sensors, center_tilt, &mut self.yaw, &mut self.tilt)
            {
                return result;
            }
            for _ in 0..20_000 {
                self.now += TICK_MS;
                let sensors = rig.sense(&self.yaw, &self.tilt);
                if let Some(result) = self.engine.advance(self.now, sensors, &mut self.yaw, &mut self.tilt) {
                    assert!(!self.engine.is_running());
                    return result;
                }
                self.yaw.tick(TICK_MS as f32 / 1000.0);
                self.tilt.tick(TICK_MS as f32 / 1000.0);
            }
            panic!("calibration never finished");
        }
    }

    fn rig(bench: &Bench, home_deg: f32) -> Rig {
        let home = bench.angles.degrees_to_units(home_deg, Axis::Yaw);
        Rig {
            home: Some((home, home + 20)),
            rotation: bench.rotation(),
            down: Some(-500),
            up: Some(700),
        }
    }

    #[test]
    fn test_full_calibration_finds_home_and_center() {
        let mut bench = Bench::new();
        let rig = rig(&bench, 40.0);
        let result = bench.run(CalibrationPlan::full(), &rig, 0);

        assert!(result.calibrated());
        assert_eq!(result.yaw_fault, None);
        assert_eq!(result.limits, Some((-500, 700)));
        assert_eq!(result.center_tilt, 100);
        assert_eq!(bench.tilt.current_position(), 100);
        assert_eq!(bench.tilt.soft_limits(), Some((-500, 700)));

        // Zeroed where the sensor first read, within one tick of sweep travel
        let home = bench.angles.degrees_to_units(40.0, Axis::Yaw);
        assert_eq!(bench.yaw.current_position(), 0);
        assert!(bench.yaw.raw_position() >= home && bench.yaw.raw_position() <= home + 3);
        assert!(bench.yaw.is_calibrated());
    }

    #[test]
    fn test_starting_on_home_backs_off_first() {
        let mut bench = Bench::new();
        let rig = Rig {
            home: Some((-5, 5)),
            ..rig(&bench, 0.0)
        };
        let result = bench.run(CalibrationPlan::yaw_only(), &rig, 0);
        assert!(result.yaw_homed);
        // Re-entered the sensor from below after backing off
        let raw = bench.yaw.raw_position();
        assert!((-5..=-2).contains(&raw), "zeroed at raw {raw}");
    }

    #[test]
    fn test_missing_home_sensor_fails_yaw_only() {
        let mut bench = Bench::new();
        let rig = Rig {
            home: None,
            ..rig(&bench, 0.0)
        };
        let result = bench.run(CalibrationPlan::full(), &rig, 0);
        assert!(!result.yaw_homed);
        assert_eq!(result.yaw_fault, Some(CalibrationFault::YawHomeNotFound));
        assert!(!bench.yaw.is_calibrated());
        // The sweep gave up after 1.5 rotations
        let travelled = bench.yaw.raw_position();
        assert!(travelled >= bench.rotation() * 3 / 2);
        assert!(travelled < bench.rotation() * 3 / 2 + 10);
        // Tilt still calibrated
        assert!(result.tilt_calibrated);
        assert!(!result.calibrated());
    }

    #[test]
    fn test_missing_limit_leaves_tilt_untrusted() {
        let mut bench = Bench::new();
        let rig = Rig {
            up: None,
            ..rig(&bench, 40.0)
        };
        let result = bench.run(CalibrationPlan::tilt_only(), &rig, 0);
        assert!(!result.tilt_calibrated);
        assert_eq!(result.tilt_fault, Some(CalibrationFault::TiltLimitNotFound));
        assert_eq!(result.limits, None);
        assert_eq!(bench.tilt.soft_limits(), None);
        assert_eq!(bench.tilt.speed(), 0.0);
    }

    #[test]
    fn test_resting_on_limit_backs_off() {
        let mut bench = Bench::new();
        // Tilt starts pressed against the down switch
        let rig = Rig {
            down: Some(0),
            up: Some(400),
            ..rig(&bench, 40.0)
        };
        let result = bench.run(CalibrationPlan::tilt_only(), &rig, 0);
        assert_eq!(result.limits, Some((0, 400)));
        assert_eq!(result.center_tilt, 200);
    }

    #[test]
    fn test_rehome_keeps_tilt_limits_and_recenters() {
        let mut bench = Bench::new();
        let rig = rig(&bench, 40.0);
        let first = bench.run(CalibrationPlan::full(), &rig, 0);

        // Wander off center, then rehome
        bench.tilt.set_target_absolute(600).unwrap();
        bench.yaw.set_target_absolute(-1000).unwrap();
        for _ in 0..1000 {
            bench.yaw.tick(0.005);
            bench.tilt.tick(0.005);
        }
        assert_eq!(bench.tilt.current_position(), 600);

        let second = bench.run(CalibrationPlan::rehome(), &rig, first.center_tilt);
        assert!(second.calibrated());
        assert_eq!(second.limits, first.limits);
        assert_eq!(bench.tilt.current_position(), first.center_tilt);
        assert_eq!(bench.yaw.current_position(), 0);
    }

    #[test]
    fn test_full_run_uncalibrates_during_run() {
        let mut bench = Bench::new();
        let rig = rig(&bench, 40.0);
        bench.run(CalibrationPlan::full(), &rig, 0);
        let sensors = rig.sense(&bench.yaw, &bench.tilt);
        bench
            .engine
            .start(CalibrationPlan::full(), bench.now, sensors, 100, &mut bench.yaw, &mut bench.tilt);
        assert!(bench.engine.is_running());
        assert!(!bench.yaw.is_calibrated());
        assert!(!bench.tilt.is_calibrated());
        assert_eq!(bench.tilt.soft_limits(), None);
    }

    #[test]
    fn test_stuck_sweep_times_out() {
        let mut bench = Bench::new();
        // Down switch never reads; tilt also sweeps forever without limits
        let rig = Rig {
            down: None,
            ..rig(&bench, 40.0)
        };
        let start = bench.now;
        let result = bench.run(CalibrationPlan::tilt_only(), &rig, 0);
        assert_eq!(result.tilt_fault, Some(CalibrationFault::TiltLimitNotFound));
        assert!(bench.now - start > config().calibration.phase_timeout_ms as u64);
    }
}
