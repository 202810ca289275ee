//! Home and limit sensor readings
//!
//! The sensor context (a fast polling task or an interrupt handler) is the
//! only writer of each flag; everything else reads. Flags are plain atomic
//! loads and stores, never read-modify-write.

use portable_atomic::{AtomicBool, Ordering};

/// Point-in-time copy of all sensor flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorSnapshot {
    /// Yaw hall sensor sees the home magnet
    pub yaw_home: bool,
    /// Tilt up limit switch pressed
    pub tilt_up: bool,
    /// Tilt down limit switch pressed
    pub tilt_down: bool,
}

impl SensorSnapshot {
    pub fn to_flags(self) -> turret_protocol::SensorFlags {
        turret_protocol::SensorFlags {
            yaw_home: self.yaw_home,
            tilt_up: self.tilt_up,
            tilt_down: self.tilt_down,
        }
    }
}

/// Shared sensor flags, suitable for a `static`
#[derive(Debug, Default)]
pub struct SensorState {
    yaw_home: AtomicBool,
    tilt_up: AtomicBool,
    tilt_down: AtomicBool,
}

impl SensorState {
    pub const fn new() -> Self {
        Self {
            yaw_home: AtomicBool::new(false),
            tilt_up: AtomicBool::new(false),
            tilt_down: AtomicBool::new(false),
        }
    }

    pub fn set_yaw_home(&self, active: bool) {
        self.yaw_home.store(active, Ordering::Release);
    }

    pub fn set_tilt_up(&self, active: bool) {
        self.tilt_up.store(active, Ordering::Release);
    }

    pub fn set_tilt_down(&self, active: bool) {
        self.tilt_down.store(active, Ordering::Release);
    }

    pub fn yaw_home(&self) -> bool {
        self.yaw_home.load(Ordering::Acquire)
    }

    pub fn tilt_up(&self) -> bool {
        self.tilt_up.load(Ordering::Acquire)
    }

    pub fn tilt_down(&self) -> bool {
        self.tilt_down.load(Ordering::Acquire)
    }

    /// Read all flags once for a control tick
    pub fn snapshot(&self) -> SensorSnapshot {
        SensorSnapshot {
            yaw_home: self.yaw_home(),
            tilt_up: self.tilt_up(),
            tilt_down: self.tilt_down(),
        }
    }
}

/// Counter-based input debouncer
///
/// The reported level changes only after `threshold` consecutive samples
/// disagree with it.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Debouncer {
    stable: bool,
    count: u8,
    threshold: u8,
}

impl Debouncer {
    pub const fn new(initial: bool, threshold: u8) -> Self {
        Self {
            stable: initial,
            count: 0,
            threshold,
        }
    }

    /// Feed one raw sample, returning the debounced level
    pub fn update(&mut self, raw: bool) -> bool {
        if raw == self.stable {
            self.count = 0;
        } else {
            self.count = self.count.saturating_add(1);
            if self.count >= self.threshold {
                self.stable = raw;
                self.count = 0;
            }
        }
        self.stable
    }

    pub fn level(&self) -> bool {
        self.stable
    }
}
