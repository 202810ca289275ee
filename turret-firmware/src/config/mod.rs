//! Configuration loading
//!
//! `turret.toml` is parsed and validated on the host by the build script
//! and embedded here as postcard bytes. Decoding happens once at boot.

use defmt::*;

use turret_core::{ConfigError, TurretConfig};
use turret_hal_rp2040::pio::MIN_STEP_FREQ_HZ;

/// Postcard-encoded configuration produced by build.rs
static EMBEDDED_CONFIG: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/turret_config.bin"));

/// Reasons the embedded configuration was not used
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadError {
    /// Bytes did not decode as a configuration
    Deserialize,
    /// Decoded, but failed validation
    Invalid(ConfigError),
}

/// Decode and validate the embedded configuration
pub fn decode(bytes: &[u8]) -> Result<TurretConfig, LoadError> {
    let config: TurretConfig = postcard::from_bytes(bytes).map_err(|_| LoadError::Deserialize)?;
    config.validate().map_err(LoadError::Invalid)?;
    Ok(config)
}

/// Load the embedded configuration, falling back to defaults
pub fn load_config() -> TurretConfig {
    let config = match decode(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Loaded embedded configuration ({} bytes)", EMBEDDED_CONFIG.len());
            config
        }
        Err(e) => {
            warn!("Embedded configuration unusable ({:?}), using defaults", e);
            TurretConfig::default()
        }
    };
    fit_step_rates(config)
}

/// Raise step rate floors to what the PIO program can emit
///
/// The controller counts position from the rates it commands, so its
/// floor must not sit below the step generator's.
fn fit_step_rates(mut config: TurretConfig) -> TurretConfig {
    let floor = MIN_STEP_FREQ_HZ as u16;
    let mut fitted = false;
    for axis in [&mut config.yaw, &mut config.tilt] {
        if axis.min_step_rate < floor {
            axis.min_step_rate = floor;
            fitted = true;
        }
    }
    if fitted {
        warn!("min_step_rate raised to the {} Hz PIO floor", floor);
    }
    if config.validate().is_err() {
        warn!("Axis speeds below the PIO floor, using defaults");
        return TurretConfig::default();
    }
    config
}
