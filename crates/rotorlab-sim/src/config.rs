//! Simulation configuration
//!
//! One YAML-loadable document describes a whole simulator instance: the
//! integration step, the motor, the drive board, the FOC controller, and
//! the observer capacity. Every section validates before the simulator is
//! built, so the tick path never sees a non-physical value.
//!
//! ## Example configuration
//!
//! ```yaml
//! dt: 1.0e-6
//! step_multiplier: 1000
//! recorder_capacity: 20000
//! motor:
//!   num_pole_pairs: 4
//!   rotor_inertia: 0.01
//!   phase_resistance: 0.1
//!   phase_inductance: 1.0e-4
//! foc:
//!   period: 1.0e-4
//!   auto_pi: true
//!   pi_bandwidth: 10000.0
//! ```
//!
//! Configuration is loaded from the path in the `ROTORLAB_CONFIG`
//! environment variable, falling back to `./rotorlab.yaml`, falling back
//! to built-in defaults.

use rotorlab_core::board::BoardState;
use rotorlab_core::foc::FocOptions;
use rotorlab_core::motor::MotorParams;
use rotorlab_core::observe::LogConfig;
use rotorlab_core::pi::PiGains;
use rotorlab_core::types::{check_positive, check_range, ParamError, Scalar};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable that overrides the config search path.
pub const CONFIG_ENV_VAR: &str = "ROTORLAB_CONFIG";

/// Default config file name in the working directory.
pub const CONFIG_FILE: &str = "rotorlab.yaml";

/// Maximum allowed per-frame step multiplier.
pub const MAX_STEP_MULTIPLIER: u32 = 5000;

/// Errors raised while loading or validating a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] ParamError),
}

/// FOC controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FocConfig {
    /// Controller tick interval, seconds
    pub period: Scalar,
    /// Derive PI gains from `pi_bandwidth` and the motor's R/L instead of
    /// using `p_gain`/`i_gain`
    pub auto_pi: bool,
    /// Target current-loop bandwidth for auto-PI, rad/s
    pub pi_bandwidth: Scalar,
    /// Manual proportional gain (ignored under auto-PI)
    pub p_gain: Scalar,
    /// Manual integral gain (ignored under auto-PI)
    pub i_gain: Scalar,
    pub options: FocOptions,
}

impl Default for FocConfig {
    fn default() -> Self {
        Self {
            period: 1e-4, // 10 kHz loop
            auto_pi: true,
            pi_bandwidth: 10_000.0,
            p_gain: 1.0,
            i_gain: 1000.0,
            options: FocOptions::default(),
        }
    }
}

impl FocConfig {
    pub fn validate(&self) -> Result<(), ParamError> {
        check_positive("foc.period", self.period)?;
        if self.auto_pi {
            check_positive("foc.pi_bandwidth", self.pi_bandwidth)?;
        } else {
            check_positive("foc.p_gain", self.p_gain)?;
            check_positive("foc.i_gain", self.i_gain)?;
        }
        Ok(())
    }

    /// The gain pair this config selects for the given motor.
    pub fn gains_for(&self, motor: &MotorParams) -> PiGains {
        if self.auto_pi {
            PiGains::for_bandwidth(
                self.pi_bandwidth,
                motor.phase_resistance,
                motor.phase_inductance,
            )
        } else {
            PiGains {
                p_gain: self.p_gain,
                i_gain: self.i_gain,
            }
        }
    }
}

/// Top-level simulator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Integration step, seconds
    pub dt: Scalar,
    /// Ticks per host frame
    pub step_multiplier: u32,
    /// Rolling-buffer capacity per observer channel
    pub recorder_capacity: usize,
    /// De-slope and zero-mean the configured cogging map on construction
    /// so it cannot pump energy into the rotor. Disable to study a
    /// non-conserving map; the energy audit still warns.
    pub recenter_cogging: bool,
    pub log: LogConfig,
    pub motor: MotorParams,
    pub board: BoardState,
    pub foc: FocConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 1e-6,
            step_multiplier: 1,
            recorder_capacity: 10_000,
            recenter_cogging: true,
            log: LogConfig::default(),
            motor: MotorParams::default(),
            board: BoardState::default(),
            foc: FocConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ParamError> {
        check_positive("dt", self.dt)?;
        check_range(
            "step_multiplier",
            self.step_multiplier as Scalar,
            1.0,
            MAX_STEP_MULTIPLIER as Scalar,
        )?;
        if self.recorder_capacity == 0 {
            return Err(ParamError::NonPositive {
                name: "recorder_capacity",
                value: 0.0,
            });
        }
        self.motor.validate()?;
        self.board.validate()?;
        self.foc.validate()
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Load from the standard search path: `ROTORLAB_CONFIG`, then
    /// `./rotorlab.yaml`, then built-in defaults.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::from_yaml_file(path);
        }
        if Path::new(CONFIG_FILE).exists() {
            return Self::from_yaml_file(CONFIG_FILE);
        }
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = SimConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back = SimConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(back.dt, config.dt);
        assert_eq!(back.motor.num_pole_pairs, config.motor.num_pole_pairs);
        assert_eq!(back.foc.pi_bandwidth, config.foc.pi_bandwidth);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = SimConfig::from_yaml_str("dt: 2.0e-6\nstep_multiplier: 50\n").unwrap();
        assert_eq!(config.dt, 2e-6);
        assert_eq!(config.step_multiplier, 50);
        assert_eq!(config.recorder_capacity, SimConfig::default().recorder_capacity);
    }

    #[test]
    fn test_rejects_invalid_yaml_values() {
        assert!(SimConfig::from_yaml_str("dt: -1.0\n").is_err());
        assert!(SimConfig::from_yaml_str("step_multiplier: 100000\n").is_err());
        assert!(SimConfig::from_yaml_str("motor:\n  num_pole_pairs: 20\n").is_err());
    }

    #[test]
    fn test_auto_pi_gains() {
        let config = FocConfig {
            pi_bandwidth: 1000.0,
            ..FocConfig::default()
        };
        let motor = MotorParams::default();
        let gains = config.gains_for(&motor);
        assert!((gains.p_gain - 1000.0 * motor.phase_inductance).abs() < 1e-12);
        assert!((gains.i_gain - 1000.0 * motor.phase_resistance).abs() < 1e-12);
    }

    #[test]
    fn test_manual_gains() {
        let config = FocConfig {
            auto_pi: false,
            p_gain: 2.5,
            i_gain: 40.0,
            ..FocConfig::default()
        };
        let gains = config.gains_for(&MotorParams::default());
        assert_eq!(gains.p_gain, 2.5);
        assert_eq!(gains.i_gain, 40.0);
    }
}
