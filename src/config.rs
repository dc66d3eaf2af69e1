//! System configuration parameters
//!
//! All tunable parameters for the ClimateBox client.
//! Values come from defaults, optionally overridden by a TOML file and
//! then by command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol::transport::Timeouts;
use crate::sensors::MAX_AUX_SENSORS;

/// Core system configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateBoxConfig {
    pub connection: ConnectionConfig,
    pub interlock: InterlockConfig,
    pub monitor: MonitorConfig,
    /// Auxiliary ambient sensors (at most two).
    pub sensors: Vec<SensorConfig>,
}

/// Chamber endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    /// Chamber index sent with every command
    pub chamber_index: u8,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
}

/// Condensation interlock
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterlockConfig {
    /// Minimum allowed (chamber temperature − dewpoint) in K
    pub threshold_c: f64,
    /// Force a warm-up when the margin is violated; otherwise only warn
    pub warm_up_on_interlock: bool,
    /// Warm-up target temperature (°C)
    pub target_c: f64,
    /// Warm-up gradient (K/min)
    pub gradient_k_per_min: f64,
}

/// Polling loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between ticks
    pub step_secs: u64,
    /// Append-only tick log
    pub output: String,
}

/// An auxiliary sensor slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SensorConfig {
    /// Reports a constant dewpoint (bench setups without a hygrometer).
    Fixed { name: String, dewpoint_c: f64 },
    /// Linux IIO hygrometer; `device` is its sysfs directory.
    Iio { name: String, device: PathBuf },
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 2049,
            chamber_index: 1,
            connect_timeout_ms: 3000,
            read_timeout_ms: 3000,
        }
    }
}

impl Default for InterlockConfig {
    fn default() -> Self {
        Self {
            threshold_c: 5.0,
            warm_up_on_interlock: true,
            target_c: 24.0,
            gradient_k_per_min: 1.0,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            step_secs: 10,
            output: "monitor.dat".into(),
        }
    }
}

impl ConnectionConfig {
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            connect: Duration::from_millis(self.connect_timeout_ms),
            io: Duration::from_millis(self.read_timeout_ms),
        }
    }
}

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
    /// The file is not valid TOML for this schema.
    #[error("parse error: {0}")]
    Parse(String),
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    #[error("validation failed: {0}")]
    ValidationFailed(&'static str),
}

impl ClimateBoxConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml(&text)
    }

    /// Reject invalid values rather than clamping them, so a bad file can
    /// never quietly weaken the interlock.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.connection;
        if c.host.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("connection.host is empty"));
        }
        if c.port == 0 {
            return Err(ConfigError::ValidationFailed("connection.port must be non-zero"));
        }
        if c.chamber_index == 0 {
            return Err(ConfigError::ValidationFailed("connection.chamber_index must be >= 1"));
        }
        if c.connect_timeout_ms == 0 || c.read_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("connection timeouts must be non-zero"));
        }

        let i = &self.interlock;
        if !(i.threshold_c.is_finite() && i.threshold_c > 0.0) {
            return Err(ConfigError::ValidationFailed("interlock.threshold_c must be > 0"));
        }
        if !i.target_c.is_finite() {
            return Err(ConfigError::ValidationFailed("interlock.target_c must be finite"));
        }
        if !(i.gradient_k_per_min.is_finite() && i.gradient_k_per_min > 0.0) {
            return Err(ConfigError::ValidationFailed("interlock.gradient_k_per_min must be > 0"));
        }

        if self.monitor.step_secs == 0 {
            return Err(ConfigError::ValidationFailed("monitor.step_secs must be non-zero"));
        }

        if self.sensors.len() > MAX_AUX_SENSORS {
            return Err(ConfigError::ValidationFailed("at most two auxiliary sensors"));
        }
        for s in &self.sensors {
            match s {
                SensorConfig::Fixed { dewpoint_c, .. } if !dewpoint_c.is_finite() => {
                    return Err(ConfigError::ValidationFailed("sensor dewpoint_c must be finite"));
                }
                SensorConfig::Iio { device, .. } if device.as_os_str().is_empty() => {
                    return Err(ConfigError::ValidationFailed("sensor device path is empty"));
                }
                _ => {}
            }
        }
        Ok(())
    }
}
