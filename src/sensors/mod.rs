//! Auxiliary ambient sensors.
//!
//! Up to two humidity/temperature sensors sit next to the chamber. Each
//! one supplies a dewpoint that the interlock compares against the
//! chamber temperature. A sensor that cannot be read is reported as
//! absent for that tick; it is never replaced by a default value.

pub mod dewpoint;
pub mod iio;

use serde::Serialize;

use crate::config::SensorConfig;
use crate::error::Result;

pub use dewpoint::dewpoint_c;
pub use iio::IioHygrometer;

/// Most auxiliary sensor sessions a monitor will hold.
pub const MAX_AUX_SENSORS: usize = 2;

/// One ambient reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AmbientReading {
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub dewpoint_c: f64,
}

impl AmbientReading {
    /// Build a reading from temperature and relative humidity.
    pub fn from_humidity(temperature_c: f64, humidity_pct: f64) -> Self {
        Self {
            temperature_c: Some(temperature_c),
            humidity_pct: Some(humidity_pct),
            dewpoint_c: dewpoint_c(temperature_c, humidity_pct),
        }
    }
}

/// Read-side port for an auxiliary sensor session.
pub trait AmbientSensor {
    /// Label used in logs.
    fn name(&self) -> &str;

    /// Take one reading.
    fn read(&mut self) -> Result<AmbientReading>;
}

/// A sensor that always reports the configured dewpoint.
pub struct FixedDewpoint {
    name: String,
    dewpoint_c: f64,
}

impl FixedDewpoint {
    pub fn new(name: impl Into<String>, dewpoint_c: f64) -> Self {
        Self {
            name: name.into(),
            dewpoint_c,
        }
    }
}

impl AmbientSensor for FixedDewpoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self) -> Result<AmbientReading> {
        Ok(AmbientReading {
            temperature_c: None,
            humidity_pct: None,
            dewpoint_c: self.dewpoint_c,
        })
    }
}

/// Instantiate the configured sensors.
pub fn from_config(configs: &[SensorConfig]) -> Vec<Box<dyn AmbientSensor>> {
    configs
        .iter()
        .map(|c| match c {
            SensorConfig::Fixed { name, dewpoint_c } => {
                Box::new(FixedDewpoint::new(name.clone(), *dewpoint_c)) as Box<dyn AmbientSensor>
            }
            SensorConfig::Iio { name, device } => {
                Box::new(IioHygrometer::new(name.clone(), device.clone())) as Box<dyn AmbientSensor>
            }
        })
        .collect()
}
