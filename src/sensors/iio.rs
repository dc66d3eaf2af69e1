//! Humidity/temperature sensor exposed through Linux IIO sysfs.
//!
//! Drivers for the usual hygrometers (SHT3x, HTU21, HDC100x, ...) publish
//! processed channels in the device directory:
//!
//! | File                          | Unit           |
//! |-------------------------------|----------------|
//! | `in_temp_input`               | milli-°C       |
//! | `in_humidityrelative_input`   | milli-percent  |
//!
//! Both channels are read on every tick and turned into a dewpoint.

use std::fs;
use std::path::PathBuf;

use log::trace;

use crate::error::{Error, Result};

use super::{AmbientReading, AmbientSensor};

pub const TEMPERATURE_CHANNEL: &str = "in_temp_input";
pub const HUMIDITY_CHANNEL: &str = "in_humidityrelative_input";

pub struct IioHygrometer {
    name: String,
    device: PathBuf,
}

impl IioHygrometer {
    pub fn new(name: impl Into<String>, device: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            device: device.into(),
        }
    }

    fn fail(&self, reason: String) -> Error {
        Error::Sensor {
            name: self.name.clone(),
            reason,
        }
    }

    /// Read one processed channel and scale it from milli-units.
    fn channel(&self, file: &str) -> Result<f64> {
        let path = self.device.join(file);
        let raw = fs::read_to_string(&path)
            .map_err(|e| self.fail(format!("{}: {e}", path.display())))?;
        let milli: f64 = raw
            .trim()
            .parse()
            .map_err(|_| self.fail(format!("{}: {:?} is not a number", path.display(), raw.trim())))?;
        Ok(milli / 1000.0)
    }
}

impl AmbientSensor for IioHygrometer {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self) -> Result<AmbientReading> {
        let temperature_c = self.channel(TEMPERATURE_CHANNEL)?;
        let humidity_pct = self.channel(HUMIDITY_CHANNEL)?;
        if !(0.0..=100.0).contains(&humidity_pct) {
            return Err(self.fail(format!("relative humidity {humidity_pct}% out of range")));
        }
        trace!(
            "{}: {temperature_c:.2} \u{00b0}C, {humidity_pct:.1} %RH",
            self.name
        );
        Ok(AmbientReading::from_humidity(temperature_c, humidity_pct))
    }
}
