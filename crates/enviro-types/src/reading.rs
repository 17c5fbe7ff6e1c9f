//! Sensor readings and partial updates.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::field::SensorField;

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// One complete point-in-time measurement set.
///
/// Every stored reading has all four magnitude fields present and finite;
/// partial updates are merged onto the previous full reading before storage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
    /// Illuminance in lux.
    pub light: f64,
    /// PWM duty cycle in percent.
    pub pwm: f64,
    /// Milliseconds since the Unix epoch, stamped at storage time.
    pub timestamp: i64,
}

impl Reading {
    /// The documented startup reading, stamped with the current time.
    ///
    /// The store starts from this value and `reset()` restores it.
    #[must_use]
    pub fn initial() -> Self {
        Self {
            temperature: 25.6,
            humidity: 65.2,
            light: 750.0,
            pwm: 85.0,
            timestamp: now_ms(),
        }
    }

    /// Value of a single field.
    #[must_use]
    pub fn get(&self, field: SensorField) -> f64 {
        match field {
            SensorField::Temperature => self.temperature,
            SensorField::Humidity => self.humidity,
            SensorField::Light => self.light,
            SensorField::Pwm => self.pwm,
        }
    }

    /// Copy with the patch's present fields overwritten and the given
    /// timestamp stamped. Absent fields are untouched.
    #[must_use]
    pub fn merged(&self, patch: &ReadingPatch, timestamp: i64) -> Self {
        Self {
            temperature: patch.temperature.unwrap_or(self.temperature),
            humidity: patch.humidity.unwrap_or(self.humidity),
            light: patch.light.unwrap_or(self.light),
            pwm: patch.pwm.unwrap_or(self.pwm),
            timestamp,
        }
    }
}

/// A partial reading: only the fields present in an update.
///
/// This is the wire shape for REST writes, WebSocket writes, and decoded
/// device-shadow payloads. Fields left `None` keep their previous value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadingPatch {
    /// Temperature in degrees Celsius, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Relative humidity in percent, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    /// Illuminance in lux, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light: Option<f64>,
    /// PWM duty cycle in percent, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pwm: Option<f64>,
}

impl ReadingPatch {
    /// True if no field is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.humidity.is_none()
            && self.light.is_none()
            && self.pwm.is_none()
    }

    /// Value of a single field, if present.
    #[must_use]
    pub fn get(&self, field: SensorField) -> Option<f64> {
        match field {
            SensorField::Temperature => self.temperature,
            SensorField::Humidity => self.humidity,
            SensorField::Light => self.light,
            SensorField::Pwm => self.pwm,
        }
    }

    /// Set a single field.
    pub fn set(&mut self, field: SensorField, value: f64) {
        match field {
            SensorField::Temperature => self.temperature = Some(value),
            SensorField::Humidity => self.humidity = Some(value),
            SensorField::Light => self.light = Some(value),
            SensorField::Pwm => self.pwm = Some(value),
        }
    }

    /// Iterate over the present fields in canonical order.
    pub fn fields(&self) -> impl Iterator<Item = (SensorField, f64)> + '_ {
        SensorField::ALL
            .into_iter()
            .filter_map(|field| self.get(field).map(|value| (field, value)))
    }
}

impl From<Reading> for ReadingPatch {
    fn from(reading: Reading) -> Self {
        Self {
            temperature: Some(reading.temperature),
            humidity: Some(reading.humidity),
            light: Some(reading.light),
            pwm: Some(reading.pwm),
        }
    }
}
