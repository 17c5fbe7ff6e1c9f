//! Sensor field definitions and their documented value ranges.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// One of the four measured quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorField {
    /// Air temperature in degrees Celsius.
    Temperature,
    /// Relative humidity in percent.
    Humidity,
    /// Illuminance in lux.
    Light,
    /// PWM duty cycle in percent.
    Pwm,
}

impl SensorField {
    /// All fields, in canonical order.
    pub const ALL: [SensorField; 4] = [
        SensorField::Temperature,
        SensorField::Humidity,
        SensorField::Light,
        SensorField::Pwm,
    ];

    /// Canonical lowercase name, as used in URLs and JSON.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorField::Temperature => "temperature",
            SensorField::Humidity => "humidity",
            SensorField::Light => "light",
            SensorField::Pwm => "pwm",
        }
    }

    /// Display unit for the field.
    #[must_use]
    pub fn unit(&self) -> &'static str {
        match self {
            SensorField::Temperature => "°C",
            SensorField::Humidity => "%",
            SensorField::Light => "lux",
            SensorField::Pwm => "%",
        }
    }

    /// The documented valid range for the field.
    ///
    /// Values outside this range are rejected by the validator; consumers
    /// also use it for progress-style normalization.
    #[must_use]
    pub fn range(&self) -> FieldRange {
        match self {
            SensorField::Temperature => FieldRange::new(-50.0, 100.0, "°C"),
            SensorField::Humidity => FieldRange::new(0.0, 100.0, "%"),
            SensorField::Light => FieldRange::new(0.0, 100_000.0, "lux"),
            SensorField::Pwm => FieldRange::new(0.0, 100.0, "%"),
        }
    }
}

impl fmt::Display for SensorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorField {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temperature" => Ok(SensorField::Temperature),
            "humidity" => Ok(SensorField::Humidity),
            "light" => Ok(SensorField::Light),
            "pwm" => Ok(SensorField::Pwm),
            other => Err(ParseError::UnknownField(other.to_string())),
        }
    }
}

/// Static `(min, max, unit)` bounds for one sensor field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldRange {
    /// Smallest accepted value.
    pub min: f64,
    /// Largest accepted value.
    pub max: f64,
    /// Display unit.
    pub unit: &'static str,
}

impl FieldRange {
    /// Create a new field range.
    #[must_use]
    pub const fn new(min: f64, max: f64, unit: &'static str) -> Self {
        Self { min, max, unit }
    }

    /// Check whether a value lies within the range (inclusive on both ends).
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}
