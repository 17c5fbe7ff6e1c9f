//! Device-shadow payload decoding and encoding.
//!
//! The cloud channel uses its own field names (`temperature`, `Humidity`,
//! `LightLux`, `pwm`) inside a nested `params` object. Inbound decoding is
//! deliberately forgiving per field and strict per message: a field that is
//! absent, null, or unparsable is skipped without failing the message, but a
//! message in which no field decodes at all is discarded entirely.

use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::warn;

use enviro_types::{Reading, ReadingPatch, SensorField};

/// Wire name for the temperature field.
pub const WIRE_TEMPERATURE: &str = "temperature";
/// Wire name for the humidity field.
pub const WIRE_HUMIDITY: &str = "Humidity";
/// Wire name for the light field.
pub const WIRE_LIGHT: &str = "LightLux";
/// Wire name for the PWM field.
pub const WIRE_PWM: &str = "pwm";

/// Topic the cloud publishes property-set (downlink) messages on.
#[must_use]
pub fn property_set_topic(product_key: &str, device_name: &str) -> String {
    format!(
        "/sys/{}/{}/thing/service/property/set",
        product_key, device_name
    )
}

/// Topic the hub publishes property-post (uplink) messages on.
#[must_use]
pub fn property_post_topic(product_key: &str, device_name: &str) -> String {
    format!(
        "/sys/{}/{}/thing/event/property/post",
        product_key, device_name
    )
}

/// An inbound device-shadow message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShadowPayload {
    /// Message id assigned by the platform.
    pub id: Option<String>,
    /// Method name, e.g. `thing.service.property.set`.
    pub method: Option<String>,
    /// The property values keyed by wire name.
    pub params: Map<String, Value>,
}

impl ShadowPayload {
    /// Parse a raw payload.
    pub fn parse(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    /// Decode the payload into a partial reading.
    ///
    /// Each wire field is coerced independently; a bad field is skipped with
    /// a log line, never failing the message. The returned patch is empty
    /// when nothing decoded — callers must treat that as "discard".
    #[must_use]
    pub fn to_patch(&self) -> ReadingPatch {
        let mut patch = ReadingPatch::default();

        for (field, wire_name) in WIRE_NAMES {
            if let Some(value) = self.params.get(wire_name) {
                match coerce_number(value) {
                    Some(number) => patch.set(field, number),
                    None => {
                        if !value.is_null() {
                            warn!("shadow field '{}' is not numeric: {}", wire_name, value);
                        }
                    }
                }
            }
        }

        patch
    }
}

const WIRE_NAMES: [(SensorField, &str); 4] = [
    (SensorField::Temperature, WIRE_TEMPERATURE),
    (SensorField::Humidity, WIRE_HUMIDITY),
    (SensorField::Light, WIRE_LIGHT),
    (SensorField::Pwm, WIRE_PWM),
];

/// Coerce a JSON value to a float: numbers pass through, numeric strings are
/// parsed, everything else (null, booleans, objects, arrays) is skipped.
fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Remap a full reading to the wire names for a property post.
#[must_use]
pub fn wire_params(reading: &Reading) -> Value {
    json!({
        "temperature": reading.temperature,
        "Humidity": reading.humidity,
        "LightLux": reading.light,
        "pwm": reading.pwm,
    })
}

/// Build the body of a property-post message.
#[must_use]
pub fn property_post_body(reading: &Reading) -> Value {
    json!({
        "id": reading.timestamp.to_string(),
        "version": "1.0",
        "params": wire_params(reading),
        "method": "thing.event.property.post",
    })
}
