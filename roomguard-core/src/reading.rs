//! Canonical Reading Record
//!
//! ## Overview
//!
//! Every inbound message, whatever its shape, is turned into exactly this type
//! by the [`Normalizer`](crate::normalize::Normalizer). Downstream components
//! (fusion, trend evaluation, the anomaly overlay) only ever see `Reading`s and
//! never touch raw payloads.
//!
//! ```text
//! sensors/pir/ESP8266_NODE_01   "0"          ──┐
//! sensors/dht22/ESP8266_NODE_01 {"temperature_c": 22.4, ...}  ──┼─→ Reading
//! sensors/combined/...          {"sensors": {...}}            ──┘
//! ```
//!
//! ## Value Bag
//!
//! Sensor kinds report different quantities, so readings carry an ordered map
//! of named values rather than fixed fields. Well-known names live in
//! [`fields`]; typed accessors such as [`Reading::temperature_c`] only return
//! finite numbers, so a NaN never reaches the scoring code.
//!
//! ## Ordering
//!
//! Capture time is monotonic per (device, kind) in normal operation, but
//! arrival order is not guaranteed across reconnects. Consumers sort with
//! [`chronological`] instead of trusting slice order.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Well-known value bag field names
pub mod fields {
    /// Motion flag from PIR sensors
    pub const MOTION_DETECTED: &str = "motion_detected";
    /// Distance to nearest object from ultrasonic sensors (cm)
    pub const DISTANCE_CM: &str = "distance_cm";
    /// Air temperature (°C)
    pub const TEMPERATURE_C: &str = "temperature_c";
    /// Relative humidity (%)
    pub const HUMIDITY_PERCENT: &str = "humidity_percent";
    /// Wi-Fi received signal strength (dBm)
    pub const RSSI: &str = "rssi";
    /// Severity reported by a wearable (0-10)
    pub const SEVERITY: &str = "severity";
    /// Synthetic key used to wrap non-record payloads
    pub const VALUE: &str = "value";
}

/// Sensor kind enumeration
///
/// Maps to the quantities a reading is expected to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// PIR motion sensor
    Motion,
    /// Ultrasonic distance sensor
    Distance,
    /// Combined temperature/humidity sensor (DHT22)
    TemperatureHumidity,
    /// Wi-Fi signal strength
    SignalStrength,
    /// Wearable device events (fall, accelerometer)
    Wearable,
    /// Could not be determined from payload or topic
    Unknown,
}

impl SensorKind {
    /// Get human-readable name
    pub const fn name(&self) -> &'static str {
        match self {
            SensorKind::Motion => "motion",
            SensorKind::Distance => "distance",
            SensorKind::TemperatureHumidity => "temperature_humidity",
            SensorKind::SignalStrength => "signal_strength",
            SensorKind::Wearable => "wearable",
            SensorKind::Unknown => "unknown",
        }
    }

    /// Resolve a kind from a topic segment or explicit payload field
    ///
    /// Accepts both hardware names (`pir`, `dht22`) and canonical names.
    pub fn from_alias(alias: &str) -> Option<Self> {
        match alias.trim().to_ascii_lowercase().as_str() {
            "pir" | "motion" => Some(SensorKind::Motion),
            "ultrasonic" | "distance" => Some(SensorKind::Distance),
            "dht22" | "dht" | "temperature" | "humidity" | "temperature_humidity" => {
                Some(SensorKind::TemperatureHumidity)
            }
            "wifi" | "rssi" | "signal_strength" => Some(SensorKind::SignalStrength),
            "wearable" | "fall" | "accelerometer" => Some(SensorKind::Wearable),
            "unknown" => Some(SensorKind::Unknown),
            _ => None,
        }
    }

    /// Field a bare scalar payload is stored under for this kind
    pub const fn scalar_field(&self) -> Option<&'static str> {
        match self {
            SensorKind::Motion => Some(fields::MOTION_DETECTED),
            SensorKind::Distance => Some(fields::DISTANCE_CM),
            SensorKind::TemperatureHumidity => Some(fields::TEMPERATURE_C),
            SensorKind::SignalStrength => Some(fields::RSSI),
            SensorKind::Wearable => Some(fields::SEVERITY),
            SensorKind::Unknown => None,
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Measured quantity evaluated by the trend rules and the anomaly overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    /// Air temperature in °C
    Temperature,
    /// Relative humidity in %
    Humidity,
    /// Ultrasonic distance in cm
    Distance,
    /// Wi-Fi RSSI in dBm
    SignalStrength,
    /// Motion flag sequence (no statistical fallback)
    MotionPattern,
}

impl Quantity {
    /// All quantities, in evaluation order
    pub const ALL: [Quantity; 5] = [
        Quantity::Temperature,
        Quantity::Humidity,
        Quantity::Distance,
        Quantity::SignalStrength,
        Quantity::MotionPattern,
    ];

    /// Value bag field carrying this quantity
    pub const fn field(&self) -> &'static str {
        match self {
            Quantity::Temperature => fields::TEMPERATURE_C,
            Quantity::Humidity => fields::HUMIDITY_PERCENT,
            Quantity::Distance => fields::DISTANCE_CM,
            Quantity::SignalStrength => fields::RSSI,
            Quantity::MotionPattern => fields::MOTION_DETECTED,
        }
    }

    /// Get human-readable name
    pub const fn name(&self) -> &'static str {
        match self {
            Quantity::Temperature => "temperature",
            Quantity::Humidity => "humidity",
            Quantity::Distance => "distance",
            Quantity::SignalStrength => "signal_strength",
            Quantity::MotionPattern => "motion_pattern",
        }
    }

    /// Get expected unit of measurement
    pub const fn unit(&self) -> &'static str {
        match self {
            Quantity::Temperature => "°C",
            Quantity::Humidity => "%",
            Quantity::Distance => "cm",
            Quantity::SignalStrength => "dBm",
            Quantity::MotionPattern => "",
        }
    }

    /// Whether the quantity is a continuous, threshold-style measurement
    pub const fn is_continuous(&self) -> bool {
        !matches!(self, Quantity::MotionPattern)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of the value bag
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean flag (motion, door open, ...)
    Flag(bool),
    /// Numeric measurement
    Number(f64),
}

impl FieldValue {
    /// Numeric view; flags map to 1.0 / 0.0
    pub fn as_f64(&self) -> f64 {
        match *self {
            FieldValue::Flag(flag) => {
                if flag {
                    1.0
                } else {
                    0.0
                }
            }
            FieldValue::Number(value) => value,
        }
    }

    /// Boolean view; numbers are true when non-zero
    pub fn as_bool(&self) -> bool {
        match *self {
            FieldValue::Flag(flag) => flag,
            FieldValue::Number(value) => value != 0.0,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

/// Kind-specific named values of one reading
pub type ValueBag = BTreeMap<String, FieldValue>;

/// One normalized sensor observation
///
/// Immutable once built; the builder-style `with_*` methods consume `self`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Reporting device
    pub device_id: String,
    /// Sensor kind
    pub kind: SensorKind,
    /// Capture time (epoch seconds)
    pub captured_at: Timestamp,
    /// Named values
    pub values: ValueBag,
    /// Room or area label, if the device reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Topic the reading arrived on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl Reading {
    /// Create a reading with an empty value bag
    pub fn new(device_id: impl Into<String>, kind: SensorKind, captured_at: Timestamp) -> Self {
        Self {
            device_id: device_id.into(),
            kind,
            captured_at,
            values: ValueBag::new(),
            location: None,
            topic: None,
        }
    }

    /// Add a named value
    pub fn with_value(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    /// Set the location label
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the originating topic
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Raw value bag lookup
    pub fn value(&self, field: &str) -> Option<FieldValue> {
        self.values.get(field).copied()
    }

    /// Finite numeric value of a field
    pub fn number(&self, field: &str) -> Option<f64> {
        self.value(field)
            .map(|value| value.as_f64())
            .filter(|value| value.is_finite())
    }

    /// Boolean value of a field
    pub fn flag(&self, field: &str) -> Option<bool> {
        self.value(field).map(|value| value.as_bool())
    }

    /// Finite value of a measured quantity
    pub fn quantity(&self, quantity: Quantity) -> Option<f64> {
        self.number(quantity.field())
    }

    pub fn motion_detected(&self) -> Option<bool> {
        self.flag(fields::MOTION_DETECTED)
    }

    pub fn distance_cm(&self) -> Option<f64> {
        self.number(fields::DISTANCE_CM)
    }

    pub fn temperature_c(&self) -> Option<f64> {
        self.number(fields::TEMPERATURE_C)
    }

    pub fn humidity_percent(&self) -> Option<f64> {
        self.number(fields::HUMIDITY_PERCENT)
    }

    /// True when the value bag holds nothing usable
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Borrow readings in capture-time order
///
/// Stable: readings sharing a timestamp keep their relative order.
pub fn chronological(readings: &[Reading]) -> Vec<&Reading> {
    let mut ordered: Vec<&Reading> = readings.iter().collect();
    ordered.sort_by_key(|reading| reading.captured_at);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_aliases() {
        assert_eq!(SensorKind::from_alias("pir"), Some(SensorKind::Motion));
        assert_eq!(SensorKind::from_alias("Ultrasonic"), Some(SensorKind::Distance));
        assert_eq!(SensorKind::from_alias("dht22"), Some(SensorKind::TemperatureHumidity));
        assert_eq!(SensorKind::from_alias("wifi"), Some(SensorKind::SignalStrength));
        assert_eq!(SensorKind::from_alias("combined"), None);
    }

    #[test]
    fn accessors_skip_non_finite() {
        let reading = Reading::new("node", SensorKind::TemperatureHumidity, 10)
            .with_value(fields::TEMPERATURE_C, f64::NAN)
            .with_value(fields::HUMIDITY_PERCENT, 40.0);

        assert_eq!(reading.temperature_c(), None);
        assert_eq!(reading.humidity_percent(), Some(40.0));
    }

    #[test]
    fn flags_and_numbers_interconvert() {
        let reading = Reading::new("node", SensorKind::Motion, 10)
            .with_value(fields::MOTION_DETECTED, 0.0);

        assert_eq!(reading.motion_detected(), Some(false));
        assert_eq!(FieldValue::Flag(true).as_f64(), 1.0);
    }

    #[test]
    fn chronological_sorts_out_of_order() {
        let readings = vec![
            Reading::new("a", SensorKind::Motion, 30),
            Reading::new("a", SensorKind::Motion, 10),
            Reading::new("a", SensorKind::Motion, 20),
        ];

        let times: Vec<_> = chronological(&readings).iter().map(|r| r.captured_at).collect();
        assert_eq!(times, vec![10, 20, 30]);
    }

    #[test]
    fn serializes_snake_case() {
        let reading = Reading::new("node", SensorKind::TemperatureHumidity, 5)
            .with_value(fields::TEMPERATURE_C, 21.5);
        let json = serde_json::to_value(&reading).unwrap();

        assert_eq!(json["kind"], "temperature_humidity");
        assert_eq!(json["values"]["temperature_c"], 21.5);
        assert!(json.get("location").is_none());
    }
}
