//! Ingestion Normalizer
//!
//! ## Overview
//!
//! Devices in the field publish several payload generations at once:
//!
//! ```text
//! sensors/pir/NODE_01         1
//! sensors/ultrasonic/NODE_01  "123.4"
//! sensors/dht22/NODE_01       {"temperature_c": 22.1, "humidity_percent": 41.0}
//! sensors/combined/NODE_01    {"device_id": "NODE_01", "sensors": {"pir": {...}, ...}, "wifi": {...}}
//! wearable/fall/BAND_07       {"event": "fall_detected", "severity": 8}
//! ```
//!
//! The raw bytes are resolved exactly once into a [`RawPayload`]; everything
//! after that works on the tagged union and never re-inspects the bytes.
//!
//! ## Resolution Order
//!
//! | Attribute    | Explicit field              | Fallback                       |
//! |--------------|-----------------------------|--------------------------------|
//! | device id    | `device_id`, `deviceId`     | topic position, then `unknown` |
//! | kind         | `sensor_type`, `kind`       | topic segment, then the values |
//! | capture time | `timestamp`                 | receive time from the clock    |
//!
//! A device timestamp more than five minutes ahead of the clock, or more than
//! a day behind it, is treated as a broken device clock (an unset RTC, a
//! since-boot counter, milliseconds) and replaced by the receive time.
//! | location     | `location`                  | none                           |
//!
//! ## Failure Mode
//!
//! Normalization never fails. Input that cannot be interpreted produces a
//! reading with kind [`SensorKind::Unknown`] and an empty value bag, and the
//! reason is logged at debug level.

use std::sync::Arc;

use log::{debug, warn};
use serde_json::{Map, Value};

use crate::constants::time::{MAX_FUTURE_SKEW_SECS, MAX_PAST_SKEW_SECS};
use crate::reading::{fields, FieldValue, Reading, SensorKind, ValueBag};
use crate::time::{elapsed_secs, TimeSource, Timestamp};

/// Device id used when neither payload nor topic names one
pub const UNKNOWN_DEVICE: &str = "unknown";

/// Keys that describe the message rather than the measurement
const METADATA_KEYS: &[&str] = &[
    "device_id",
    "deviceId",
    "device_name",
    "sensor_type",
    "kind",
    "timestamp",
    "location",
    "topic",
    "raw",
    "received_at",
];

/// Embedded sensor records of the multi-sensor payload
const EMBEDDED_SENSORS: &[(&str, SensorKind)] = &[
    ("pir", SensorKind::Motion),
    ("ultrasonic", SensorKind::Distance),
    ("dht22", SensorKind::TemperatureHumidity),
];

/// Payload shape, resolved once per message
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    /// JSON object
    Record(Map<String, Value>),
    /// Anything else that parsed: number, bool, bare text, array
    Scalar(Value),
    /// Undecodable input, with the reason
    Malformed(String),
}

impl RawPayload {
    /// Classify raw payload bytes
    pub fn parse(bytes: &[u8]) -> Self {
        let text = match std::str::from_utf8(bytes) {
            Ok(text) => text.trim(),
            Err(err) => return RawPayload::Malformed(format!("invalid utf-8: {err}")),
        };

        if text.is_empty() {
            return RawPayload::Malformed("empty payload".to_string());
        }

        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => RawPayload::Record(map),
            Ok(other) => RawPayload::Scalar(other),
            // Looked like JSON structure but was truncated or corrupt
            Err(err) if text.starts_with('{') || text.starts_with('[') => {
                RawPayload::Malformed(format!("invalid json: {err}"))
            }
            Err(_) => RawPayload::Scalar(Value::String(text.to_string())),
        }
    }

    /// Whether this is the multi-sensor record shape
    pub fn is_multi_sensor(&self) -> bool {
        matches!(self, RawPayload::Record(map) if matches!(map.get("sensors"), Some(Value::Object(_))))
    }
}

/// What the topic says about a message
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct TopicHint<'a> {
    kind: Option<SensorKind>,
    device: Option<&'a str>,
}

fn topic_hint(topic: &str) -> TopicHint<'_> {
    let segments: Vec<&str> = topic.split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        ["sensors", kind, device, ..] => TopicHint {
            kind: SensorKind::from_alias(kind),
            device: Some(*device),
        },
        ["sensors", kind] => TopicHint {
            kind: SensorKind::from_alias(kind),
            device: None,
        },
        ["wearable", _event, device, ..] => TopicHint {
            kind: Some(SensorKind::Wearable),
            device: Some(*device),
        },
        ["wearable", ..] => TopicHint {
            kind: Some(SensorKind::Wearable),
            device: None,
        },
        ["devices", device, ..] => TopicHint {
            kind: None,
            device: Some(*device),
        },
        _ => TopicHint::default(),
    }
}

/// Convert one JSON leaf into a bag value
fn field_value(value: &Value) -> Option<FieldValue> {
    match value {
        Value::Bool(flag) => Some(FieldValue::Flag(*flag)),
        Value::Number(number) => number.as_f64().map(FieldValue::Number),
        Value::String(text) => {
            let text = text.trim();
            match text.to_ascii_lowercase().as_str() {
                "true" => Some(FieldValue::Flag(true)),
                "false" => Some(FieldValue::Flag(false)),
                _ => text
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .map(FieldValue::Number),
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn timestamp_field(map: &Map<String, Value>) -> Option<Timestamp> {
    let seconds = match map.get("timestamp")? {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !seconds.is_finite() || seconds < 0.0 || seconds > i64::MAX as f64 {
        return None;
    }
    Some(seconds.trunc() as Timestamp)
}

/// Flatten a record into the bag, skipping metadata at the top level
fn flatten_into(bag: &mut ValueBag, map: &Map<String, Value>, top_level: bool) {
    for (key, value) in map {
        if top_level && METADATA_KEYS.contains(&key.as_str()) {
            continue;
        }
        match value {
            Value::Object(nested) => flatten_into(bag, nested, false),
            leaf => {
                if let Some(converted) = field_value(leaf) {
                    bag.insert(key.clone(), converted);
                }
            }
        }
    }
}

/// Pick a kind from the values a reading carries
fn infer_kind(bag: &ValueBag) -> SensorKind {
    if bag.contains_key(fields::MOTION_DETECTED) {
        SensorKind::Motion
    } else if bag.contains_key(fields::TEMPERATURE_C) || bag.contains_key(fields::HUMIDITY_PERCENT) {
        SensorKind::TemperatureHumidity
    } else if bag.contains_key(fields::DISTANCE_CM) {
        SensorKind::Distance
    } else if bag.contains_key(fields::RSSI) {
        SensorKind::SignalStrength
    } else if bag.contains_key(fields::SEVERITY) {
        SensorKind::Wearable
    } else {
        SensorKind::Unknown
    }
}

/// Move a lone synthetic `value` onto the kind's own field
fn interpret_scalar(kind: SensorKind, bag: &mut ValueBag) {
    let only_value = bag.len() == 1 && bag.contains_key(fields::VALUE);
    if !only_value {
        return;
    }
    let Some(target) = kind.scalar_field() else {
        return;
    };
    if let Some(value) = bag.remove(fields::VALUE) {
        let converted = match kind {
            SensorKind::Motion => FieldValue::Flag(value.as_bool()),
            _ => FieldValue::Number(value.as_f64()),
        };
        bag.insert(target.to_string(), converted);
    }
}

/// Turns topic + payload pairs into canonical readings
pub struct Normalizer {
    clock: Arc<dyn TimeSource>,
    max_future_skew_secs: i64,
    max_past_skew_secs: i64,
}

impl Normalizer {
    /// Create a normalizer stamping undated readings from `clock`
    pub fn new(clock: Arc<dyn TimeSource>) -> Self {
        Self {
            clock,
            max_future_skew_secs: MAX_FUTURE_SKEW_SECS,
            max_past_skew_secs: MAX_PAST_SKEW_SECS,
        }
    }

    /// Override how far device timestamps may drift from the clock
    pub fn with_max_skew(mut self, future_secs: i64, past_secs: i64) -> Self {
        self.max_future_skew_secs = future_secs.max(0);
        self.max_past_skew_secs = past_secs.max(0);
        self
    }

    /// Device capture time, or the receive time when the device clock is off
    fn capture_time(&self, topic: &str, claimed: Option<Timestamp>) -> Timestamp {
        let now = self.clock.now();
        let Some(claimed) = claimed else {
            return now;
        };
        let ahead = elapsed_secs(now, claimed);
        let behind = elapsed_secs(claimed, now);
        if ahead > self.max_future_skew_secs || behind > self.max_past_skew_secs {
            warn!(
                "timestamp {claimed} on {topic} is off by {}s, using receive time",
                ahead.max(behind)
            );
            return now;
        }
        claimed
    }

    /// Normalize one message
    pub fn normalize(&self, topic: &str, payload: &[u8]) -> Reading {
        self.normalize_payload(topic, RawPayload::parse(payload))
    }

    /// Normalize an already classified payload
    pub fn normalize_payload(&self, topic: &str, payload: RawPayload) -> Reading {
        let hint = topic_hint(topic);
        let topic_device = hint.device.unwrap_or(UNKNOWN_DEVICE);

        match payload {
            RawPayload::Malformed(reason) => {
                debug!("malformed payload on {topic}: {reason}");
                Reading::new(topic_device, SensorKind::Unknown, self.clock.now()).with_topic(topic)
            }
            RawPayload::Scalar(value) => {
                let mut bag = ValueBag::new();
                if let Some(converted) = field_value(&value) {
                    bag.insert(fields::VALUE.to_string(), converted);
                } else {
                    debug!("uninterpretable scalar on {topic}: {value}");
                }
                let kind = hint.kind.unwrap_or(SensorKind::Unknown);
                interpret_scalar(kind, &mut bag);

                let mut reading = Reading::new(topic_device, kind, self.clock.now()).with_topic(topic);
                reading.values = bag;
                reading
            }
            RawPayload::Record(map) => self.from_record(topic, hint, &map),
        }
    }

    fn from_record(&self, topic: &str, hint: TopicHint<'_>, map: &Map<String, Value>) -> Reading {
        let device_id = text_field(map, "device_id")
            .or_else(|| text_field(map, "deviceId"))
            .unwrap_or_else(|| hint.device.unwrap_or(UNKNOWN_DEVICE).to_string());

        let explicit_kind = text_field(map, "sensor_type")
            .or_else(|| text_field(map, "kind"))
            .and_then(|alias| SensorKind::from_alias(&alias));

        let mut bag = ValueBag::new();
        flatten_into(&mut bag, map, true);

        let kind = explicit_kind
            .or(hint.kind)
            .unwrap_or_else(|| infer_kind(&bag));
        interpret_scalar(kind, &mut bag);

        let captured_at = self.capture_time(topic, timestamp_field(map));

        let mut reading = Reading::new(device_id, kind, captured_at).with_topic(topic);
        if let Some(location) = text_field(map, "location") {
            reading = reading.with_location(location);
        }
        reading.values = bag;
        reading
    }

    /// Normalize one message into one reading per embedded sensor
    ///
    /// The multi-sensor record splits into motion, distance,
    /// temperature/humidity and signal strength readings that share device,
    /// location and capture time. Every other payload yields exactly one
    /// reading.
    pub fn normalize_batch(&self, topic: &str, payload: &[u8]) -> Vec<Reading> {
        let payload = RawPayload::parse(payload);
        if !payload.is_multi_sensor() {
            return vec![self.normalize_payload(topic, payload)];
        }

        let RawPayload::Record(map) = payload else {
            return Vec::new();
        };
        let base = self.from_record(topic, topic_hint(topic), &map);

        let mut readings = Vec::new();
        if let Some(Value::Object(sensors)) = map.get("sensors") {
            for (name, kind) in EMBEDDED_SENSORS {
                if let Some(Value::Object(record)) = sensors.get(*name) {
                    readings.push(split_reading(&base, *kind, record));
                }
            }
        }
        if let Some(Value::Object(wifi)) = map.get("wifi") {
            readings.push(split_reading(&base, SensorKind::SignalStrength, wifi));
        }

        if readings.is_empty() {
            debug!("multi-sensor payload on {topic} carried no known sensors");
            readings.push(base);
        }
        readings
    }
}

fn split_reading(base: &Reading, kind: SensorKind, record: &Map<String, Value>) -> Reading {
    let mut values = ValueBag::new();
    flatten_into(&mut values, record, false);
    Reading {
        kind,
        values,
        ..base.clone()
    }
}
