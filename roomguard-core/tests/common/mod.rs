//! Common fixtures for integration tests
//!
//! This module provides:
//! - Reading builders for each sensor kind
//! - Room scenarios (fall, normal activity, climate series)
//! - Assertion helpers for alert sets

#![allow(dead_code)]

use roomguard_core::{fields, Alert, AlertCategory, Reading, SensorKind, Severity, Timestamp};

/// Start of every scenario (2023-11-14T22:13:20Z)
pub const T0: Timestamp = 1_700_000_000;

pub const NODE: &str = "ESP8266_NODE_01";

pub fn motion(at: Timestamp, detected: bool) -> Reading {
    Reading::new(NODE, SensorKind::Motion, at)
        .with_value(fields::MOTION_DETECTED, detected)
        .with_location("Living_Room")
}

pub fn distance(at: Timestamp, cm: f64) -> Reading {
    Reading::new(NODE, SensorKind::Distance, at)
        .with_value(fields::DISTANCE_CM, cm)
        .with_location("Living_Room")
}

pub fn temperature(at: Timestamp, celsius: f64) -> Reading {
    Reading::new(NODE, SensorKind::TemperatureHumidity, at).with_value(fields::TEMPERATURE_C, celsius)
}

pub fn climate(at: Timestamp, celsius: f64, humidity: f64) -> Reading {
    temperature(at, celsius).with_value(fields::HUMIDITY_PERCENT, humidity)
}

/// Person on the floor: no motion and a near-ground echo every 2s
pub fn fall_scenario(duration_secs: i64) -> Vec<Reading> {
    (0..=duration_secs / 2)
        .flat_map(|i| {
            let at = T0 + i * 2;
            [motion(at, false), distance(at, 35.0)]
        })
        .collect()
}

/// Someone walking around: motion and normal distances
pub fn active_room(duration_secs: i64) -> Vec<Reading> {
    (0..=duration_secs / 2)
        .flat_map(|i| {
            let at = T0 + i * 2;
            [motion(at, true), distance(at, 220.0)]
        })
        .collect()
}

/// Temperature readings spaced `step` seconds apart
pub fn temperature_series(values: &[f64], step: i64) -> Vec<Reading> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| temperature(T0 + i as i64 * step, *v))
        .collect()
}

pub fn count(alerts: &[Alert], category: AlertCategory) -> usize {
    alerts.iter().filter(|a| a.category == category).count()
}

pub fn has(alerts: &[Alert], category: AlertCategory, severity: Severity) -> bool {
    alerts
        .iter()
        .any(|a| a.category == category && a.severity == severity)
}
