//! Compound rules spanning more than one quantity or reading
//!
//! - Fire risk: high absolute temperature, a rapid rise against the recent
//!   maximum, and a humidity drop while warm. A rise together with a drop is
//!   escalated to extreme on its own.
//! - Motion anomaly: a motion sensor that has been active for nearly every
//!   recent reading.

use super::config::{FireRiskConfig, MotionPatternConfig};
use crate::alerts::{Alert, AlertCategory, Severity};
use crate::reading::{fields, Reading};

/// Plausible values of the spike window, current reading excluded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpikeWindow {
    pub temperatures: Vec<f64>,
    pub humidities: Vec<f64>,
}

impl SpikeWindow {
    fn max_temperature(&self) -> Option<f64> {
        self.temperatures.iter().copied().reduce(f64::max)
    }

    fn max_humidity(&self) -> Option<f64> {
        self.humidities.iter().copied().reduce(f64::max)
    }
}

/// Evaluate the fire-risk rules for one reading
///
/// `temperature` and `humidity` are the reading's plausible values; every
/// rule needs a temperature.
pub fn fire_risk(
    config: &FireRiskConfig,
    reading: &Reading,
    temperature: Option<f64>,
    humidity: Option<f64>,
    window: &SpikeWindow,
) -> Vec<Alert> {
    let Some(temperature) = temperature else {
        return Vec::new();
    };

    let base = |severity: Severity, message: String| {
        let alert = Alert::new(reading, AlertCategory::FireRisk, severity, message)
            .with_value(fields::TEMPERATURE_C, temperature);
        match humidity {
            Some(humidity) => alert.with_value(fields::HUMIDITY_PERCENT, humidity),
            None => alert,
        }
    };

    let mut alerts = Vec::new();

    if temperature >= config.temperature_c {
        alerts.push(base(
            Severity::Extreme,
            format!(
                "fire risk: temperature reached {temperature:.1}°C (threshold {:.1}°C)",
                config.temperature_c
            ),
        ));
    }

    let rise = window
        .max_temperature()
        .map(|max| temperature - max)
        .filter(|rise| *rise >= config.rapid_rise_c);
    if let Some(rise) = rise {
        alerts.push(
            base(
                Severity::High,
                format!("fire risk: rapid temperature rise of {rise:.1}°C"),
            )
            .with_value("temperature_increase", rise),
        );
    }

    let drop = match (humidity, window.max_humidity()) {
        (Some(current), Some(max)) if temperature > config.humidity_drop_min_temp_c => {
            Some(max - current).filter(|drop| *drop >= config.humidity_drop_pct)
        }
        _ => None,
    };
    if let Some(drop) = drop {
        alerts.push(
            base(
                Severity::Medium,
                format!("fire risk: humidity dropped {drop:.1}% while warm"),
            )
            .with_value("humidity_drop", drop),
        );
    }

    if let (Some(rise), Some(drop)) = (rise, drop) {
        alerts.push(
            base(
                Severity::Extreme,
                format!("fire risk: temperature up {rise:.1}°C with humidity down {drop:.1}%"),
            )
            .with_value("temperature_increase", rise)
            .with_value("humidity_drop", drop),
        );
    }

    alerts
}

/// Raise a low alert for sustained motion
///
/// `window` is in capture-time order with the current reading excluded.
pub fn motion_anomaly(
    config: &MotionPatternConfig,
    reading: &Reading,
    window: &[&Reading],
) -> Option<Alert> {
    if reading.motion_detected() != Some(true) || window.len() < config.min_window {
        return None;
    }

    let motion: Vec<bool> = window.iter().filter_map(|r| r.motion_detected()).collect();
    let recent = &motion[motion.len().saturating_sub(config.sample)..];
    let active = recent.iter().filter(|m| **m).count();

    if active < config.active {
        return None;
    }

    Some(
        Alert::new(
            reading,
            AlertCategory::MotionAnomaly,
            Severity::Low,
            format!("extended motion detected ({active}/{} recent readings)", recent.len()),
        )
        .with_value(fields::MOTION_DETECTED, 1.0)
        .with_value("motion_count", active as f64),
    )
}
