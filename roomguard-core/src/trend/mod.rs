//! Trend Evaluator
//!
//! ## Overview
//!
//! Evaluates one incoming reading against its device's recent window and
//! returns every alert it raises. The evaluator never fails: bad values turn
//! into sensor fault alerts, missing history simply disables the rules that
//! need it.
//!
//! ## Rule Order
//!
//! ```text
//! reading ─→ physical range ──(implausible)──→ sensor_fault
//!                 │
//!              (valid)
//!                 ├─→ threshold bands ──────→ threshold_breach   (≤ 1 per quantity)
//!                 ├─→ fluctuation window ───→ rapid_fluctuation
//!                 ├─→ compound rules ───────→ fire_risk, motion_anomaly
//!                 └─→ anomaly overlay ──────→ anomaly_overlay    (optional)
//! ```
//!
//! Implausible values are kept out of every later rule, in the current
//! reading and in the window alike.
//!
//! ## Windows
//!
//! | Rule          | Look-back (default) |
//! |---------------|---------------------|
//! | fluctuation   | 5 minutes           |
//! | rise / drop   | 2 minutes           |
//! | motion        | whole window        |
//!
//! Alerts are not deduplicated; the sink sees each one.

pub mod bands;
pub mod compound;
pub mod config;

pub use bands::{PhysicalRange, ThresholdBands};
pub use config::{FireRiskConfig, FluctuationRule, MotionPatternConfig, QuantityRules, TrendConfig};

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;

use crate::alerts::{Alert, AlertCategory, Severity};
use crate::features;
use crate::reading::{chronological, Quantity, Reading};
use crate::time::Timestamp;
use crate::traits::AnomalyOverlay;
use compound::SpikeWindow;

/// Sliding-window rule engine
pub struct TrendEvaluator {
    config: TrendConfig,
    overlay: Option<Arc<dyn AnomalyOverlay>>,
}

impl Default for TrendEvaluator {
    fn default() -> Self {
        Self::new(TrendConfig::default())
    }
}

impl TrendEvaluator {
    pub fn new(config: TrendConfig) -> Self {
        Self {
            config,
            overlay: None,
        }
    }

    /// Offer valid features to `overlay` after the deterministic rules
    pub fn with_overlay(mut self, overlay: Arc<dyn AnomalyOverlay>) -> Self {
        self.overlay = Some(overlay);
        self
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    /// Evaluate `reading` against `window`
    ///
    /// The window is re-sorted by capture time and the current reading is
    /// dropped from it if present. Alerts are raised for `device_id`.
    pub fn evaluate(&self, device_id: &str, reading: &Reading, window: &[Reading]) -> Vec<Alert> {
        let history: Vec<&Reading> = chronological(window)
            .into_iter()
            .filter(|r| *r != reading)
            .collect();

        let mut alerts = Vec::new();
        let mut valid: BTreeMap<Quantity, f64> = BTreeMap::new();

        for quantity in Quantity::ALL {
            let Some(rules) = self.config.rules(quantity) else {
                continue;
            };
            let Some(value) = reading.value(quantity.field()).map(|v| v.as_f64()) else {
                continue;
            };

            if !rules.physical.contains(value) {
                alerts.push(sensor_fault(reading, quantity, value, rules.physical));
                continue;
            }
            valid.insert(quantity, value);

            if let Some(alert) = threshold_breach(reading, quantity, value, rules) {
                alerts.push(alert);
            }
            if let Some(alert) = self.fluctuation(reading, quantity, value, rules, &history) {
                alerts.push(alert);
            }
        }

        let spike = self.spike_window(reading.captured_at, &history);
        alerts.extend(compound::fire_risk(
            &self.config.fire_risk,
            reading,
            valid.get(&Quantity::Temperature).copied(),
            valid.get(&Quantity::Humidity).copied(),
            &spike,
        ));
        alerts.extend(compound::motion_anomaly(&self.config.motion, reading, &history));

        if let Some(overlay) = &self.overlay {
            alerts.extend(self.overlay_alerts(overlay.as_ref(), reading, &valid, &history));
        }

        for alert in &mut alerts {
            if alert.device_id != device_id {
                alert.device_id = device_id.to_string();
            }
        }
        alerts
    }

    /// Plausible values of `quantity` from readings at or after `since`
    fn valid_values(
        &self,
        quantity: Quantity,
        history: &[&Reading],
        since: Timestamp,
    ) -> Vec<f64> {
        let Some(rules) = self.config.rules(quantity) else {
            return Vec::new();
        };
        history
            .iter()
            .filter(|r| r.captured_at >= since)
            .filter_map(|r| r.quantity(quantity))
            .filter(|v| rules.physical.contains(*v))
            .collect()
    }

    fn fluctuation(
        &self,
        reading: &Reading,
        quantity: Quantity,
        value: f64,
        rules: &QuantityRules,
        history: &[&Reading],
    ) -> Option<Alert> {
        let rule = rules.fluctuation?;
        let since = reading.captured_at.saturating_sub(self.config.fluctuation_window_secs);

        let mut values = self.valid_values(quantity, history, since);
        if values.len() < 2 {
            return None;
        }
        values.push(value);

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;
        if range <= rule.threshold {
            return None;
        }

        let minutes = self.config.fluctuation_window_secs as f64 / 60.0;
        Some(
            Alert::new(
                reading,
                AlertCategory::RapidFluctuation,
                rule.severity,
                format!(
                    "rapid {} fluctuation: {range:.1}{} within {minutes:.0} min ({min:.1} to {max:.1})",
                    quantity.name(),
                    quantity.unit()
                ),
            )
            .with_value(quantity.field(), value)
            .with_value("range", range)
            .with_value("min", min)
            .with_value("max", max),
        )
    }

    fn spike_window(&self, at: Timestamp, history: &[&Reading]) -> SpikeWindow {
        let since = at.saturating_sub(self.config.spike_window_secs);
        SpikeWindow {
            temperatures: self.valid_values(Quantity::Temperature, history, since),
            humidities: self.valid_values(Quantity::Humidity, history, since),
        }
    }

    fn overlay_alerts(
        &self,
        overlay: &dyn AnomalyOverlay,
        reading: &Reading,
        valid: &BTreeMap<Quantity, f64>,
        history: &[&Reading],
    ) -> Vec<Alert> {
        let window: Vec<Reading> = history.iter().map(|r| (*r).clone()).collect();
        let mut offered: Vec<Quantity> = valid.keys().copied().collect();
        if reading.motion_detected().is_some() {
            offered.push(Quantity::MotionPattern);
        }

        offered
            .into_iter()
            .filter_map(|quantity| {
                let features = features::extract(quantity, reading, &plausible(self, quantity, &window))?;
                let draft = overlay.try_score(quantity, &features)?;
                debug!(
                    "{} overlay flagged {} on {}",
                    overlay.strategy(),
                    quantity,
                    reading.device_id
                );
                Some(draft.into_alert(reading))
            })
            .collect()
    }
}

/// Window readings whose value of `quantity` is plausible
fn plausible(evaluator: &TrendEvaluator, quantity: Quantity, window: &[Reading]) -> Vec<Reading> {
    match evaluator.config.rules(quantity) {
        Some(rules) => window
            .iter()
            .filter(|r| r.quantity(quantity).is_some_and(|v| rules.physical.contains(v)))
            .cloned()
            .collect(),
        None => window.to_vec(),
    }
}

fn sensor_fault(reading: &Reading, quantity: Quantity, value: f64, range: PhysicalRange) -> Alert {
    let alert = Alert::new(
        reading,
        AlertCategory::SensorFault,
        Severity::Medium,
        format!(
            "sensor fault: {} reading {value:.1}{} outside {:.0} to {:.0}",
            quantity.name(),
            quantity.unit(),
            range.min,
            range.max
        ),
    );
    if value.is_finite() {
        alert.with_value(quantity.field(), value)
    } else {
        alert
    }
}

fn threshold_breach(
    reading: &Reading,
    quantity: Quantity,
    value: f64,
    rules: &QuantityRules,
) -> Option<Alert> {
    let bands = rules.bands?;
    let severity = bands.classify(value)?;
    let limit = bands.crossed_limit(value, severity);
    let direction = if value < bands.normal_min { "low" } else { "high" };

    Some(
        Alert::new(
            reading,
            AlertCategory::ThresholdBreach,
            severity,
            format!(
                "{} {direction}: {value:.1}{unit} (limit {limit:.1}{unit})",
                quantity.name(),
                unit = quantity.unit()
            ),
        )
        .with_value(quantity.field(), value)
        .with_value("limit", limit),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::{fields, SensorKind};

    fn temp(at: i64, value: f64) -> Reading {
        Reading::new("dht", SensorKind::TemperatureHumidity, at).with_value(fields::TEMPERATURE_C, value)
    }

    #[test]
    fn fault_replaces_threshold() {
        let evaluator = TrendEvaluator::default();
        let alerts = evaluator.evaluate("dht", &temp(10, 95.0), &[]);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].category, AlertCategory::SensorFault);
        assert_eq!(alerts[0].severity, Severity::Medium);
    }

    #[test]
    fn nan_is_a_fault() {
        let evaluator = TrendEvaluator::default();
        let alerts = evaluator.evaluate("dht", &temp(10, f64::NAN), &[]);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].category, AlertCategory::SensorFault);
        assert!(alerts[0].values.is_empty());
    }

    #[test]
    fn one_threshold_alert_per_quantity() {
        let evaluator = TrendEvaluator::default();
        let alerts = evaluator.evaluate("dht", &temp(10, 36.0), &[]);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].category, AlertCategory::ThresholdBreach);
        assert_eq!(alerts[0].severity, Severity::Extreme);
        assert_eq!(alerts[0].value("limit"), Some(35.0));
    }

    #[test]
    fn current_reading_in_window_is_ignored() {
        let evaluator = TrendEvaluator::default();
        let current = temp(20, 24.0);
        let window = vec![temp(10, 20.0), current.clone()];

        // only one other window value, so no fluctuation check
        assert!(evaluator.evaluate("dht", &current, &window).is_empty());
    }

    #[test]
    fn implausible_history_is_skipped() {
        let evaluator = TrendEvaluator::default();
        let window = vec![temp(0, 20.0), temp(5, -60.0), temp(10, 20.5)];
        let alerts = evaluator.evaluate("dht", &temp(20, 21.0), &window);
        assert!(alerts.is_empty());
    }

    #[test]
    fn old_values_leave_fluctuation_window() {
        let evaluator = TrendEvaluator::default();
        let window = vec![temp(0, 18.5), temp(10, 19.0), temp(400, 22.0), temp(410, 22.2)];
        let alerts = evaluator.evaluate("dht", &temp(420, 22.4), &window);
        assert!(alerts.is_empty());
    }

    #[test]
    fn alerts_use_given_device() {
        let evaluator = TrendEvaluator::default();
        let alerts = evaluator.evaluate("room-1", &temp(10, 36.0), &[]);
        assert_eq!(alerts[0].device_id, "room-1");
    }
}
