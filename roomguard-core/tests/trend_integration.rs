//! Integration tests for the trend evaluator
//!
//! Exercises the full rule chain on realistic windows:
//! - Rapid fluctuation over the sliding window
//! - Fire-risk compound rules
//! - Overlay alerts layered on top of deterministic ones

mod common;

use std::sync::Arc;

use roomguard_core::{
    AlertCategory, AlertDraft, AnomalyOverlay, DraftSource, FeatureVector, Quantity, Severity,
    TrendConfig, TrendEvaluator,
};

use common::{climate, count, has, motion, temperature, temperature_series, NODE, T0};

/// Overlay that flags temperature only
struct TemperatureOnly;

impl AnomalyOverlay for TemperatureOnly {
    fn try_score(&self, quantity: Quantity, features: &FeatureVector) -> Option<AlertDraft> {
        (quantity == Quantity::Temperature).then(|| {
            AlertDraft::new(
                quantity,
                Severity::Medium,
                "temperature anomaly",
                DraftSource::Statistical { z_score: 3.5 },
            )
            .with_value("temperature_c", features.current)
        })
    }

    fn strategy(&self) -> &'static str {
        "test"
    }
}

/// Overlay that never has an opinion
struct Silent;

impl AnomalyOverlay for Silent {
    fn try_score(&self, _quantity: Quantity, _features: &FeatureVector) -> Option<AlertDraft> {
        None
    }

    fn strategy(&self) -> &'static str {
        "silent"
    }
}

#[test]
fn test_fluctuation_range_alert() {
    let evaluator = TrendEvaluator::default();
    let window = temperature_series(&[20.0, 20.5], 30);
    let current = temperature(T0 + 60, 24.0);

    let alerts = evaluator.evaluate(NODE, &current, &window);

    assert_eq!(alerts.len(), 1);
    let alert = &alerts[0];
    assert_eq!(alert.category, AlertCategory::RapidFluctuation);
    assert_eq!(alert.severity, Severity::High);
    assert_eq!(alert.value("range"), Some(4.0));
    assert_eq!(alert.value("min"), Some(20.0));
    assert_eq!(alert.value("max"), Some(24.0));
}

#[test]
fn test_single_reading_never_fluctuates() {
    let evaluator = TrendEvaluator::default();

    let alone = evaluator.evaluate(NODE, &temperature(T0, 24.0), &[]);
    assert_eq!(count(&alone, AlertCategory::RapidFluctuation), 0);

    let one_prior = evaluator.evaluate(
        NODE,
        &temperature(T0 + 10, 25.0),
        &temperature_series(&[19.0], 10),
    );
    assert_eq!(count(&one_prior, AlertCategory::RapidFluctuation), 0);
}

#[test]
fn test_range_equal_to_threshold_is_quiet() {
    let evaluator = TrendEvaluator::new(TrendConfig::default().with_temperature_fluctuation(4.0));
    let window = temperature_series(&[20.0, 20.5], 30);

    let alerts = evaluator.evaluate(NODE, &temperature(T0 + 60, 24.0), &window);
    assert!(alerts.is_empty());
}

#[test]
fn test_fire_risk_after_spike() {
    let evaluator = TrendEvaluator::default();
    let window = temperature_series(&[22.0, 22.5], 20);
    let current = temperature(T0 + 40, 41.0);

    let alerts = evaluator.evaluate(NODE, &current, &window);

    assert!(has(&alerts, AlertCategory::FireRisk, Severity::Extreme));
    assert!(has(&alerts, AlertCategory::FireRisk, Severity::High));
    let rise = alerts
        .iter()
        .find(|a| a.category == AlertCategory::FireRisk && a.severity == Severity::High)
        .and_then(|a| a.value("temperature_increase"));
    assert_eq!(rise, Some(18.5));
    // 41°C is also beyond the critical band
    assert!(has(&alerts, AlertCategory::ThresholdBreach, Severity::Extreme));
}

#[test]
fn test_humidity_drop_with_rise_escalates() {
    let evaluator = TrendEvaluator::default();
    let window = vec![climate(T0, 26.0, 55.0), climate(T0 + 30, 26.5, 54.0)];
    let current = climate(T0 + 60, 32.0, 36.0);

    let alerts = evaluator.evaluate(NODE, &current, &window);

    assert_eq!(count(&alerts, AlertCategory::FireRisk), 3);
    assert!(has(&alerts, AlertCategory::FireRisk, Severity::Medium));
    assert!(has(&alerts, AlertCategory::FireRisk, Severity::Extreme));
    assert!(has(&alerts, AlertCategory::RapidFluctuation, Severity::Medium));
}

#[test]
fn test_sustained_motion_is_low_anomaly() {
    let evaluator = TrendEvaluator::default();
    let window: Vec<_> = (0..10).map(|i| motion(T0 + i * 2, true)).collect();

    let alerts = evaluator.evaluate(NODE, &motion(T0 + 20, true), &window);
    assert!(has(&alerts, AlertCategory::MotionAnomaly, Severity::Low));
}

#[test]
fn test_overlay_runs_after_rules() {
    let evaluator = TrendEvaluator::default().with_overlay(Arc::new(TemperatureOnly));
    let window = temperature_series(&[20.0, 20.5], 30);

    let alerts = evaluator.evaluate(NODE, &temperature(T0 + 60, 24.0), &window);

    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].category, AlertCategory::RapidFluctuation);
    assert_eq!(alerts[1].category, AlertCategory::AnomalyOverlay);
    assert_eq!(alerts[1].value("z_score"), Some(3.5));
}

#[test]
fn test_silent_overlay_keeps_deterministic_alerts() {
    let with_overlay = TrendEvaluator::default().with_overlay(Arc::new(Silent));
    let without = TrendEvaluator::default();
    let window = temperature_series(&[22.0, 22.5], 20);
    let current = temperature(T0 + 40, 41.0);

    assert_eq!(
        with_overlay.evaluate(NODE, &current, &window),
        without.evaluate(NODE, &current, &window)
    );
}

#[test]
fn test_out_of_order_window() {
    let evaluator = TrendEvaluator::default();
    let mut window = temperature_series(&[20.0, 20.5], 30);
    window.reverse();

    let alerts = evaluator.evaluate(NODE, &temperature(T0 + 60, 24.0), &window);
    assert_eq!(count(&alerts, AlertCategory::RapidFluctuation), 1);
}
