//! Integration tests for overlay construction and fallback
//!
//! Artifacts are written to temporary directories, the way a deployment
//! ships them next to the service.

use std::fs;
use std::path::Path;

use roomguard_core::{
    fields, AlertCategory, DraftSource, FeatureVector, Quantity, Reading, SensorKind, Severity,
    TrendEvaluator, WindowStats,
};
use roomguard_ml::{
    build_overlay, AnomalyOverlay, Model, ModelBackedOverlay, ModelError, ModelRegistry,
    ModelResult,
};
use tempfile::TempDir;

/// Model whose logit follows the current value: confident above 0
fn write_artifact(dir: &Path, name: &str, quantity: &str, bias: f64) {
    let text = format!(
        r#"{{"quantity": "{quantity}",
            "scaler": {{"mean": [0,0,0,0,0,0,0], "scale": [1,1,1,1,1,1,1]}},
            "weights": [1,0,0,0,0,0,0],
            "bias": {bias},
            "threshold": 0.7}}"#
    );
    fs::write(dir.join(name), text).unwrap();
}

fn features(quantity: Quantity, history: Vec<f64>, current: f64) -> FeatureVector {
    let samples: Vec<(i64, f64)> = history
        .iter()
        .enumerate()
        .map(|(i, v)| (i as i64 * 10, *v))
        .collect();
    FeatureVector {
        quantity,
        current,
        captured_at: 1_000,
        stats: WindowStats::from_samples(&samples),
        history,
        companion: None,
    }
}

struct Broken;

impl Model for Broken {
    fn predict(&self, _input: &[f64]) -> ModelResult<f64> {
        Err(ModelError::NonFinite)
    }

    fn threshold(&self) -> f64 {
        0.7
    }
}

#[test]
fn test_missing_directory_is_statistical() {
    let overlay = build_overlay(Some(Path::new("/nonexistent/roomguard/models")));
    assert_eq!(overlay.strategy(), "statistical");
    assert_eq!(build_overlay(None).strategy(), "statistical");
}

#[test]
fn test_directory_without_valid_models_is_statistical() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("broken.json"), "{not json").unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    assert_eq!(build_overlay(Some(dir.path())).strategy(), "statistical");
    assert!(matches!(
        ModelRegistry::load_dir(dir.path()),
        Err(ModelError::NoModels(_))
    ));
}

#[test]
fn test_valid_models_are_loaded_and_bad_ones_skipped() {
    let dir = TempDir::new().unwrap();
    write_artifact(dir.path(), "temperature.json", "temperature", 0.0);
    fs::write(dir.path().join("humidity.json"), r#"{"quantity": "humidity"}"#).unwrap();

    let registry = ModelRegistry::load_dir(dir.path()).unwrap();
    assert_eq!(registry.quantities(), vec![Quantity::Temperature]);

    assert_eq!(build_overlay(Some(dir.path())).strategy(), "model");
}

#[test]
fn test_model_confidence_bands() {
    let dir = TempDir::new().unwrap();
    write_artifact(dir.path(), "temperature.json", "temperature", 0.0);
    let overlay = build_overlay(Some(dir.path()));

    // sigmoid(3) ≈ 0.953
    let draft = overlay
        .try_score(Quantity::Temperature, &features(Quantity::Temperature, vec![], 3.0))
        .unwrap();
    assert_eq!(draft.severity, Severity::Extreme);
    assert!(matches!(draft.source, DraftSource::Model { .. }));

    // sigmoid(0.5) ≈ 0.62, below the decision threshold
    assert!(overlay
        .try_score(Quantity::Temperature, &features(Quantity::Temperature, vec![], 0.5))
        .is_none());
}

#[test]
fn test_quantity_without_model_falls_back() {
    let dir = TempDir::new().unwrap();
    write_artifact(dir.path(), "temperature.json", "temperature", 0.0);
    let overlay = build_overlay(Some(dir.path()));

    let f = features(Quantity::Humidity, vec![40.0; 10], 41.0);
    let draft = overlay.try_score(Quantity::Humidity, &f).unwrap();
    assert!(matches!(draft.source, DraftSource::Statistical { .. }));
    assert_eq!(draft.severity, Severity::Extreme);
}

#[test]
fn test_inference_failure_falls_back() {
    let mut registry = ModelRegistry::new();
    registry.insert(Quantity::Temperature, Box::new(Broken));
    let overlay = ModelBackedOverlay::new(registry);

    let f = features(Quantity::Temperature, vec![21.0; 8], 21.5);
    let draft = overlay.try_score(Quantity::Temperature, &f).unwrap();
    assert!(matches!(draft.source, DraftSource::Statistical { .. }));

    let quiet = features(Quantity::Temperature, vec![21.0; 3], 30.0);
    assert!(overlay.try_score(Quantity::Temperature, &quiet).is_none());
}

#[test]
fn test_statistical_overlay_in_trend_evaluator() {
    let evaluator = TrendEvaluator::default().with_overlay(build_overlay(None));
    let window: Vec<Reading> = (0..10)
        .map(|i| {
            Reading::new("NODE_01", SensorKind::Distance, 1_000 + i * 2)
                .with_value(fields::DISTANCE_CM, 200.0 + (i % 2) as f64)
        })
        .collect();
    let current =
        Reading::new("NODE_01", SensorKind::Distance, 1_020).with_value(fields::DISTANCE_CM, 40.0);

    let alerts = evaluator.evaluate("NODE_01", &current, &window);

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].category, AlertCategory::AnomalyOverlay);
    assert_eq!(alerts[0].severity, Severity::Extreme);
}
