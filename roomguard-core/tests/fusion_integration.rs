//! Integration tests for incident fusion
//!
//! Covers the canonical room-only scheme end to end:
//! - Fall scenarios reaching detection
//! - Empty and active windows staying below threshold
//! - Determinism on repeated and reordered windows
//! - Overlay and wearable supplements

mod common;

use std::sync::Arc;

use roomguard_core::{
    AlertDraft, AnomalyOverlay, DraftSource, FeatureVector, FusionConfig, FusionScorer, Quantity,
    Reading, SensorKind, Severity, fields,
};

use common::{active_room, fall_scenario, motion, T0};

struct FlagEverything;

impl AnomalyOverlay for FlagEverything {
    fn try_score(&self, quantity: Quantity, _features: &FeatureVector) -> Option<AlertDraft> {
        Some(AlertDraft::new(
            quantity,
            Severity::High,
            "flagged",
            DraftSource::Model { confidence: 0.8 },
        ))
    }

    fn strategy(&self) -> &'static str {
        "test"
    }
}

#[test]
fn test_prolonged_absence_near_ground_is_detected() {
    let scorer = FusionScorer::default();
    let score = scorer.score_incident(&fall_scenario(30));

    assert!(score.detected);
    assert!(score.severity >= 6.0);
    assert!(score.corroborated);
    assert_eq!(score.duration_score, 10.0);
    assert_eq!(score.location, "Living_Room");
}

#[test]
fn test_empty_window_scores_zero() {
    let score = FusionScorer::default().score_incident(&[]);

    assert_eq!(score.severity, 0.0);
    assert!(!score.detected);
    assert!(!score.corroborated);
    assert_eq!(score.room_score, 0.0);
    assert_eq!(score.duration_score, 0.0);
    assert_eq!(score.environmental_score, 0.0);
    assert_eq!(score.location, "unknown");
}

#[test]
fn test_active_room_not_detected() {
    let score = FusionScorer::default().score_incident(&active_room(60));

    assert!(!score.detected);
    assert_eq!(score.room_score, 0.0);
    assert_eq!(score.duration_score, 2.0);
}

#[test]
fn test_scoring_is_idempotent() {
    let scorer = FusionScorer::default();
    let window = fall_scenario(24);

    let first = scorer.score_incident(&window);
    let second = scorer.score_incident(&window);
    assert_eq!(first, second);

    let mut reversed = window.clone();
    reversed.reverse();
    assert_eq!(scorer.score_incident(&reversed).severity, first.severity);
}

#[test]
fn test_short_absence_below_threshold() {
    let scorer = FusionScorer::default();
    let mut window = vec![motion(T0 - 2, true)];
    window.extend(fall_scenario(4));

    let score = scorer.score_incident(&window);
    assert_eq!(score.duration_score, 2.0);
    // room evidence alone cannot reach the threshold
    assert!(!score.detected);
}

#[test]
fn test_threshold_is_configurable() {
    let scorer = FusionScorer::new(FusionConfig::default().with_detection_threshold(0.5));
    assert!(scorer.score_incident(&active_room(10)).detected);
}

#[test]
fn test_overlay_severity_recorded_without_changing_formula() {
    let plain = FusionScorer::default();
    let overlaid = FusionScorer::default().with_overlay(Arc::new(FlagEverything));
    let window = fall_scenario(30);

    let with_overlay = overlaid.score_incident(&window);
    assert_eq!(with_overlay.overlay_severity, Some(Severity::High));
    assert_eq!(with_overlay.severity, plain.score_incident(&window).severity);
}

#[test]
fn test_wearable_profile() {
    let scorer = FusionScorer::new(FusionConfig::wearable());
    let mut window = fall_scenario(30);
    window.push(
        Reading::new("MICROBIT_01", SensorKind::Wearable, T0 + 10).with_value(fields::SEVERITY, 8.0),
    );

    let score = scorer.score_incident(&window);
    assert_eq!(score.wearable_score, Some(8.0));
    assert!(score.detected);
}
