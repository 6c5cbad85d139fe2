//! Incident Fusion Scorer
//!
//! ## Overview
//!
//! No single room sensor can tell a fall from someone sitting still. The
//! scorer combines three independent, weak signals into one severity on a
//! 0-10 scale:
//!
//! ```text
//! PIR (no motion) ────────┐
//! Ultrasonic (distance) ──┼─→ room verification ─┐
//!                         │                      │
//! PIR run length ─────────┴─→ duration ──────────┼─→ weighted severity ─→ detected?
//!                                                │
//! DHT22 (temp/humidity) ─────→ environmental ────┘
//! ```
//!
//! ## Sub-scores
//!
//! ### Room verification
//!
//! Every motion flag and every distance value is one evaluated factor. A
//! factor scores 3.0 of evidence when it points at a person on the ground
//! (no motion, object nearer than 50cm) and 1.5 for an object nearer than
//! 100cm. The average evidence is scaled to 0-10.
//!
//! ### Duration
//!
//! Length of the continuous run of "no motion" readings ending at the newest
//! motion reading, measured from capture times plus one sampling increment:
//!
//! | Absence  | Score |
//! |----------|-------|
//! | ≥ 30s    | 10    |
//! | ≥ 20s    | 7     |
//! | ≥ 10s    | 4     |
//! | < 10s    | 2     |
//!
//! ### Environmental
//!
//! A door opening or a person lying on the floor near a sensor shifts
//! temperature and humidity. The newest and oldest temperature/humidity
//! readings of the window are compared.
//!
//! ## Determinism
//!
//! Scoring is a pure function of the window. Readings are re-sorted by capture
//! time first, so out-of-order arrival does not change the result.

pub mod config;

pub use config::{FusionConfig, FusionWeights};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::alerts::Severity;
use crate::constants::fusion::{
    DURATION_LONG_SECS, DURATION_MEDIUM_SECS, DURATION_SHORT_SECS, ENV_HUMIDITY_POINTS,
    ENV_TEMP_POINTS, MAX_SCORE, ROOM_SCORE_SCALE, STRONG_EVIDENCE, WEAK_EVIDENCE,
};
use crate::features;
use crate::normalize::UNKNOWN_DEVICE;
use crate::reading::{chronological, fields, Quantity, Reading, SensorKind};
use crate::traits::AnomalyOverlay;

/// Fused judgment for one candidate incident
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentScore {
    /// Room verification sub-score (0-10)
    pub room_score: f64,
    /// Motion absence duration sub-score (0-10)
    pub duration_score: f64,
    /// Environmental change sub-score (0-10)
    pub environmental_score: f64,
    /// Wearable sub-score (0-10), only with the wearable profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wearable_score: Option<f64>,
    /// Weighted severity (0-10), two decimals
    pub severity: f64,
    /// Severity reached the detection threshold
    pub detected: bool,
    /// Both no-motion and near-ground evidence present
    pub corroborated: bool,
    /// Inferred location label
    pub location: String,
    /// Severity reported by the anomaly overlay, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay_severity: Option<Severity>,
}

/// Combines room sensor evidence into incident scores
pub struct FusionScorer {
    config: FusionConfig,
    overlay: Option<Arc<dyn AnomalyOverlay>>,
}

impl Default for FusionScorer {
    fn default() -> Self {
        Self::new(FusionConfig::default())
    }
}

impl FusionScorer {
    pub fn new(config: FusionConfig) -> Self {
        Self {
            config,
            overlay: None,
        }
    }

    /// Consult `overlay` for motion pattern anomalies
    pub fn with_overlay(mut self, overlay: Arc<dyn AnomalyOverlay>) -> Self {
        self.overlay = Some(overlay);
        self
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Score the recent window
    ///
    /// An empty window scores zero everywhere and is never detected.
    pub fn score_incident(&self, readings: &[Reading]) -> IncidentScore {
        let ordered = chronological(readings);

        let room_score = self.room_score(&ordered);
        let duration_score = self.duration_score(&ordered);
        let environmental_score = self.environmental_score(&ordered);
        let wearable_score = self
            .config
            .weights
            .uses_wearable()
            .then(|| wearable_score(&ordered));

        let weights = &self.config.weights;
        let raw = weights.room * room_score
            + weights.duration * duration_score
            + weights.environmental * environmental_score
            + weights.wearable * wearable_score.unwrap_or(0.0);

        IncidentScore {
            room_score,
            duration_score,
            environmental_score,
            wearable_score,
            severity: round2(raw),
            detected: !ordered.is_empty() && raw >= self.config.detection_threshold,
            corroborated: self.corroborated(&ordered),
            location: location(&ordered),
            overlay_severity: self.overlay_severity(&ordered),
        }
    }

    fn room_score(&self, ordered: &[&Reading]) -> f64 {
        let mut evidence = 0.0;
        let mut factors = 0u32;

        for reading in ordered {
            if let Some(motion) = reading.motion_detected() {
                factors += 1;
                if !motion {
                    evidence += STRONG_EVIDENCE;
                }
            }
            if let Some(distance) = reading.distance_cm() {
                factors += 1;
                if distance < self.config.near_ground_cm {
                    evidence += STRONG_EVIDENCE;
                } else if distance < self.config.close_cm {
                    evidence += WEAK_EVIDENCE;
                }
            }
        }

        if factors == 0 {
            return 0.0;
        }
        (evidence / f64::from(factors) * ROOM_SCORE_SCALE).min(MAX_SCORE)
    }

    fn duration_score(&self, ordered: &[&Reading]) -> f64 {
        if ordered.is_empty() {
            return 0.0;
        }

        let absent_secs = absence_run(ordered)
            .map(|(oldest, newest)| {
                newest
                    .saturating_sub(oldest)
                    .saturating_add(self.config.sample_interval_secs)
            })
            .unwrap_or(0);

        if absent_secs >= DURATION_LONG_SECS {
            10.0
        } else if absent_secs >= DURATION_MEDIUM_SECS {
            7.0
        } else if absent_secs >= DURATION_SHORT_SECS {
            4.0
        } else {
            2.0
        }
    }

    fn environmental_score(&self, ordered: &[&Reading]) -> f64 {
        let climate: Vec<&Reading> = ordered
            .iter()
            .copied()
            .filter(|r| r.temperature_c().is_some() || r.humidity_percent().is_some())
            .collect();

        let (Some(oldest), Some(newest)) = (climate.first(), climate.last()) else {
            return 0.0;
        };
        if climate.len() < 2 {
            return 0.0;
        }

        let change = |read: fn(&Reading) -> Option<f64>| match (read(newest), read(oldest)) {
            (Some(new), Some(old)) => (new - old).abs(),
            _ => 0.0,
        };

        let mut score = 0.0;
        if change(Reading::temperature_c) > self.config.temp_change_c {
            score += ENV_TEMP_POINTS;
        }
        if change(Reading::humidity_percent) > self.config.humidity_change_pct {
            score += ENV_HUMIDITY_POINTS;
        }
        score.min(MAX_SCORE)
    }

    fn corroborated(&self, ordered: &[&Reading]) -> bool {
        let no_motion = ordered.iter().any(|r| r.motion_detected() == Some(false));
        let near_ground = ordered
            .iter()
            .any(|r| r.distance_cm().is_some_and(|d| d < self.config.near_ground_cm));
        no_motion && near_ground
    }

    fn overlay_severity(&self, ordered: &[&Reading]) -> Option<Severity> {
        let overlay = self.overlay.as_ref()?;

        let motion: Vec<Reading> = ordered
            .iter()
            .filter(|r| r.motion_detected().is_some())
            .map(|r| (*r).clone())
            .collect();
        let (newest, history) = motion.split_last()?;

        let features = features::extract(Quantity::MotionPattern, newest, history)?;
        overlay
            .try_score(Quantity::MotionPattern, &features)
            .map(|draft| draft.severity)
    }
}

/// Capture times (oldest, newest) of the no-motion run ending at the newest
/// motion reading
fn absence_run(ordered: &[&Reading]) -> Option<(i64, i64)> {
    let mut run = ordered
        .iter()
        .rev()
        .filter_map(|r| r.motion_detected().map(|motion| (r.captured_at, motion)))
        .take_while(|(_, motion)| !motion)
        .map(|(at, _)| at);

    let newest = run.next()?;
    let oldest = run.last().unwrap_or(newest);
    Some((oldest, newest))
}

/// Highest severity any wearable reported in the window
fn wearable_score(ordered: &[&Reading]) -> f64 {
    ordered
        .iter()
        .filter(|r| r.kind == SensorKind::Wearable)
        .filter_map(|r| r.number(fields::SEVERITY))
        .fold(0.0, f64::max)
        .clamp(0.0, MAX_SCORE)
}

fn location(ordered: &[&Reading]) -> String {
    match ordered.last() {
        Some(newest) => newest
            .location
            .clone()
            .unwrap_or_else(|| newest.device_id.clone()),
        None => UNKNOWN_DEVICE.to_string(),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
