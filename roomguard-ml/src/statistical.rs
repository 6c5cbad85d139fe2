//! Z-score anomaly strategy
//!
//! The fallback every deployment has: compares the current value against the
//! trailing window of the same quantity. Needs no artifacts and never fails.

use roomguard_core::{AlertDraft, AnomalyOverlay, DraftSource, FeatureVector, Quantity};

use crate::scoring::severity_from_z;

/// Trailing values considered
pub const DEFAULT_HISTORY: usize = 20;

/// Minimum trailing values before scoring
pub const DEFAULT_MIN_SAMPLES: usize = 5;

/// Floor on the standard deviation, so a flat window does not turn sensor
/// noise into extreme z-scores
pub const MIN_STD_DEV: f64 = 0.1;

/// Z-score strategy over the trailing window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticalScorer {
    history: usize,
    min_samples: usize,
    min_std_dev: f64,
}

impl Default for StatisticalScorer {
    fn default() -> Self {
        Self {
            history: DEFAULT_HISTORY,
            min_samples: DEFAULT_MIN_SAMPLES,
            min_std_dev: MIN_STD_DEV,
        }
    }
}

impl StatisticalScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute z-score of the current value, if enough history exists
    pub fn z_score(&self, features: &FeatureVector) -> Option<f64> {
        let trailing = features.trailing(self.history);
        if trailing.len() < self.min_samples {
            return None;
        }

        let n = trailing.len() as f64;
        let mean = trailing.iter().sum::<f64>() / n;
        let variance = trailing.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt().max(self.min_std_dev);

        Some(((features.current - mean) / std_dev).abs())
    }

    /// Whether a statistical fallback exists for the quantity
    pub fn supports(quantity: Quantity) -> bool {
        quantity.is_continuous()
    }
}

impl AnomalyOverlay for StatisticalScorer {
    fn try_score(&self, quantity: Quantity, features: &FeatureVector) -> Option<AlertDraft> {
        if !Self::supports(quantity) {
            return None;
        }
        let z = self.z_score(features)?;
        let severity = severity_from_z(z)?;

        Some(
            AlertDraft::new(
                quantity,
                severity,
                format!(
                    "statistical {} anomaly: {:.1}{} (z-score {z:.2})",
                    quantity.name(),
                    features.current,
                    quantity.unit()
                ),
                DraftSource::Statistical { z_score: z },
            )
            .with_value(quantity.field(), features.current)
            .with_value("mean", features.stats.mean)
            .with_value("std_dev", features.stats.std_dev),
        )
    }

    fn strategy(&self) -> &'static str {
        "statistical"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomguard_core::{Severity, WindowStats};

    fn features(quantity: Quantity, history: Vec<f64>, current: f64) -> FeatureVector {
        let samples: Vec<(i64, f64)> = history.iter().enumerate().map(|(i, v)| (i as i64, *v)).collect();
        FeatureVector {
            quantity,
            current,
            captured_at: history.len() as i64,
            stats: WindowStats::from_samples(&samples),
            history,
            companion: None,
        }
    }

    #[test]
    fn needs_five_samples() {
        let scorer = StatisticalScorer::new();
        let f = features(Quantity::Temperature, vec![20.0; 4], 40.0);
        assert!(scorer.try_score(Quantity::Temperature, &f).is_none());
    }

    #[test]
    fn flat_window_uses_floor() {
        let scorer = StatisticalScorer::new();
        let f = features(Quantity::Temperature, vec![20.0; 10], 20.35);

        let z = scorer.z_score(&f).unwrap();
        assert!((z - 3.5).abs() < 1e-9);

        let draft = scorer.try_score(Quantity::Temperature, &f).unwrap();
        assert_eq!(draft.severity, Severity::Medium);
    }

    #[test]
    fn large_deviation_is_extreme() {
        let scorer = StatisticalScorer::new();
        let f = features(Quantity::Humidity, vec![40.0, 41.0, 40.0, 41.0, 40.0, 41.0], 60.0);
        let draft = scorer.try_score(Quantity::Humidity, &f).unwrap();
        assert_eq!(draft.severity, Severity::Extreme);
    }

    #[test]
    fn only_last_twenty_values_count() {
        let scorer = StatisticalScorer::new();
        let mut history = vec![100.0; 30];
        history.extend(vec![20.0; 20]);
        let f = features(Quantity::Temperature, history, 20.0);
        assert_eq!(scorer.z_score(&f), Some(0.0));
    }

    #[test]
    fn motion_has_no_fallback() {
        let scorer = StatisticalScorer::new();
        let f = features(Quantity::MotionPattern, vec![0.0; 10], 1.0);
        assert!(scorer.try_score(Quantity::MotionPattern, &f).is_none());
    }
}
