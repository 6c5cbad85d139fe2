//! Feature extraction for anomaly scoring
//!
//! Turns a reading plus its recent window into a fixed-shape feature vector
//! for one quantity. Both overlay strategies consume the same vector: the
//! statistical scorer uses the raw history, learned models use
//! [`FeatureVector::as_model_input`].

use serde::{Deserialize, Serialize};

use crate::reading::{chronological, Quantity, Reading};
use crate::time::Timestamp;

/// Number of values produced by [`FeatureVector::as_model_input`]
pub const MODEL_INPUT_LEN: usize = 7;

/// Summary statistics of a quantity over a window
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindowStats {
    /// Mean value
    pub mean: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Change per second between the first and last sample
    pub rate_of_change: f64,
    /// Number of samples
    pub count: usize,
    /// Median value
    pub median: f64,
}

impl WindowStats {
    /// Compute statistics over `(capture time, value)` samples in time order
    pub fn from_samples(samples: &[(Timestamp, f64)]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let values: Vec<f64> = samples.iter().map(|(_, v)| *v).collect();
        let count = values.len();

        let mean = values.iter().sum::<f64>() / count as f64;
        let min = values.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));

        let variance = values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / count as f64;
        let std_dev = variance.sqrt();

        let mut sorted = values.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let median = if count % 2 == 0 {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        } else {
            sorted[count / 2]
        };

        let rate_of_change = match (samples.first(), samples.last()) {
            (Some((first_at, first)), Some((last_at, last))) if last_at > first_at => {
                (last - first) / last_at.saturating_sub(*first_at) as f64
            }
            _ => 0.0,
        };

        Self {
            mean,
            min,
            max,
            std_dev,
            rate_of_change,
            count,
            median,
        }
    }

    /// max - min
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Features of one quantity at one reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Quantity described
    pub quantity: Quantity,
    /// Value of the current reading
    pub current: f64,
    /// Capture time of the current reading
    pub captured_at: Timestamp,
    /// Window values in time order, current reading excluded
    pub history: Vec<f64>,
    /// Related quantity from the same reading (humidity for temperature and
    /// the other way round)
    pub companion: Option<f64>,
    /// Statistics over `history`
    pub stats: WindowStats,
}

impl FeatureVector {
    /// Most recent `n` history values
    pub fn trailing(&self, n: usize) -> &[f64] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    /// Flat input row for learned models
    ///
    /// `[current, mean, std_dev, min, max, rate_of_change, companion]`, with
    /// a missing companion encoded as 0.
    pub fn as_model_input(&self) -> [f64; MODEL_INPUT_LEN] {
        [
            self.current,
            self.stats.mean,
            self.stats.std_dev,
            self.stats.min,
            self.stats.max,
            self.stats.rate_of_change,
            self.companion.unwrap_or(0.0),
        ]
    }
}

fn companion_of(quantity: Quantity) -> Option<Quantity> {
    match quantity {
        Quantity::Temperature => Some(Quantity::Humidity),
        Quantity::Humidity => Some(Quantity::Temperature),
        _ => None,
    }
}

/// Extract features for `quantity` from `reading` and its window
///
/// Returns `None` when the reading does not carry a finite value for the
/// quantity. Window readings without the quantity are skipped.
pub fn extract(quantity: Quantity, reading: &Reading, window: &[Reading]) -> Option<FeatureVector> {
    let current = reading.quantity(quantity)?;

    let samples: Vec<(Timestamp, f64)> = chronological(window)
        .into_iter()
        .filter_map(|r| r.quantity(quantity).map(|value| (r.captured_at, value)))
        .collect();

    Some(FeatureVector {
        quantity,
        current,
        captured_at: reading.captured_at,
        history: samples.iter().map(|(_, v)| *v).collect(),
        companion: companion_of(quantity).and_then(|other| reading.quantity(other)),
        stats: WindowStats::from_samples(&samples),
    })
}
