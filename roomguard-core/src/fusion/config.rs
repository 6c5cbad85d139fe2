//! Fusion scorer configuration

use serde::{Deserialize, Serialize};

use crate::constants::fusion::{
    CLOSE_CM, DEFAULT_DETECTION_THRESHOLD, ENV_HUMIDITY_CHANGE_PCT, ENV_TEMP_CHANGE_C, MAX_SCORE,
    NEAR_GROUND_CM, WEARABLE_PROFILE_DURATION, WEARABLE_PROFILE_ENVIRONMENTAL,
    WEARABLE_PROFILE_ROOM, WEARABLE_PROFILE_WEARABLE, WEIGHT_DURATION, WEIGHT_ENVIRONMENTAL,
    WEIGHT_ROOM,
};
use crate::constants::time::DEFAULT_SAMPLE_INTERVAL_SECS;
use crate::errors::{CoreError, CoreResult};

/// Allowed deviation of the weight sum from 1.0
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Weights of the sub-scores in the combined severity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub room: f64,
    pub duration: f64,
    pub environmental: f64,
    /// Zero unless a wearable contributes
    #[serde(default)]
    pub wearable: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self::room_only()
    }
}

impl FusionWeights {
    /// Room sensors only; the canonical deployment
    pub const fn room_only() -> Self {
        Self {
            room: WEIGHT_ROOM,
            duration: WEIGHT_DURATION,
            environmental: WEIGHT_ENVIRONMENTAL,
            wearable: 0.0,
        }
    }

    /// Room sensors plus a wearable fall detector
    pub const fn with_wearable() -> Self {
        Self {
            room: WEARABLE_PROFILE_ROOM,
            duration: WEARABLE_PROFILE_DURATION,
            environmental: WEARABLE_PROFILE_ENVIRONMENTAL,
            wearable: WEARABLE_PROFILE_WEARABLE,
        }
    }

    /// Whether the wearable sub-score takes part
    pub fn uses_wearable(&self) -> bool {
        self.wearable > 0.0
    }

    pub fn sum(&self) -> f64 {
        self.room + self.duration + self.environmental + self.wearable
    }

    /// Weights must be finite, non-negative and sum to 1.0
    pub fn validate(&self) -> CoreResult<()> {
        let all = [
            ("fusion.weights.room", self.room),
            ("fusion.weights.duration", self.duration),
            ("fusion.weights.environmental", self.environmental),
            ("fusion.weights.wearable", self.wearable),
        ];
        for (field, weight) in all {
            if !weight.is_finite() || weight < 0.0 {
                return Err(CoreError::invalid_config(field, "must be a non-negative number"));
            }
        }
        if (self.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(CoreError::invalid_config(
                "fusion.weights",
                format!("must sum to 1.0, got {:.3}", self.sum()),
            ));
        }
        Ok(())
    }
}

/// Parameters of the incident fusion scorer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    pub weights: FusionWeights,
    /// Combined severity at or above which an incident is detected
    pub detection_threshold: f64,
    /// Distance (cm) below which an object is on the ground
    pub near_ground_cm: f64,
    /// Distance (cm) below which an object is close
    pub close_cm: f64,
    /// Time one reading covers (s)
    pub sample_interval_secs: i64,
    /// Temperature change counted as environmental evidence (°C)
    pub temp_change_c: f64,
    /// Humidity change counted as environmental evidence (%rh)
    pub humidity_change_pct: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            weights: FusionWeights::default(),
            detection_threshold: DEFAULT_DETECTION_THRESHOLD,
            near_ground_cm: NEAR_GROUND_CM,
            close_cm: CLOSE_CM,
            sample_interval_secs: DEFAULT_SAMPLE_INTERVAL_SECS,
            temp_change_c: ENV_TEMP_CHANGE_C,
            humidity_change_pct: ENV_HUMIDITY_CHANGE_PCT,
        }
    }
}

impl FusionConfig {
    /// Wearable-assisted profile
    pub fn wearable() -> Self {
        Self {
            weights: FusionWeights::with_wearable(),
            ..Self::default()
        }
    }

    pub fn with_weights(mut self, weights: FusionWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_detection_threshold(mut self, threshold: f64) -> Self {
        self.detection_threshold = threshold;
        self
    }

    pub fn with_sample_interval(mut self, secs: i64) -> Self {
        self.sample_interval_secs = secs;
        self
    }

    pub fn validate(&self) -> CoreResult<()> {
        self.weights.validate()?;

        if !(0.0..=MAX_SCORE).contains(&self.detection_threshold) {
            return Err(CoreError::invalid_config(
                "detection_threshold",
                "must be within [0, 10]",
            ));
        }
        if !(self.near_ground_cm > 0.0 && self.near_ground_cm < self.close_cm) {
            return Err(CoreError::invalid_config(
                "near_ground_cm",
                "must be positive and below close_cm",
            ));
        }
        if self.sample_interval_secs < 0 {
            return Err(CoreError::invalid_config(
                "sample_interval_secs",
                "must not be negative",
            ));
        }
        if !(self.temp_change_c >= 0.0 && self.humidity_change_pct >= 0.0) {
            return Err(CoreError::invalid_config(
                "environmental change",
                "thresholds must not be negative",
            ));
        }
        Ok(())
    }
}
