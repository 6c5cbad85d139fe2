//! Trend evaluator configuration

use serde::{Deserialize, Serialize};

use super::bands::{PhysicalRange, ThresholdBands};
use crate::alerts::Severity;
use crate::constants::thresholds::{
    FIRE_RISK_TEMP_C, HUMIDITY_DROP_MIN_TEMP_C, HUMIDITY_DROP_PCT, HUMIDITY_FLUCTUATION_PCT,
    MOTION_PATTERN_ACTIVE, MOTION_PATTERN_MIN_WINDOW, MOTION_PATTERN_SAMPLE, RAPID_RISE_C,
    TEMP_FLUCTUATION_C,
};
use crate::constants::time::{FLUCTUATION_WINDOW_SECS, SPIKE_WINDOW_SECS};
use crate::errors::{CoreError, CoreResult};
use crate::reading::Quantity;

/// Rapid fluctuation limit of one quantity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FluctuationRule {
    /// Range (max - min) that must be exceeded
    pub threshold: f64,
    pub severity: Severity,
}

/// Rules applied to one continuous quantity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantityRules {
    pub physical: PhysicalRange,
    pub bands: Option<ThresholdBands>,
    pub fluctuation: Option<FluctuationRule>,
}

impl QuantityRules {
    /// Only the sensor fault check
    pub const fn physical_only(physical: PhysicalRange) -> Self {
        Self {
            physical,
            bands: None,
            fluctuation: None,
        }
    }
}

/// Compound temperature/humidity rule limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FireRiskConfig {
    /// Absolute temperature (°C) indicating fire
    pub temperature_c: f64,
    /// Rise (°C) above the spike window maximum
    pub rapid_rise_c: f64,
    /// Drop (%rh) below the spike window maximum
    pub humidity_drop_pct: f64,
    /// Temperature (°C) above which a humidity drop counts
    pub humidity_drop_min_temp_c: f64,
}

impl Default for FireRiskConfig {
    fn default() -> Self {
        Self {
            temperature_c: FIRE_RISK_TEMP_C,
            rapid_rise_c: RAPID_RISE_C,
            humidity_drop_pct: HUMIDITY_DROP_PCT,
            humidity_drop_min_temp_c: HUMIDITY_DROP_MIN_TEMP_C,
        }
    }
}

/// Sustained motion rule limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionPatternConfig {
    /// Window readings required before judging
    pub min_window: usize,
    /// Most recent motion readings inspected
    pub sample: usize,
    /// Active readings among the sample that raise an alert
    pub active: usize,
}

impl Default for MotionPatternConfig {
    fn default() -> Self {
        Self {
            min_window: MOTION_PATTERN_MIN_WINDOW,
            sample: MOTION_PATTERN_SAMPLE,
            active: MOTION_PATTERN_ACTIVE,
        }
    }
}

/// Parameters of the trend evaluator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendConfig {
    pub temperature: QuantityRules,
    pub humidity: QuantityRules,
    pub distance: QuantityRules,
    pub signal_strength: QuantityRules,
    /// Look-back for rapid fluctuation (s)
    pub fluctuation_window_secs: i64,
    /// Look-back for rapid rise / humidity drop (s)
    pub spike_window_secs: i64,
    pub fire_risk: FireRiskConfig,
    pub motion: MotionPatternConfig,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            temperature: QuantityRules {
                physical: PhysicalRange::temperature(),
                bands: Some(ThresholdBands::temperature()),
                fluctuation: Some(FluctuationRule {
                    threshold: TEMP_FLUCTUATION_C,
                    severity: Severity::High,
                }),
            },
            humidity: QuantityRules {
                physical: PhysicalRange::humidity(),
                bands: Some(ThresholdBands::humidity()),
                fluctuation: Some(FluctuationRule {
                    threshold: HUMIDITY_FLUCTUATION_PCT,
                    severity: Severity::Medium,
                }),
            },
            distance: QuantityRules::physical_only(PhysicalRange::distance()),
            signal_strength: QuantityRules::physical_only(PhysicalRange::signal_strength()),
            fluctuation_window_secs: FLUCTUATION_WINDOW_SECS,
            spike_window_secs: SPIKE_WINDOW_SECS,
            fire_risk: FireRiskConfig::default(),
            motion: MotionPatternConfig::default(),
        }
    }
}

impl TrendConfig {
    /// Rules of a continuous quantity, `None` for motion
    pub fn rules(&self, quantity: Quantity) -> Option<&QuantityRules> {
        match quantity {
            Quantity::Temperature => Some(&self.temperature),
            Quantity::Humidity => Some(&self.humidity),
            Quantity::Distance => Some(&self.distance),
            Quantity::SignalStrength => Some(&self.signal_strength),
            Quantity::MotionPattern => None,
        }
    }

    pub fn with_temperature_fluctuation(mut self, threshold: f64) -> Self {
        if let Some(rule) = self.temperature.fluctuation.as_mut() {
            rule.threshold = threshold;
        }
        self
    }

    pub fn with_humidity_fluctuation(mut self, threshold: f64) -> Self {
        if let Some(rule) = self.humidity.fluctuation.as_mut() {
            rule.threshold = threshold;
        }
        self
    }

    pub fn with_fluctuation_window(mut self, secs: i64) -> Self {
        self.fluctuation_window_secs = secs;
        self
    }

    /// Longest look-back any rule needs (s)
    pub fn longest_window_secs(&self) -> i64 {
        self.fluctuation_window_secs.max(self.spike_window_secs)
    }

    pub fn validate(&self) -> CoreResult<()> {
        let named = [
            ("trend.temperature", &self.temperature),
            ("trend.humidity", &self.humidity),
            ("trend.distance", &self.distance),
            ("trend.signal_strength", &self.signal_strength),
        ];
        for (field, rules) in named {
            if !(rules.physical.min < rules.physical.max) {
                return Err(CoreError::invalid_config(field, "physical range is empty"));
            }
            if rules.bands.is_some_and(|bands| !bands.is_nested()) {
                return Err(CoreError::invalid_config(field, "bands must be nested"));
            }
            if rules
                .fluctuation
                .is_some_and(|rule| !(rule.threshold.is_finite() && rule.threshold > 0.0))
            {
                return Err(CoreError::invalid_config(
                    field,
                    "fluctuation threshold must be positive",
                ));
            }
        }
        if self.fluctuation_window_secs <= 0 || self.spike_window_secs <= 0 {
            return Err(CoreError::invalid_config(
                "trend.window",
                "windows must be positive",
            ));
        }
        if self.motion.active > self.motion.sample {
            return Err(CoreError::invalid_config(
                "trend.motion.active",
                "cannot exceed the sample size",
            ));
        }
        Ok(())
    }
}
