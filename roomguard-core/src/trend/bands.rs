//! Threshold bands and physical ranges
//!
//! Bands are nested: normal ⊂ warning ⊂ critical. A value is classified by
//! the outermost band it reaches, so a misconfigured overlap still resolves
//! to the most severe tier.

use serde::{Deserialize, Serialize};

use crate::alerts::Severity;
use crate::constants::sensors::{
    DISTANCE_SENSOR_MAX_CM, DISTANCE_SENSOR_MIN_CM, HUMIDITY_SENSOR_MAX_PCT,
    HUMIDITY_SENSOR_MIN_PCT, RSSI_MAX_DBM, RSSI_MIN_DBM, TEMP_SENSOR_MAX_C, TEMP_SENSOR_MIN_C,
};
use crate::constants::thresholds::*;

/// Values a working sensor can physically report (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalRange {
    pub min: f64,
    pub max: f64,
}

impl PhysicalRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub const fn temperature() -> Self {
        Self::new(TEMP_SENSOR_MIN_C, TEMP_SENSOR_MAX_C)
    }

    pub const fn humidity() -> Self {
        Self::new(HUMIDITY_SENSOR_MIN_PCT, HUMIDITY_SENSOR_MAX_PCT)
    }

    pub const fn distance() -> Self {
        Self::new(DISTANCE_SENSOR_MIN_CM, DISTANCE_SENSOR_MAX_CM)
    }

    pub const fn signal_strength() -> Self {
        Self::new(RSSI_MIN_DBM, RSSI_MAX_DBM)
    }

    /// NaN and infinities are never plausible
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

/// Normal / warning / critical limits of one quantity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBands {
    pub normal_min: f64,
    pub normal_max: f64,
    pub warning_min: f64,
    pub warning_max: f64,
    pub critical_min: f64,
    pub critical_max: f64,
}

impl ThresholdBands {
    pub const fn temperature() -> Self {
        Self {
            normal_min: TEMP_NORMAL_MIN_C,
            normal_max: TEMP_NORMAL_MAX_C,
            warning_min: TEMP_WARNING_MIN_C,
            warning_max: TEMP_WARNING_MAX_C,
            critical_min: TEMP_CRITICAL_MIN_C,
            critical_max: TEMP_CRITICAL_MAX_C,
        }
    }

    pub const fn humidity() -> Self {
        Self {
            normal_min: HUMIDITY_NORMAL_MIN_PCT,
            normal_max: HUMIDITY_NORMAL_MAX_PCT,
            warning_min: HUMIDITY_WARNING_MIN_PCT,
            warning_max: HUMIDITY_WARNING_MAX_PCT,
            critical_min: HUMIDITY_CRITICAL_MIN_PCT,
            critical_max: HUMIDITY_CRITICAL_MAX_PCT,
        }
    }

    /// Severity of a value, `None` inside the normal band
    pub fn classify(&self, value: f64) -> Option<Severity> {
        if value <= self.critical_min || value >= self.critical_max {
            Some(Severity::Extreme)
        } else if value <= self.warning_min || value >= self.warning_max {
            Some(Severity::High)
        } else if value < self.normal_min || value > self.normal_max {
            Some(Severity::Medium)
        } else {
            None
        }
    }

    /// Bands must be ordered and nested
    pub fn is_nested(&self) -> bool {
        self.critical_min <= self.warning_min
            && self.warning_min <= self.normal_min
            && self.normal_min <= self.normal_max
            && self.normal_max <= self.warning_max
            && self.warning_max <= self.critical_max
    }

    /// Limit a classified value crossed, for messages
    pub fn crossed_limit(&self, value: f64, severity: Severity) -> f64 {
        let low = value < self.normal_min;
        match (severity, low) {
            (Severity::Extreme, true) => self.critical_min,
            (Severity::Extreme, false) => self.critical_max,
            (Severity::High, true) => self.warning_min,
            (Severity::High, false) => self.warning_max,
            (_, true) => self.normal_min,
            (_, false) => self.normal_max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_tiers() {
        let bands = ThresholdBands::temperature();

        assert_eq!(bands.classify(22.0), None);
        assert_eq!(bands.classify(26.0), None);
        assert_eq!(bands.classify(27.0), Some(Severity::Medium));
        assert_eq!(bands.classify(30.0), Some(Severity::High));
        assert_eq!(bands.classify(35.0), Some(Severity::Extreme));
        assert_eq!(bands.classify(16.0), Some(Severity::Medium));
        assert_eq!(bands.classify(12.0), Some(Severity::High));
        assert_eq!(bands.classify(10.0), Some(Severity::Extreme));
    }

    #[test]
    fn overlapping_bands_resolve_to_critical() {
        let bands = ThresholdBands {
            critical_max: 25.0,
            ..ThresholdBands::temperature()
        };
        assert!(!bands.is_nested());
        assert_eq!(bands.classify(25.5), Some(Severity::Extreme));
    }

    #[test]
    fn physical_range_rejects_non_finite() {
        let range = PhysicalRange::humidity();
        assert!(range.contains(0.0));
        assert!(range.contains(100.0));
        assert!(!range.contains(100.5));
        assert!(!range.contains(f64::NAN));
    }

    #[test]
    fn defaults_are_nested() {
        assert!(ThresholdBands::temperature().is_nested());
        assert!(ThresholdBands::humidity().is_nested());
    }
}
