//! Severity bands for overlay verdicts
//!
//! Both strategies map a raw score onto the shared [`Severity`] tiers:
//!
//! | Strategy     | Medium   | High     | Extreme  |
//! |--------------|----------|----------|----------|
//! | z-score      | \|z\| > 3 | \|z\| > 4 | \|z\| > 6 |
//! | confidence   | > 0.6    | > 0.75   | > 0.9    |
//!
//! Model confidences at or below 0.6 that still pass the model's own
//! decision threshold are reported as low.

use roomguard_core::Severity;

/// Z-score beyond which a value is anomalous (3-sigma rule)
pub const Z_ANOMALY: f64 = 3.0;
/// Z-score for a high severity anomaly
pub const Z_HIGH: f64 = 4.0;
/// Z-score for an extreme anomaly
pub const Z_EXTREME: f64 = 6.0;

/// Confidence for an extreme model verdict
pub const CONFIDENCE_EXTREME: f64 = 0.9;
/// Confidence for a high model verdict
pub const CONFIDENCE_HIGH: f64 = 0.75;
/// Confidence for a medium model verdict
pub const CONFIDENCE_MEDIUM: f64 = 0.6;

/// Severity of an absolute z-score, `None` within three sigma
pub fn severity_from_z(z: f64) -> Option<Severity> {
    let z = z.abs();
    if !z.is_finite() || z <= Z_ANOMALY {
        None
    } else if z > Z_EXTREME {
        Some(Severity::Extreme)
    } else if z > Z_HIGH {
        Some(Severity::High)
    } else {
        Some(Severity::Medium)
    }
}

/// Severity of a model confidence in [0, 1]
pub fn severity_from_confidence(confidence: f64) -> Severity {
    if confidence > CONFIDENCE_EXTREME {
        Severity::Extreme
    } else if confidence > CONFIDENCE_HIGH {
        Severity::High
    } else if confidence > CONFIDENCE_MEDIUM {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Logistic function
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn z_bands() {
        assert_eq!(severity_from_z(3.0), None);
        assert_eq!(severity_from_z(-3.5), Some(Severity::Medium));
        assert_eq!(severity_from_z(4.0), Some(Severity::Medium));
        assert_eq!(severity_from_z(4.5), Some(Severity::High));
        assert_eq!(severity_from_z(6.5), Some(Severity::Extreme));
        assert_eq!(severity_from_z(f64::NAN), None);
    }

    #[test]
    fn confidence_bands() {
        assert_eq!(severity_from_confidence(0.95), Severity::Extreme);
        assert_eq!(severity_from_confidence(0.8), Severity::High);
        assert_eq!(severity_from_confidence(0.7), Severity::Medium);
        assert_eq!(severity_from_confidence(0.6), Severity::Low);
    }

    #[test]
    fn sigmoid_midpoint() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(10.0) > 0.99);
    }
}
