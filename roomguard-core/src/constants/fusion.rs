//! Incident Fusion Constants
//!
//! Parameters of the room-sensor fall verification scheme. Sub-scores are on a
//! 0-10 scale and combined with weights that sum to 1.0.

// ===== WEIGHTS (room-only profile) =====

/// Weight of the room verification sub-score.
pub const WEIGHT_ROOM: f64 = 0.5;

/// Weight of the motion-absence duration sub-score.
pub const WEIGHT_DURATION: f64 = 0.3;

/// Weight of the environmental change sub-score.
pub const WEIGHT_ENVIRONMENTAL: f64 = 0.2;

// ===== WEIGHTS (wearable profile) =====

/// Room weight when a wearable contributes.
pub const WEARABLE_PROFILE_ROOM: f64 = 0.4;
/// Duration weight when a wearable contributes.
pub const WEARABLE_PROFILE_DURATION: f64 = 0.2;
/// Environmental weight when a wearable contributes.
pub const WEARABLE_PROFILE_ENVIRONMENTAL: f64 = 0.1;
/// Wearable weight when a wearable contributes.
pub const WEARABLE_PROFILE_WEARABLE: f64 = 0.3;

// ===== SCORING =====

/// Combined severity at or above which an incident is detected.
pub const DEFAULT_DETECTION_THRESHOLD: f64 = 6.0;

/// Upper bound of every score.
pub const MAX_SCORE: f64 = 10.0;

/// Scale from average evidence hit (0-3) to the 0-10 range.
pub const ROOM_SCORE_SCALE: f64 = 3.33;

/// Evidence weight of a strong indicator (no motion, object near the ground).
pub const STRONG_EVIDENCE: f64 = 3.0;

/// Evidence weight of a weak indicator (object close but not on the ground).
pub const WEAK_EVIDENCE: f64 = 1.5;

/// Distance below which an object is considered on the ground (cm).
pub const NEAR_GROUND_CM: f64 = 50.0;

/// Distance below which an object is considered close (cm).
pub const CLOSE_CM: f64 = 100.0;

/// Temperature change that counts as environmental evidence (°C).
pub const ENV_TEMP_CHANGE_C: f64 = 2.0;

/// Humidity change that counts as environmental evidence (%rh).
pub const ENV_HUMIDITY_CHANGE_PCT: f64 = 5.0;

/// Score added for a significant temperature change.
pub const ENV_TEMP_POINTS: f64 = 3.0;

/// Score added for a significant humidity change.
pub const ENV_HUMIDITY_POINTS: f64 = 2.0;

// ===== DURATION BANDS =====

/// Motion absence (s) scoring the full 10 points.
pub const DURATION_LONG_SECS: i64 = 30;
/// Motion absence (s) scoring 7 points.
pub const DURATION_MEDIUM_SECS: i64 = 20;
/// Motion absence (s) scoring 4 points.
pub const DURATION_SHORT_SECS: i64 = 10;
