//! Alert Thresholds
//!
//! Nested bands for continuous quantities. A value inside the normal band
//! raises nothing; outside normal it is a medium alert, at or beyond the
//! warning band a high alert, at or beyond the critical band an extreme one.
//!
//! The defaults describe an occupied indoor room.

// ===== TEMPERATURE (°C) =====

/// Lower bound of the comfortable indoor range.
pub const TEMP_NORMAL_MIN_C: f64 = 18.0;
/// Upper bound of the comfortable indoor range.
pub const TEMP_NORMAL_MAX_C: f64 = 26.0;
/// Warning when at or below.
pub const TEMP_WARNING_MIN_C: f64 = 15.0;
/// Warning when at or above.
pub const TEMP_WARNING_MAX_C: f64 = 30.0;
/// Critical when at or below.
pub const TEMP_CRITICAL_MIN_C: f64 = 10.0;
/// Critical when at or above.
pub const TEMP_CRITICAL_MAX_C: f64 = 35.0;

// ===== HUMIDITY (%rh) =====

/// Lower bound of the comfortable indoor range.
pub const HUMIDITY_NORMAL_MIN_PCT: f64 = 30.0;
/// Upper bound of the comfortable indoor range.
pub const HUMIDITY_NORMAL_MAX_PCT: f64 = 60.0;
/// Warning when at or below.
pub const HUMIDITY_WARNING_MIN_PCT: f64 = 20.0;
/// Warning when at or above.
pub const HUMIDITY_WARNING_MAX_PCT: f64 = 70.0;
/// Critical when at or below.
pub const HUMIDITY_CRITICAL_MIN_PCT: f64 = 10.0;
/// Critical when at or above.
pub const HUMIDITY_CRITICAL_MAX_PCT: f64 = 80.0;

// ===== RAPID FLUCTUATION =====

/// Temperature range within the fluctuation window that raises an alert.
///
/// A swing of more than 3°C in five minutes indoors usually means an open
/// window, a heater, or a failing sensor.
pub const TEMP_FLUCTUATION_C: f64 = 3.0;

/// Humidity range within the fluctuation window that raises an alert.
pub const HUMIDITY_FLUCTUATION_PCT: f64 = 10.0;

// ===== FIRE RISK =====

/// Absolute temperature treated as a fire indication.
pub const FIRE_RISK_TEMP_C: f64 = 40.0;

/// Temperature rise within the spike window that counts as a rapid rise.
pub const RAPID_RISE_C: f64 = 5.0;

/// Humidity drop within the spike window that counts as a sudden drop.
pub const HUMIDITY_DROP_PCT: f64 = 15.0;

/// Minimum temperature for a humidity drop to count towards fire risk.
pub const HUMIDITY_DROP_MIN_TEMP_C: f64 = 25.0;

// ===== MOTION PATTERN =====

/// Minimum readings in the window before motion patterns are judged.
pub const MOTION_PATTERN_MIN_WINDOW: usize = 5;

/// Number of most recent motion readings inspected.
pub const MOTION_PATTERN_SAMPLE: usize = 10;

/// Active readings among the sample that count as excessive motion.
pub const MOTION_PATTERN_ACTIVE: usize = 8;
