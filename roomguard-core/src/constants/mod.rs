//! Constants for RoomGuard Core
//!
//! Centralized numeric defaults used by the normalizer, the fusion scorer and
//! the trend evaluator. Every configurable default in the typed config
//! structs starts from one of these values.
//!
//! ## Organization
//!
//! Constants are grouped by domain:
//! - **Sensors**: physically possible ranges per measured quantity
//! - **Thresholds**: comfort/warning/critical bands and fluctuation limits
//! - **Fusion**: incident scoring weights and evidence cut-offs
//! - **Time**: windows, retention and sampling intervals
//!
//! ## Usage Guidelines
//!
//! 1. Use these constants instead of magic numbers
//! 2. Include the unit in the name
//! 3. Keep related constants together

/// Physical measurement limits of the deployed sensor hardware.
pub mod sensors;

/// Alert bands and rule thresholds for the trend evaluator.
pub mod thresholds;

/// Incident fusion weights and evidence cut-offs.
pub mod fusion;

/// Windows, retention and sampling intervals.
pub mod time;

pub use sensors::{
    DISTANCE_SENSOR_MAX_CM, DISTANCE_SENSOR_MIN_CM, HUMIDITY_SENSOR_MAX_PCT,
    HUMIDITY_SENSOR_MIN_PCT, RSSI_MAX_DBM, RSSI_MIN_DBM, TEMP_SENSOR_MAX_C, TEMP_SENSOR_MIN_C,
};

pub use thresholds::{FIRE_RISK_TEMP_C, HUMIDITY_FLUCTUATION_PCT, TEMP_FLUCTUATION_C};

pub use fusion::{DEFAULT_DETECTION_THRESHOLD, NEAR_GROUND_CM};

pub use time::{
    DEFAULT_SAMPLE_INTERVAL_SECS, FLUCTUATION_WINDOW_SECS, RETENTION_MARGIN_SECS,
    SPIKE_WINDOW_SECS,
};
