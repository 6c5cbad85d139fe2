//! Sensor Measurement Limits
//!
//! Values outside these ranges cannot be produced by a working sensor and are
//! reported as sensor faults rather than threshold breaches.

// ===== DHT22 TEMPERATURE/HUMIDITY =====

/// Minimum measurable temperature for the DHT22.
///
/// Source: DHT22/AM2302 datasheet operating range
pub const TEMP_SENSOR_MIN_C: f64 = -40.0;

/// Maximum measurable temperature for the DHT22.
///
/// Source: DHT22/AM2302 datasheet operating range
pub const TEMP_SENSOR_MAX_C: f64 = 80.0;

/// Minimum relative humidity.
pub const HUMIDITY_SENSOR_MIN_PCT: f64 = 0.0;

/// Maximum relative humidity.
pub const HUMIDITY_SENSOR_MAX_PCT: f64 = 100.0;

// ===== HC-SR04 ULTRASONIC =====

/// Minimum distance report (cm).
pub const DISTANCE_SENSOR_MIN_CM: f64 = 0.0;

/// Maximum ranging distance (cm).
///
/// Source: HC-SR04 datasheet, 2cm - 400cm
pub const DISTANCE_SENSOR_MAX_CM: f64 = 400.0;

// ===== WI-FI =====

/// Weakest RSSI an ESP8266 radio reports (dBm).
pub const RSSI_MIN_DBM: f64 = -120.0;

/// Strongest possible RSSI (dBm).
pub const RSSI_MAX_DBM: f64 = 0.0;
