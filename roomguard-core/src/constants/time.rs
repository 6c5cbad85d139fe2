//! Time-Related Constants
//!
//! All values in seconds.

/// Device sampling interval; one reading covers this much time.
pub const DEFAULT_SAMPLE_INTERVAL_SECS: i64 = 2;

/// Sliding window for rapid fluctuation detection (5 minutes).
pub const FLUCTUATION_WINDOW_SECS: i64 = 300;

/// Window for rapid temperature rise / humidity drop (2 minutes).
pub const SPIKE_WINDOW_SECS: i64 = 120;

/// Extra retention beyond the longest trend window.
pub const RETENTION_MARGIN_SECS: i64 = 60;

/// Device timestamps further ahead of the clock are replaced by receive time.
pub const MAX_FUTURE_SKEW_SECS: i64 = 300;

/// Device timestamps further behind the clock are replaced by receive time.
pub const MAX_PAST_SKEW_SECS: i64 = 86_400;

/// Default window fetched for incident scoring.
pub const INCIDENT_WINDOW_SECS: i64 = 60;

/// Default retry interval of the delivery tracker.
pub const DELIVERY_RETRY_INTERVAL_SECS: u64 = 2;

/// Default retry budget of the delivery tracker.
pub const DELIVERY_MAX_RETRIES: u32 = 3;
