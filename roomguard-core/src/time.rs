//! Time management for the ingestion path
//!
//! Readings carry capture time as integer epoch seconds. Devices usually stamp
//! their own messages; when they don't, the normalizer falls back to the
//! receive time taken from a [`TimeSource`]:
//! - System clock (production)
//! - Fixed clock (tests and replay)

use std::sync::atomic::{AtomicI64, Ordering};

/// Timestamp in seconds since the Unix epoch
pub type Timestamp = i64;

/// Source of time for the system
pub trait TimeSource: Send + Sync {
    /// Get current timestamp in epoch seconds
    fn now(&self) -> Timestamp;
}

/// Wall clock backed by `chrono`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTime;

impl TimeSource for SystemTime {
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp()
    }
}

/// Fixed time source for testing
///
/// Interior mutability lets a shared clock be advanced while the normalizer
/// holds a reference to it.
#[derive(Debug, Default)]
pub struct FixedTime {
    timestamp: AtomicI64,
}

impl FixedTime {
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp: AtomicI64::new(timestamp),
        }
    }

    pub fn set(&self, timestamp: Timestamp) {
        self.timestamp.store(timestamp, Ordering::Relaxed);
    }

    pub fn advance(&self, secs: i64) {
        self.timestamp.fetch_add(secs, Ordering::Relaxed);
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp.load(Ordering::Relaxed)
    }
}

/// Seconds elapsed from `earlier` to `later`, never negative
pub fn elapsed_secs(earlier: Timestamp, later: Timestamp) -> i64 {
    later.saturating_sub(earlier).max(0)
}
