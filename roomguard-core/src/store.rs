//! Rolling-window reading store
//!
//! The fusion scorer and trend evaluator read recent history through the
//! [`ReadingStore`] trait. Production deployments back it with a time-series
//! database; [`MemoryStore`] keeps the window in process and is what the
//! service runs with by default.
//!
//! ## Retention
//!
//! Readings are kept for the longest trend window plus a safety margin,
//! measured back from the newest capture time of the same device. A device
//! with a wrong clock only ages out its own history. The store never holds
//! more than its configured capacity. Eviction happens on append.

use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::constants::time::{FLUCTUATION_WINDOW_SECS, RETENTION_MARGIN_SECS};
use crate::errors::StoreError;
use crate::reading::{Reading, SensorKind};
use crate::time::Timestamp;

/// Default maximum number of readings held by a [`MemoryStore`]
pub const DEFAULT_STORE_CAPACITY: usize = 10_000;

/// Default maximum number of readings returned by one query
pub const DEFAULT_QUERY_LIMIT: usize = 500;

/// Selection of recent readings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowQuery {
    /// Only readings from this device
    pub device_id: Option<String>,
    /// Only readings of this kind
    pub kind: Option<SensorKind>,
    /// Oldest capture time included
    pub since: Timestamp,
    /// Maximum number of readings, newest kept
    pub limit: usize,
}

impl WindowQuery {
    /// All readings captured at or after `since`
    pub fn since(since: Timestamp) -> Self {
        Self {
            device_id: None,
            kind: None,
            since,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }

    pub fn device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn kind(mut self, kind: SensorKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Whether a reading satisfies the filters (limit aside)
    pub fn matches(&self, reading: &Reading) -> bool {
        reading.captured_at >= self.since
            && self
                .device_id
                .as_deref()
                .map_or(true, |device| device == reading.device_id)
            && self.kind.map_or(true, |kind| kind == reading.kind)
    }
}

/// Persistence boundary for canonical readings
pub trait ReadingStore: Send + Sync {
    /// Persist one reading
    fn append_reading(&self, reading: Reading) -> Result<(), StoreError>;

    /// Readings matching `query`, ordered by capture time ascending
    fn recent_readings(&self, query: &WindowQuery) -> Result<Vec<Reading>, StoreError>;
}

/// Retention settings for [`MemoryStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Seconds a reading is kept behind the newest capture time
    pub retention_secs: i64,
    /// Hard bound on the number of readings held
    pub capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retention_secs: FLUCTUATION_WINDOW_SECS + RETENTION_MARGIN_SECS,
            capacity: DEFAULT_STORE_CAPACITY,
        }
    }
}

impl StoreConfig {
    pub fn with_retention(mut self, retention_secs: i64) -> Self {
        self.retention_secs = retention_secs;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

/// In-process store ordered by capture time
///
/// Out-of-order appends are inserted at their sorted position, so queries
/// never need to sort.
#[derive(Debug, Default)]
pub struct MemoryStore {
    config: StoreConfig,
    readings: RwLock<VecDeque<Reading>>,
}

impl MemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            readings: RwLock::new(VecDeque::new()),
        }
    }

    /// Number of readings currently held
    pub fn len(&self) -> usize {
        self.readings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict(&self, readings: &mut VecDeque<Reading>, device_id: &str) {
        let newest = readings
            .iter()
            .rev()
            .find(|r| r.device_id == device_id)
            .map(|r| r.captured_at);
        if let Some(newest) = newest {
            let cutoff = newest.saturating_sub(self.config.retention_secs);
            readings.retain(|r| r.device_id != device_id || r.captured_at >= cutoff);
        }
        while readings.len() > self.config.capacity {
            readings.pop_front();
        }
    }
}

impl ReadingStore for MemoryStore {
    fn append_reading(&self, reading: Reading) -> Result<(), StoreError> {
        let mut readings = self
            .readings
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let device_id = reading.device_id.clone();
        let position = readings.partition_point(|r| r.captured_at <= reading.captured_at);
        readings.insert(position, reading);
        self.evict(&mut readings, &device_id);
        Ok(())
    }

    fn recent_readings(&self, query: &WindowQuery) -> Result<Vec<Reading>, StoreError> {
        if query.limit == 0 {
            return Err(StoreError::InvalidQuery("limit must be positive".to_string()));
        }

        let readings = self
            .readings
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let mut selected: Vec<Reading> = readings
            .iter()
            .rev()
            .filter(|r| query.matches(r))
            .take(query.limit)
            .cloned()
            .collect();
        selected.reverse();
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::fields;

    fn reading(device: &str, kind: SensorKind, at: Timestamp) -> Reading {
        Reading::new(device, kind, at).with_value(fields::VALUE, at as f64)
    }

    #[test]
    fn out_of_order_appends_are_sorted() {
        let store = MemoryStore::default();
        for at in [30, 10, 20] {
            store.append_reading(reading("a", SensorKind::Motion, at)).unwrap();
        }

        let times: Vec<_> = store
            .recent_readings(&WindowQuery::since(0))
            .unwrap()
            .iter()
            .map(|r| r.captured_at)
            .collect();
        assert_eq!(times, vec![10, 20, 30]);
    }

    #[test]
    fn filters_by_device_and_kind() {
        let store = MemoryStore::default();
        store.append_reading(reading("a", SensorKind::Motion, 10)).unwrap();
        store.append_reading(reading("b", SensorKind::Motion, 11)).unwrap();
        store.append_reading(reading("a", SensorKind::Distance, 12)).unwrap();

        let query = WindowQuery::since(0).device("a").kind(SensorKind::Motion);
        let found = store.recent_readings(&query).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].captured_at, 10);
    }

    #[test]
    fn limit_keeps_newest() {
        let store = MemoryStore::default();
        for at in 0..10 {
            store.append_reading(reading("a", SensorKind::Motion, at)).unwrap();
        }

        let found = store.recent_readings(&WindowQuery::since(0).limit(3)).unwrap();
        let times: Vec<_> = found.iter().map(|r| r.captured_at).collect();
        assert_eq!(times, vec![7, 8, 9]);
    }

    #[test]
    fn retention_evicts_old_readings() {
        let store = MemoryStore::new(StoreConfig::default().with_retention(60));
        store.append_reading(reading("a", SensorKind::Motion, 0)).unwrap();
        store.append_reading(reading("a", SensorKind::Motion, 50)).unwrap();
        store.append_reading(reading("a", SensorKind::Motion, 100)).unwrap();

        assert_eq!(store.len(), 2);
    }

    #[test]
    fn retention_is_per_device() {
        let store = MemoryStore::new(StoreConfig::default().with_retention(60));
        store.append_reading(reading("good", SensorKind::Motion, 1_000)).unwrap();
        store.append_reading(reading("bad", SensorKind::Motion, 4_000_000_000)).unwrap();
        store.append_reading(reading("good", SensorKind::Motion, 1_010)).unwrap();
        store.append_reading(reading("good", SensorKind::Motion, 1_020)).unwrap();

        let good = store
            .recent_readings(&WindowQuery::since(0).device("good"))
            .unwrap();
        assert_eq!(good.len(), 3);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn capacity_bound() {
        let store = MemoryStore::new(StoreConfig::default().with_capacity(2));
        for at in 0..5 {
            store.append_reading(reading("a", SensorKind::Motion, at)).unwrap();
        }
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn zero_limit_rejected() {
        let store = MemoryStore::default();
        let err = store.recent_readings(&WindowQuery::since(0).limit(0));
        assert!(matches!(err, Err(StoreError::InvalidQuery(_))));
    }
}
