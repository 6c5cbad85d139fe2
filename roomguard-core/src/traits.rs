//! Core traits at the engine's seams
//!
//! The scoring code only depends on these interfaces, never on a concrete
//! model runtime or output channel:
//! - [`AnomalyOverlay`]: optional learned/statistical scoring, chosen at
//!   construction time
//! - [`IncidentSink`]: where incidents and alerts go once raised

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::alerts::{Alert, AlertDraft};
use crate::errors::CoreResult;
use crate::features::FeatureVector;
use crate::fusion::IncidentScore;
use crate::reading::{Quantity, Reading};
use crate::time::Timestamp;

/// Anomaly scoring strategy consulted after the deterministic rules
///
/// Implementations absorb their own failures: a strategy that cannot score
/// returns `None` (or delegates to a fallback) rather than erroring, so the
/// deterministic alerts are never suppressed.
pub trait AnomalyOverlay: Send + Sync {
    /// Score one quantity, returning a draft when it looks anomalous
    fn try_score(&self, quantity: Quantity, features: &FeatureVector) -> Option<AlertDraft>;

    /// Short name of the strategy, for logs
    fn strategy(&self) -> &'static str;
}

/// Where an incident was observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentContext {
    /// Device of the newest reading in the window
    pub device_id: String,
    /// Oldest capture time in the window
    pub window_start: Timestamp,
    /// Newest capture time in the window
    pub window_end: Timestamp,
    /// Readings the score was computed from
    pub reading_count: usize,
}

impl IncidentContext {
    /// Describe the window a score was computed over
    pub fn from_window(readings: &[Reading]) -> Self {
        let newest = readings.iter().max_by_key(|r| r.captured_at);
        Self {
            device_id: newest
                .map(|r| r.device_id.clone())
                .unwrap_or_else(|| crate::normalize::UNKNOWN_DEVICE.to_string()),
            window_start: readings.iter().map(|r| r.captured_at).min().unwrap_or(0),
            window_end: newest.map(|r| r.captured_at).unwrap_or(0),
            reading_count: readings.len(),
        }
    }
}

/// Output boundary for incidents and alerts
///
/// Returns an identifier assigned by the sink.
#[async_trait]
pub trait IncidentSink: Send + Sync {
    async fn record_incident(
        &self,
        score: &IncidentScore,
        context: &IncidentContext,
    ) -> CoreResult<String>;

    async fn record_alert(&self, alert: &Alert) -> CoreResult<String>;
}

/// Sink that keeps everything in memory
///
/// Used in tests and as a dry-run sink.
#[derive(Debug, Default)]
pub struct MemorySink {
    incidents: Mutex<Vec<(IncidentScore, IncidentContext)>>,
    alerts: Mutex<Vec<Alert>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded incidents
    pub fn incidents(&self) -> Vec<(IncidentScore, IncidentContext)> {
        self.incidents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot of recorded alerts
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl IncidentSink for MemorySink {
    async fn record_incident(
        &self,
        score: &IncidentScore,
        context: &IncidentContext,
    ) -> CoreResult<String> {
        let mut incidents = self.incidents.lock().unwrap_or_else(PoisonError::into_inner);
        incidents.push((score.clone(), context.clone()));
        Ok(format!("incident-{}", incidents.len()))
    }

    async fn record_alert(&self, alert: &Alert) -> CoreResult<String> {
        let mut alerts = self.alerts.lock().unwrap_or_else(PoisonError::into_inner);
        alerts.push(alert.clone());
        Ok(format!("alert-{}", alerts.len()))
    }
}
