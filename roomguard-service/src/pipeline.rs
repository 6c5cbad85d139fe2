//! Inbound dispatch
//!
//! ## Flow
//!
//! ```text
//! TransportEvent::Message
//!     │
//!     ▼
//! normalize_batch ──→ store.append_reading
//!     │
//!     ├─→ trend window (device, longest trend look-back) ──→ alerts ──→ sink
//!     │
//!     └─→ incident window (device, motion/distance/wearable only)
//!             └─→ score_incident ──(detected)──→ sink
//! ```
//!
//! A detected incident is recorded at most once per incident window and
//! device; the scorer keeps re-detecting the same fall while it lasts.
//!
//! Store failures end the dispatch loop. Sink failures are logged and the
//! stream keeps flowing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use roomguard_connectors::{DeliveryTracker, TransportEvent};
use roomguard_core::constants::time::INCIDENT_WINDOW_SECS;
use roomguard_core::{
    CoreResult, FusionScorer, IncidentContext, IncidentSink, Normalizer, Reading, ReadingStore,
    SensorKind, Timestamp, TrendEvaluator, WindowQuery,
};

/// What one inbound message produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dispatch {
    pub readings: usize,
    pub alerts: usize,
    pub incidents: usize,
}

/// Normalize, persist and evaluate inbound messages
pub struct Pipeline {
    normalizer: Normalizer,
    store: Arc<dyn ReadingStore>,
    trend: TrendEvaluator,
    fusion: FusionScorer,
    sink: Arc<dyn IncidentSink>,
    incident_window_secs: i64,
    last_incident: Mutex<HashMap<String, Timestamp>>,
}

impl Pipeline {
    pub fn new(
        normalizer: Normalizer,
        store: Arc<dyn ReadingStore>,
        trend: TrendEvaluator,
        fusion: FusionScorer,
        sink: Arc<dyn IncidentSink>,
    ) -> Self {
        Self {
            normalizer,
            store,
            trend,
            fusion,
            sink,
            incident_window_secs: INCIDENT_WINDOW_SECS,
            last_incident: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_incident_window(mut self, secs: i64) -> Self {
        self.incident_window_secs = secs;
        self
    }

    /// Handle one inbound message
    pub async fn handle_message(&self, topic: &str, payload: &[u8]) -> CoreResult<Dispatch> {
        let readings = self.normalizer.normalize_batch(topic, payload);
        let mut dispatch = Dispatch {
            readings: readings.len(),
            ..Dispatch::default()
        };

        for reading in &readings {
            self.store.append_reading(reading.clone())?;
        }

        let mut scored: Vec<&str> = Vec::new();
        for reading in &readings {
            dispatch.alerts += self.evaluate_trends(reading).await?;

            let triggers_fusion = matches!(
                reading.kind,
                SensorKind::Motion | SensorKind::Distance | SensorKind::Wearable
            );
            // a combined payload fans out into several readings of one device
            if triggers_fusion && !scored.contains(&reading.device_id.as_str()) {
                scored.push(&reading.device_id);
                dispatch.incidents += self.score_incident(reading).await?;
            }
        }

        debug!(
            "{topic}: {} reading(s), {} alert(s), {} incident(s)",
            dispatch.readings, dispatch.alerts, dispatch.incidents
        );
        Ok(dispatch)
    }

    async fn evaluate_trends(&self, reading: &Reading) -> CoreResult<usize> {
        let since = reading
            .captured_at
            .saturating_sub(self.trend.config().longest_window_secs());
        let window = self
            .store
            .recent_readings(&WindowQuery::since(since).device(&reading.device_id))?;

        let alerts = self.trend.evaluate(&reading.device_id, reading, &window);
        let mut recorded = 0;
        for alert in &alerts {
            match self.sink.record_alert(alert).await {
                Ok(id) => {
                    info!("{} alert {id} for {}: {}", alert.severity, alert.device_id, alert.message);
                    recorded += 1;
                }
                Err(err) => warn!("failed to record {} alert for {}: {err}", alert.category, alert.device_id),
            }
        }
        Ok(recorded)
    }

    async fn score_incident(&self, reading: &Reading) -> CoreResult<usize> {
        let since = reading.captured_at.saturating_sub(self.incident_window_secs);
        let window = self
            .store
            .recent_readings(&WindowQuery::since(since).device(&reading.device_id))?;

        let score = self.fusion.score_incident(&window);
        if !score.detected || self.recently_recorded(&reading.device_id, reading.captured_at) {
            return Ok(0);
        }

        let context = IncidentContext::from_window(&window);
        match self.sink.record_incident(&score, &context).await {
            Ok(id) => {
                warn!(
                    "incident {id} detected in {} (severity {:.2}, device {})",
                    score.location, score.severity, context.device_id
                );
                self.last_incident
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(reading.device_id.clone(), reading.captured_at);
                Ok(1)
            }
            Err(err) => {
                warn!("failed to record incident for {}: {err}", reading.device_id);
                Ok(0)
            }
        }
    }

    fn recently_recorded(&self, device_id: &str, at: Timestamp) -> bool {
        self.last_incident
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(device_id)
            .is_some_and(|last| at.saturating_sub(*last) < self.incident_window_secs)
    }
}

/// Dispatch transport events until cancelled or the channel closes
///
/// Returns the first store failure.
pub async fn run(
    pipeline: &Pipeline,
    tracker: &DeliveryTracker,
    mut events: mpsc::Receiver<TransportEvent>,
    cancel: CancellationToken,
) -> CoreResult<()> {
    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = cancel.cancelled() => {
                info!("dispatch loop shutting down");
                return Ok(());
            }
        };

        match event {
            Some(TransportEvent::Message { topic, payload }) => {
                pipeline.handle_message(&topic, &payload).await?;
            }
            Some(TransportEvent::Acknowledged(id)) => {
                tracker.acknowledge(id);
            }
            Some(TransportEvent::Connected) => info!("broker connection up"),
            Some(TransportEvent::Disconnected) => {
                warn!(
                    "broker connection lost, {} message(s) awaiting delivery",
                    tracker.stats().pending
                );
            }
            None => {
                info!("transport event channel closed");
                return Ok(());
            }
        }
    }
}

/// Wait for background tasks, logging any that panicked or were cancelled
///
/// Returns how many tasks did not finish cleanly.
pub async fn join_background(tasks: Vec<(&'static str, JoinHandle<()>)>) -> usize {
    let mut failed = 0;
    for (name, task) in tasks {
        match task.await {
            Ok(()) => debug!("{name} task finished"),
            Err(err) if err.is_panic() => {
                error!("{name} task panicked: {err}");
                failed += 1;
            }
            Err(err) => {
                warn!("{name} task did not finish: {err}");
                failed += 1;
            }
        }
    }
    failed
}
