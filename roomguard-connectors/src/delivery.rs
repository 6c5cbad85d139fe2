//! Delivery Tracker
//!
//! ## Overview
//!
//! Wraps a [`Transport`] with at-least-once semantics. Every tracked message
//! stays in a table keyed by [`CorrelationId`] from the moment it is
//! published until the broker acknowledges it or its retry budget runs out.
//!
//! ## Lifecycle
//!
//! ```text
//! publish ──(connected)──→ handed off ──ack──→ removed, acknowledged += 1
//!    │                        │
//! (disconnected)           (backoff elapsed, retry_count < max)
//!    │                        └─→ republished, retry_count += 1
//!    ▼                        │
//!  queued ──next cycle──→ handed off
//!                             │
//!                          (backoff elapsed, retry_count == max)
//!                             └─→ removed, failed += 1, callback
//! ```
//!
//! ## Budget Rules
//!
//! - While the transport is disconnected the retry cycle sends nothing and
//!   no retry budget is consumed.
//! - A hand-off rejected by the transport consumes no budget either; the
//!   message is tried again on the next cycle.
//! - Backoff is fixed, not exponential.
//!
//! ## Locking
//!
//! The table and counters sit behind one `std::sync::Mutex`. It is never held
//! across an `.await`: a retry cycle snapshots what is due, releases the lock
//! to send, and re-locks to record the outcome, skipping entries that were
//! acknowledged in between.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use roomguard_core::constants::time::{DELIVERY_MAX_RETRIES, DELIVERY_RETRY_INTERVAL_SECS};

use crate::{
    ConnectorError, ConnectorResult, CorrelationId, GuaranteeLevel, OutboundMessage, Transport,
};

/// Called with the topic and payload of a message whose budget ran out
pub type FailureCallback = Box<dyn Fn(&str, &[u8]) + Send + Sync>;

/// Retry policy of a tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Republish attempts after the first hand-off
    pub max_retries: u32,
    /// Period of the background retry cycle
    pub retry_interval_secs: u64,
    /// Time a handed-off message waits for its ack before a retry
    pub backoff_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_retries: DELIVERY_MAX_RETRIES,
            retry_interval_secs: DELIVERY_RETRY_INTERVAL_SECS,
            backoff_secs: DELIVERY_RETRY_INTERVAL_SECS,
        }
    }
}

impl DeliveryConfig {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the cycle period and the per-message backoff together
    pub fn with_retry_interval(mut self, secs: u64) -> Self {
        self.retry_interval_secs = secs;
        self.backoff_secs = secs;
        self
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    pub fn validate(&self) -> ConnectorResult<()> {
        if self.retry_interval_secs == 0 {
            return Err(ConnectorError::Config(
                "delivery retry interval must be at least 1 second".to_string(),
            ));
        }
        if self.backoff_secs == 0 {
            return Err(ConnectorError::Config(
                "delivery backoff must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }
}

/// One at-least-once message awaiting acknowledgment
#[derive(Debug, Clone)]
pub struct PendingMessage {
    pub message: OutboundMessage,
    /// Last hand-off, or the publish request while still queued
    pub published_at: Instant,
    pub retry_count: u32,
    pub max_retries: u32,
    pub backoff: Duration,
    /// False until the transport has accepted the message once
    pub handed_off: bool,
}

impl PendingMessage {
    fn is_due(&self, now: Instant) -> bool {
        !self.handed_off || now.saturating_duration_since(self.published_at) >= self.backoff
    }

    fn is_exhausted(&self) -> bool {
        self.handed_off && self.retry_count >= self.max_retries
    }
}

/// Counters snapshot
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DeliveryStats {
    /// At-least-once messages accepted for tracking
    pub published: u64,
    pub acknowledged: u64,
    /// Messages whose retry budget ran out
    pub failed: u64,
    /// Republish attempts
    pub retried: u64,
    /// Messages still tracked
    pub pending: usize,
    /// At-most-once messages handed off
    pub sent_unconfirmed: u64,
    /// acknowledged / published, 1.0 before the first publish
    pub reliability: f64,
}

/// Outcome of one retry cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryCycle {
    /// Queued messages handed off for the first time
    pub handed_off: usize,
    pub retried: usize,
    pub failed: usize,
}

#[derive(Default)]
struct TrackerState {
    pending: HashMap<CorrelationId, PendingMessage>,
    published: u64,
    acknowledged: u64,
    failed: u64,
    retried: u64,
    sent_unconfirmed: u64,
}

enum Due {
    First(OutboundMessage),
    Retry(OutboundMessage),
}

/// At-least-once delivery over a [`Transport`]
pub struct DeliveryTracker {
    transport: Arc<dyn Transport>,
    config: DeliveryConfig,
    next_id: AtomicU64,
    state: Mutex<TrackerState>,
    on_failure: Option<FailureCallback>,
}

impl DeliveryTracker {
    pub fn new(transport: Arc<dyn Transport>, config: DeliveryConfig) -> Self {
        Self {
            transport,
            config,
            next_id: AtomicU64::new(1),
            state: Mutex::new(TrackerState::default()),
            on_failure: None,
        }
    }

    /// Report messages whose retry budget ran out
    pub fn with_failure_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &[u8]) + Send + Sync + 'static,
    {
        self.on_failure = Some(Box::new(callback));
        self
    }

    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_correlation(&self) -> CorrelationId {
        CorrelationId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Publish a message and return its correlation id
    ///
    /// At-most-once fails with [`ConnectorError::TransportUnavailable`] when
    /// disconnected. At-least-once never fails for connectivity: the message
    /// is tracked and handed off now or on a later retry cycle.
    pub async fn publish(
        &self,
        topic: impl Into<String>,
        payload: Vec<u8>,
        level: GuaranteeLevel,
    ) -> ConnectorResult<CorrelationId> {
        let message = OutboundMessage {
            correlation: self.next_correlation(),
            topic: topic.into(),
            payload,
            level,
        };
        let id = message.correlation;

        match level {
            GuaranteeLevel::AtMostOnce => {
                if !self.transport.is_connected() {
                    return Err(ConnectorError::TransportUnavailable);
                }
                self.transport.publish(&message).await?;
                self.state().sent_unconfirmed += 1;
                Ok(id)
            }
            GuaranteeLevel::AtLeastOnce => {
                // Registered before hand-off so an early ack finds the entry
                {
                    let mut state = self.state();
                    state.published += 1;
                    state.pending.insert(
                        id,
                        PendingMessage {
                            message: message.clone(),
                            published_at: Instant::now(),
                            retry_count: 0,
                            max_retries: self.config.max_retries,
                            backoff: self.config.backoff(),
                            handed_off: false,
                        },
                    );
                }

                if !self.transport.is_connected() {
                    debug!("{id} queued for {}: transport unavailable", message.topic);
                    return Ok(id);
                }

                match self.transport.publish(&message).await {
                    Ok(()) => {
                        if !self.mark_handed_off(id, Instant::now(), false) {
                            debug!("{id} confirmed before hand-off returned");
                        }
                    }
                    Err(err) => debug!("{id} queued for {}: {err}", message.topic),
                }
                Ok(id)
            }
        }
    }

    /// Record a broker confirmation
    ///
    /// Returns false for unknown or duplicate ids, which are otherwise ignored.
    pub fn acknowledge(&self, id: CorrelationId) -> bool {
        let mut state = self.state();
        if state.pending.remove(&id).is_some() {
            state.acknowledged += 1;
            true
        } else {
            debug!("ignoring acknowledgment for unknown {id}");
            false
        }
    }

    pub fn stats(&self) -> DeliveryStats {
        let state = self.state();
        let reliability = if state.published == 0 {
            1.0
        } else {
            state.acknowledged as f64 / state.published as f64
        };
        DeliveryStats {
            published: state.published,
            acknowledged: state.acknowledged,
            failed: state.failed,
            retried: state.retried,
            pending: state.pending.len(),
            sent_unconfirmed: state.sent_unconfirmed,
            reliability,
        }
    }

    /// Whether `id` is still awaiting acknowledgment
    pub fn is_pending(&self, id: CorrelationId) -> bool {
        self.state().pending.contains_key(&id)
    }

    /// Run one retry cycle as of now
    pub async fn process_retries(&self) -> RetryCycle {
        self.process_retries_at(Instant::now()).await
    }

    /// Run one retry cycle as of `now`
    pub async fn process_retries_at(&self, now: Instant) -> RetryCycle {
        let mut cycle = RetryCycle::default();
        if !self.transport.is_connected() {
            return cycle;
        }

        let mut exhausted = Vec::new();
        let due: Vec<Due> = {
            let mut state = self.state();
            let expired: Vec<CorrelationId> = state
                .pending
                .iter()
                .filter(|(_, pending)| pending.is_due(now) && pending.is_exhausted())
                .map(|(id, _)| *id)
                .collect();
            for id in expired {
                if let Some(pending) = state.pending.remove(&id) {
                    state.failed += 1;
                    exhausted.push(pending);
                }
            }

            let mut due: Vec<Due> = state
                .pending
                .values()
                .filter(|pending| pending.is_due(now))
                .map(|pending| {
                    if pending.handed_off {
                        Due::Retry(pending.message.clone())
                    } else {
                        Due::First(pending.message.clone())
                    }
                })
                .collect();
            due.sort_by_key(|d| match d {
                Due::First(m) | Due::Retry(m) => m.correlation,
            });
            due
        };

        cycle.failed = exhausted.len();
        for pending in exhausted {
            warn!(
                "delivery of {} to {} failed after {} retries",
                pending.message.correlation, pending.message.topic, pending.retry_count
            );
            if let Some(callback) = &self.on_failure {
                callback(&pending.message.topic, &pending.message.payload);
            }
        }

        for entry in due {
            let (message, is_retry) = match entry {
                Due::First(message) => (message, false),
                Due::Retry(message) => (message, true),
            };
            match self.transport.publish(&message).await {
                Ok(()) => {
                    if self.mark_handed_off(message.correlation, now, is_retry) {
                        if is_retry {
                            cycle.retried += 1;
                        } else {
                            cycle.handed_off += 1;
                        }
                    }
                }
                Err(err) => {
                    debug!("hand-off of {} deferred: {err}", message.correlation);
                }
            }
        }

        if cycle != RetryCycle::default() {
            debug!(
                "retry cycle: {} handed off, {} retried, {} failed",
                cycle.handed_off, cycle.retried, cycle.failed
            );
        }
        cycle
    }

    /// Returns false when the entry was acknowledged meanwhile
    fn mark_handed_off(&self, id: CorrelationId, at: Instant, is_retry: bool) -> bool {
        let mut state = self.state();
        let Some(pending) = state.pending.get_mut(&id) else {
            return false;
        };
        pending.handed_off = true;
        pending.published_at = at;
        if is_retry {
            pending.retry_count += 1;
            state.retried += 1;
        }
        true
    }

    /// Background retry loop, until `cancel` fires
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.retry_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.process_retries().await;
                }
                _ = cancel.cancelled() => {
                    info!("delivery retry loop shutting down");
                    break;
                }
            }
        }
    }

    /// Spawn [`run`](Self::run) on the current runtime
    pub fn spawn(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run(cancel))
    }
}
