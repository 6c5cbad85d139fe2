//! Publishing sink
//!
//! Serializes incidents and alerts to JSON and publishes them at-least-once
//! through the delivery tracker:
//!
//! | Event    | Topic                          |
//! |----------|--------------------------------|
//! | alert    | `alerts/<category>/<device>`   |
//! | incident | `incidents/<location>`         |
//!
//! The returned id is the message's correlation id. Recording succeeds as
//! soon as the message is tracked, connected or not.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use roomguard_connectors::{DeliveryTracker, GuaranteeLevel};
use roomguard_core::{Alert, CoreError, CoreResult, IncidentContext, IncidentScore, IncidentSink};

#[derive(Serialize)]
struct IncidentEvent<'a> {
    #[serde(flatten)]
    score: &'a IncidentScore,
    #[serde(flatten)]
    context: &'a IncidentContext,
}

/// Topic segments cannot carry separators or wildcards
fn topic_segment(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '+' | '#') { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

pub fn alert_topic(alert: &Alert) -> String {
    format!(
        "alerts/{}/{}",
        alert.category.name(),
        topic_segment(&alert.device_id)
    )
}

pub fn incident_topic(score: &IncidentScore) -> String {
    format!("incidents/{}", topic_segment(&score.location))
}

/// [`IncidentSink`] that publishes through a [`DeliveryTracker`]
pub struct PublishingSink {
    tracker: Arc<DeliveryTracker>,
}

impl PublishingSink {
    pub fn new(tracker: Arc<DeliveryTracker>) -> Self {
        Self { tracker }
    }

    async fn publish(&self, topic: String, payload: Vec<u8>) -> CoreResult<String> {
        let id = self
            .tracker
            .publish(topic, payload, GuaranteeLevel::AtLeastOnce)
            .await
            .map_err(|err| CoreError::Sink(err.to_string()))?;
        Ok(id.to_string())
    }
}

#[async_trait]
impl IncidentSink for PublishingSink {
    async fn record_incident(
        &self,
        score: &IncidentScore,
        context: &IncidentContext,
    ) -> CoreResult<String> {
        let payload = serde_json::to_vec(&IncidentEvent { score, context })
            .map_err(|err| CoreError::Sink(err.to_string()))?;
        self.publish(incident_topic(score), payload).await
    }

    async fn record_alert(&self, alert: &Alert) -> CoreResult<String> {
        let payload = serde_json::to_vec(alert).map_err(|err| CoreError::Sink(err.to_string()))?;
        self.publish(alert_topic(alert), payload).await
    }
}
