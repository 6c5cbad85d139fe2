//! Shared fixtures for service tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use roomguard_connectors::{
    ConnectorError, ConnectorResult, DeliveryConfig, DeliveryTracker, OutboundMessage, Transport,
};
use roomguard_core::{
    FixedTime, FusionScorer, MemoryStore, Normalizer, StoreConfig, TrendEvaluator,
};
use roomguard_service::{Pipeline, PublishingSink};

pub const T0: i64 = 1_700_000_000;

/// Broker stand-in recording published messages
#[derive(Default)]
pub struct MockTransport {
    disconnected: AtomicBool,
    sent: Mutex<Vec<OutboundMessage>>,
}

impl MockTransport {
    pub fn set_connected(&self, connected: bool) {
        self.disconnected.store(!connected, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn on_topic(&self, prefix: &str) -> Vec<OutboundMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.topic.starts_with(prefix))
            .collect()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn publish(&self, message: &OutboundMessage) -> ConnectorResult<()> {
        if !self.is_connected() {
            return Err(ConnectorError::TransportUnavailable);
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.disconnected.load(Ordering::SeqCst)
    }
}

pub struct Harness {
    pub transport: Arc<MockTransport>,
    pub tracker: Arc<DeliveryTracker>,
    pub pipeline: Pipeline,
}

/// Pipeline publishing through a tracker over the mock transport
pub fn harness() -> Harness {
    let transport = Arc::new(MockTransport::default());
    let tracker = Arc::new(DeliveryTracker::new(transport.clone(), DeliveryConfig::default()));
    let pipeline = Pipeline::new(
        Normalizer::new(Arc::new(FixedTime::new(T0))),
        Arc::new(MemoryStore::new(StoreConfig::default())),
        TrendEvaluator::default(),
        FusionScorer::default(),
        Arc::new(PublishingSink::new(tracker.clone())),
    );
    Harness {
        transport,
        tracker,
        pipeline,
    }
}

/// Combined node payload of a person lying still near the floor
pub fn fallen(at: i64) -> Vec<u8> {
    json!({
        "device_id": "NODE_01",
        "location": "Bedroom",
        "timestamp": at,
        "sensors": {
            "pir": {"motion_detected": false},
            "ultrasonic": {"distance_cm": 30.0},
            "dht22": {"temperature_c": 22.0, "humidity_percent": 45.0}
        },
        "wifi": {"rssi": -60}
    })
    .to_string()
    .into_bytes()
}

pub fn json_of(message: &OutboundMessage) -> Value {
    serde_json::from_slice(&message.payload).unwrap()
}
