//! Shared fixtures for delivery tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use roomguard_connectors::{
    ConnectorError, ConnectorResult, CorrelationId, OutboundMessage, Transport,
};

/// In-memory transport recording every hand-off
#[derive(Default)]
pub struct MockTransport {
    disconnected: AtomicBool,
    reject: AtomicBool,
    sent: Mutex<Vec<OutboundMessage>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_connected(&self, connected: bool) {
        self.disconnected.store(!connected, Ordering::SeqCst);
    }

    /// Stay connected but refuse hand-offs
    pub fn set_rejecting(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sends_of(&self, id: CorrelationId) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.correlation == id)
            .count()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn publish(&self, message: &OutboundMessage) -> ConnectorResult<()> {
        if !self.is_connected() {
            return Err(ConnectorError::TransportUnavailable);
        }
        if self.reject.load(Ordering::SeqCst) {
            return Err(ConnectorError::Protocol("request queue full".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.disconnected.load(Ordering::SeqCst)
    }
}
