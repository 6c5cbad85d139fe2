//! Transport and Delivery for RoomGuard
//!
//! ## Overview
//!
//! Everything RoomGuard sends leaves through a [`Transport`]. The transport
//! only knows how to hand a message to the broker; whether the broker ever
//! confirmed it is the job of the [`DeliveryTracker`](delivery::DeliveryTracker).
//!
//! ```text
//!  publish(topic, payload, level)
//!        │
//!        ▼
//!  DeliveryTracker ──OutboundMessage──→ Transport ──→ broker
//!        ▲                                  │
//!        └────── Acknowledged(id) ──────────┘  (TransportEvent)
//! ```
//!
//! ## Guarantee Levels
//!
//! | Level          | MQTT QoS | Tracked | Retried | Disconnected     |
//! |----------------|----------|---------|---------|------------------|
//! | `AtMostOnce`   | 0        | no      | no      | fails fast       |
//! | `AtLeastOnce`  | 1        | yes     | yes     | queued           |
//!
//! ## Correlation
//!
//! The tracker tags every message with a [`CorrelationId`] before hand-off.
//! Transports map their own packet identifiers back to that id and report
//! broker confirmations as [`TransportEvent::Acknowledged`]. MQTT packet ids
//! are 16-bit and reused; correlation ids never are.
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use roomguard_connectors::{delivery::{DeliveryConfig, DeliveryTracker}, GuaranteeLevel};
//! use roomguard_connectors::mqtt::{MqttConfig, MqttTransport};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (transport, event_loop, mut events) = MqttTransport::connect(&MqttConfig::default())?;
//! let cancel = CancellationToken::new();
//! tokio::spawn(event_loop.run(cancel.clone()));
//!
//! let tracker = Arc::new(DeliveryTracker::new(Arc::new(transport), DeliveryConfig::default()));
//! tracker.spawn(cancel.clone());
//!
//! tracker
//!     .publish("alerts/fire_risk/NODE_01", b"{}".to_vec(), GuaranteeLevel::AtLeastOnce)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod delivery;
pub mod mqtt;

pub use delivery::{DeliveryConfig, DeliveryStats, DeliveryTracker};
pub use mqtt::{MqttConfig, MqttEventLoop, MqttTransport};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for transport and delivery operations
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Common connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// No broker connection; at-least-once messages are queued instead
    #[error("transport unavailable")]
    TransportUnavailable,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Delivery guarantee requested for one message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuaranteeLevel {
    /// Fire and forget
    AtMostOnce,
    /// Retried until acknowledged or the retry budget runs out
    AtLeastOnce,
}

/// Tracker-assigned message identity, monotonic and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CorrelationId(pub u64);

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// A message as handed to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub correlation: CorrelationId,
    pub topic: String,
    pub payload: Vec<u8>,
    pub level: GuaranteeLevel,
}

/// Something reported by a transport's receive side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Broker accepted the connection
    Connected,
    /// Connection lost; the transport keeps trying to reconnect
    Disconnected,
    /// Inbound message on a subscribed topic
    Message { topic: String, payload: Vec<u8> },
    /// Broker confirmed an at-least-once message
    Acknowledged(CorrelationId),
}

/// Publish side of a broker connection
///
/// `publish` returns once the message is handed off, never after waiting
/// for the broker's confirmation.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Hand `message` to the broker
    async fn publish(&self, message: &OutboundMessage) -> ConnectorResult<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;
}

/// Connection statistics common to all transports
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStats {
    /// Messages handed to the client
    pub messages_sent: u64,
    /// Hand-offs rejected by the client
    pub messages_failed: u64,
    /// Payload bytes handed off
    pub bytes_sent: u64,
    /// Connection acknowledgments after the first
    pub reconnections: u32,
    /// Last error message
    pub last_error: Option<String>,
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_display() {
        assert_eq!(CorrelationId(42).to_string(), "msg-42");
    }

    #[test]
    fn guarantee_level_names() {
        let json = serde_json::to_string(&GuaranteeLevel::AtLeastOnce).unwrap();
        assert_eq!(json, "\"at_least_once\"");
    }
}
