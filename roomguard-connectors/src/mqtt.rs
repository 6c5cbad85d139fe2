//! MQTT transport over `rumqttc`
//!
//! ## Overview
//!
//! [`MqttTransport::connect`] returns two halves:
//!
//! - [`MqttTransport`]: the publish side, shared with the delivery tracker
//! - [`MqttEventLoop`]: a task that drives the connection and forwards
//!   [`TransportEvent`]s over a bounded channel
//!
//! The event loop re-subscribes to every sensor topic on each connection
//! acknowledgment, so a broker restart needs no intervention.
//!
//! ## Packet Identifiers
//!
//! `rumqttc` assigns packet ids inside the event loop, after `publish` has
//! returned. Publishes pass through the client's request channel in order, so
//! the transport queues each message's correlation id and the event loop pairs
//! them with `Outgoing::Publish(pkid)` events in the same order. A `PubAck`
//! then resolves its pkid back to the correlation id. QoS 0 publishes carry
//! pkid 0 and are never mapped.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, Outgoing, QoS};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    ConnectionStats, ConnectorError, ConnectorResult, CorrelationId, GuaranteeLevel,
    OutboundMessage, Transport, TransportEvent,
};

/// Inbound topic filters subscribed on every connection
///
/// Sensor kinds are wildcarded; a node publishing a kind the normalizer does
/// not know still arrives and is stored as `unknown`.
pub const SUBSCRIPTIONS: [&str; 3] = ["sensors/+/+", "wearable/+/+", "devices/+/status"];

/// Broker connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    /// Credentials are sent only when the username is non-empty
    pub username: String,
    pub password: String,
    pub keep_alive_secs: u64,
    /// Pause before polling again after a connection error
    pub reconnect_delay_secs: u64,
    /// Capacity of the client request and event channels
    pub channel_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "raspberry_pi_backend".to_string(),
            username: "admin".to_string(),
            password: "admin_password".to_string(),
            keep_alive_secs: 60,
            reconnect_delay_secs: 5,
            channel_capacity: 100,
        }
    }
}

impl MqttConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_keep_alive(mut self, secs: u64) -> Self {
        self.keep_alive_secs = secs;
        self
    }

    pub fn validate(&self) -> ConnectorResult<()> {
        if self.host.trim().is_empty() {
            return Err(ConnectorError::Config("broker host is empty".to_string()));
        }
        if self.port == 0 {
            return Err(ConnectorError::Config("broker port must be non-zero".to_string()));
        }
        if self.client_id.trim().is_empty() {
            return Err(ConnectorError::Config("client id is empty".to_string()));
        }
        if self.keep_alive_secs < 5 {
            return Err(ConnectorError::Config(format!(
                "keep-alive of {}s is below the 5s minimum",
                self.keep_alive_secs
            )));
        }
        if self.channel_capacity == 0 {
            return Err(ConnectorError::Config("channel capacity must be non-zero".to_string()));
        }
        Ok(())
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(self.client_id.clone(), self.host.clone(), self.port);
        options.set_keep_alive(Duration::from_secs(self.keep_alive_secs));
        if !self.username.is_empty() {
            options.set_credentials(self.username.clone(), self.password.clone());
        }
        options
    }
}

impl From<GuaranteeLevel> for QoS {
    fn from(level: GuaranteeLevel) -> Self {
        match level {
            GuaranteeLevel::AtMostOnce => QoS::AtMostOnce,
            GuaranteeLevel::AtLeastOnce => QoS::AtLeastOnce,
        }
    }
}

/// Correlation ids in publish order, paired with packet ids as they are assigned
#[derive(Debug, Default)]
pub struct PacketMap {
    queued: VecDeque<Option<CorrelationId>>,
    inflight: HashMap<u16, CorrelationId>,
}

impl PacketMap {
    /// Queue a publish; `None` for messages that will not be acknowledged
    pub fn push(&mut self, correlation: Option<CorrelationId>) {
        self.queued.push_back(correlation);
    }

    /// Undo the last push after the client rejected the publish
    pub fn cancel_last(&mut self) {
        self.queued.pop_back();
    }

    /// Pair an outgoing publish with the oldest queued id
    ///
    /// A pkid that is already in flight is a replay after reconnection and
    /// consumes nothing from the queue.
    pub fn on_outgoing(&mut self, pkid: u16) {
        if pkid != 0 && self.inflight.contains_key(&pkid) {
            debug!("publish pkid {pkid} replayed");
            return;
        }
        match self.queued.pop_front() {
            Some(Some(correlation)) if pkid != 0 => {
                self.inflight.insert(pkid, correlation);
            }
            Some(_) => {}
            None => debug!("outgoing publish pkid {pkid} with no queued message"),
        }
    }

    /// Resolve a `PubAck`
    pub fn on_ack(&mut self, pkid: u16) -> Option<CorrelationId> {
        self.inflight.remove(&pkid)
    }

    pub fn inflight(&self) -> usize {
        self.inflight.len()
    }
}

struct Shared {
    connected: AtomicBool,
    packets: Mutex<PacketMap>,
    stats: Mutex<ConnectionStats>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Publish side of the MQTT connection
pub struct MqttTransport {
    client: AsyncClient,
    shared: Arc<Shared>,
    // Keeps queue order identical to request-channel order
    gate: tokio::sync::Mutex<()>,
}

impl MqttTransport {
    /// Create the client and its event loop
    ///
    /// Nothing touches the network until the event loop is polled.
    pub fn connect(
        config: &MqttConfig,
    ) -> ConnectorResult<(Self, MqttEventLoop, mpsc::Receiver<TransportEvent>)> {
        config.validate()?;

        let (client, eventloop) = AsyncClient::new(config.options(), config.channel_capacity);
        let (events, receiver) = mpsc::channel(config.channel_capacity);
        let shared = Arc::new(Shared {
            connected: AtomicBool::new(false),
            packets: Mutex::new(PacketMap::default()),
            stats: Mutex::new(ConnectionStats::default()),
        });

        info!(
            "mqtt client {} configured for {}:{}",
            config.client_id, config.host, config.port
        );

        let transport = Self {
            client: client.clone(),
            shared: Arc::clone(&shared),
            gate: tokio::sync::Mutex::new(()),
        };
        let event_loop = MqttEventLoop {
            eventloop,
            client,
            shared,
            events,
            reconnect_delay: Duration::from_secs(config.reconnect_delay_secs),
            ever_connected: false,
        };
        Ok((transport, event_loop, receiver))
    }

    pub fn stats(&self) -> ConnectionStats {
        locked(&self.shared.stats).clone()
    }

    /// Send a DISCONNECT and stop accepting publishes
    pub async fn disconnect(&self) -> ConnectorResult<()> {
        self.shared.connected.store(false, Ordering::SeqCst);
        self.client
            .disconnect()
            .await
            .map_err(|err| ConnectorError::Protocol(err.to_string()))
    }
}

#[async_trait::async_trait]
impl Transport for MqttTransport {
    async fn publish(&self, message: &OutboundMessage) -> ConnectorResult<()> {
        if !self.is_connected() {
            return Err(ConnectorError::TransportUnavailable);
        }

        let tracked = match message.level {
            GuaranteeLevel::AtLeastOnce => Some(message.correlation),
            GuaranteeLevel::AtMostOnce => None,
        };

        let _gate = self.gate.lock().await;
        locked(&self.shared.packets).push(tracked);

        let result = self
            .client
            .publish(
                message.topic.clone(),
                message.level.into(),
                false,
                message.payload.clone(),
            )
            .await;

        let mut stats = locked(&self.shared.stats);
        match result {
            Ok(()) => {
                stats.messages_sent += 1;
                stats.bytes_sent += message.payload.len() as u64;
                Ok(())
            }
            Err(err) => {
                locked(&self.shared.packets).cancel_last();
                stats.messages_failed += 1;
                stats.last_error = Some(err.to_string());
                Err(ConnectorError::Protocol(err.to_string()))
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }
}

/// Receive side of the MQTT connection
pub struct MqttEventLoop {
    eventloop: EventLoop,
    client: AsyncClient,
    shared: Arc<Shared>,
    events: mpsc::Sender<TransportEvent>,
    reconnect_delay: Duration,
    ever_connected: bool,
}

impl MqttEventLoop {
    /// Drive the connection until `cancel` fires or the receiver is dropped
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            let polled = tokio::select! {
                polled = self.eventloop.poll() => polled,
                _ = cancel.cancelled() => {
                    info!("mqtt event loop shutting down");
                    break;
                }
            };

            match polled.map(|event| self.handle(event)).map_err(|err| err.to_string()) {
                Ok(Some(event)) => {
                    if !forward(&self.events, event).await {
                        break;
                    }
                }
                Ok(None) => {}
                Err(reason) => {
                    let was_connected = self.shared.connected.swap(false, Ordering::SeqCst);
                    warn!("mqtt connection error: {reason}");
                    locked(&self.shared.stats).last_error = Some(reason);
                    if was_connected && !forward(&self.events, TransportEvent::Disconnected).await {
                        break;
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(self.reconnect_delay) => {}
                        _ = cancel.cancelled() => break,
                    }
                }
            }
        }
    }

    fn handle(&mut self, event: Event) -> Option<TransportEvent> {
        match event {
            Event::Incoming(Incoming::ConnAck(_)) => {
                self.shared.connected.store(true, Ordering::SeqCst);
                if self.ever_connected {
                    locked(&self.shared.stats).reconnections += 1;
                }
                self.ever_connected = true;
                info!("connected to mqtt broker");
                self.subscribe();
                Some(TransportEvent::Connected)
            }
            Event::Incoming(Incoming::Publish(publish)) => Some(TransportEvent::Message {
                topic: publish.topic,
                payload: publish.payload.to_vec(),
            }),
            Event::Incoming(Incoming::PubAck(ack)) => {
                let correlation = locked(&self.shared.packets).on_ack(ack.pkid);
                match correlation {
                    Some(id) => Some(TransportEvent::Acknowledged(id)),
                    None => {
                        debug!("puback for unmapped pkid {}", ack.pkid);
                        None
                    }
                }
            }
            Event::Outgoing(Outgoing::Publish(pkid)) => {
                locked(&self.shared.packets).on_outgoing(pkid);
                None
            }
            _ => None,
        }
    }

    fn subscribe(&self) {
        for topic in SUBSCRIPTIONS {
            match self.client.try_subscribe(topic, QoS::AtLeastOnce) {
                Ok(()) => debug!("subscribed to {topic}"),
                Err(err) => warn!("failed to subscribe to {topic}: {err}"),
            }
        }
    }
}

/// Hand an event to the dispatcher; false once the receiver is gone
///
/// Takes the sender alone so [`MqttEventLoop::run`] stays `Send`.
async fn forward(events: &mpsc::Sender<TransportEvent>, event: TransportEvent) -> bool {
    if events.send(event).await.is_err() {
        info!("transport event receiver dropped, stopping mqtt event loop");
        return false;
    }
    true
}
