//! RoomGuard backend service
//!
//! Wires the engine to the broker:
//!
//! ```text
//! MqttEventLoop ──TransportEvent──→ pipeline::run ──→ Pipeline ──→ PublishingSink
//!                                        │                              │
//!                                        └──acks──→ DeliveryTracker ←───┘
//!                                                        │
//!                                                  MqttTransport
//! ```
//!
//! The binary in `main.rs` only parses [`Config`], initialises logging and
//! owns the tasks; everything it runs lives here so it can be tested
//! without a broker.

#![deny(unsafe_code)]

pub mod config;
pub mod pipeline;
pub mod sink;

pub use config::{Config, Settings};
pub use pipeline::{Dispatch, Pipeline};
pub use sink::PublishingSink;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
