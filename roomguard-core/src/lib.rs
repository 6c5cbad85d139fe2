//! Signal fusion and alerting engine for RoomGuard
//!
//! Turns raw room-sensor telemetry into incident scores and alerts.
//! Transport and delivery live in `roomguard-connectors`; learned scoring in
//! `roomguard-ml`.
//!
//! Key properties:
//! - Never fails on bad data: malformed input degrades to empty readings
//! - Pure scoring: fusion and trend evaluation do no I/O
//! - Out-of-order readings are re-sorted, never rejected
//!
//! ```no_run
//! use std::sync::Arc;
//! use roomguard_core::{FusionScorer, Normalizer, SystemTime, TrendEvaluator};
//!
//! let normalizer = Normalizer::new(Arc::new(SystemTime));
//! let reading = normalizer.normalize("sensors/dht22/NODE_01", br#"{"temperature_c": 41.0}"#);
//!
//! let alerts = TrendEvaluator::default().evaluate(&reading.device_id, &reading, &[]);
//! let score = FusionScorer::default().score_incident(&[reading]);
//! ```

#![deny(unsafe_code)]

pub mod alerts;
pub mod constants;
pub mod errors;
pub mod features;
pub mod fusion;
pub mod normalize;
pub mod reading;
pub mod store;
pub mod time;
pub mod traits;
pub mod trend;

// Public API
pub use alerts::{Alert, AlertCategory, AlertDraft, DraftSource, Severity};
pub use errors::{CoreError, CoreResult, StoreError};
pub use features::{FeatureVector, WindowStats};
pub use fusion::{FusionConfig, FusionScorer, FusionWeights, IncidentScore};
pub use normalize::{Normalizer, RawPayload};
pub use reading::{fields, FieldValue, Quantity, Reading, SensorKind, ValueBag};
pub use store::{MemoryStore, ReadingStore, StoreConfig, WindowQuery};
pub use time::{FixedTime, SystemTime, TimeSource, Timestamp};
pub use traits::{AnomalyOverlay, IncidentContext, IncidentSink, MemorySink};
pub use trend::{TrendConfig, TrendEvaluator};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
