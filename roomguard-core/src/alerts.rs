//! Alert records
//!
//! An [`Alert`] is append-only: once raised it is handed to the sink and never
//! mutated. Rules that want to raise something build it with
//! [`Alert::new`] plus `with_value`; overlay strategies return an
//! [`AlertDraft`] instead, which the trend evaluator completes with the
//! device and trigger time.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::reading::{Quantity, Reading};
use crate::time::Timestamp;

/// Severity tier, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Extreme,
}

impl Severity {
    pub const fn name(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Extreme => "extreme",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What kind of condition an alert reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    /// Value outside its configured band
    ThresholdBreach,
    /// Value range within the fluctuation window too wide
    RapidFluctuation,
    /// Value outside what the sensor can physically report
    SensorFault,
    /// Raised by the anomaly overlay
    AnomalyOverlay,
    /// Compound temperature/humidity rule
    FireRisk,
    /// Sustained unusual motion
    MotionAnomaly,
}

impl AlertCategory {
    pub const fn name(&self) -> &'static str {
        match self {
            AlertCategory::ThresholdBreach => "threshold_breach",
            AlertCategory::RapidFluctuation => "rapid_fluctuation",
            AlertCategory::SensorFault => "sensor_fault",
            AlertCategory::AnomalyOverlay => "anomaly_overlay",
            AlertCategory::FireRisk => "fire_risk",
            AlertCategory::MotionAnomaly => "motion_anomaly",
        }
    }
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One raised condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Subject device
    pub device_id: String,
    pub category: AlertCategory,
    pub severity: Severity,
    /// Human-readable description
    pub message: String,
    /// Values that triggered the alert
    pub values: BTreeMap<String, f64>,
    /// Capture time of the triggering reading
    pub triggered_at: Timestamp,
}

impl Alert {
    /// Create an alert for the reading that triggered it
    pub fn new(
        reading: &Reading,
        category: AlertCategory,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            device_id: reading.device_id.clone(),
            category,
            severity,
            message: message.into(),
            values: BTreeMap::new(),
            triggered_at: reading.captured_at,
        }
    }

    /// Attach a value to the snapshot
    pub fn with_value(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }
}

/// How an overlay reached its verdict
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum DraftSource {
    /// Learned model with its confidence (0-1)
    Model { confidence: f64 },
    /// Z-score against the trailing window
    Statistical { z_score: f64 },
}

/// Overlay verdict not yet bound to a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDraft {
    pub quantity: Quantity,
    pub severity: Severity,
    pub message: String,
    pub values: BTreeMap<String, f64>,
    pub source: DraftSource,
}

impl AlertDraft {
    pub fn new(
        quantity: Quantity,
        severity: Severity,
        message: impl Into<String>,
        source: DraftSource,
    ) -> Self {
        Self {
            quantity,
            severity,
            message: message.into(),
            values: BTreeMap::new(),
            source,
        }
    }

    pub fn with_value(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Bind the draft to the reading it was scored on
    pub fn into_alert(self, reading: &Reading) -> Alert {
        let mut alert = Alert::new(
            reading,
            AlertCategory::AnomalyOverlay,
            self.severity,
            self.message,
        );
        alert.values = self.values;
        match self.source {
            DraftSource::Model { confidence } => {
                alert.values.insert("confidence".to_string(), confidence);
            }
            DraftSource::Statistical { z_score } => {
                alert.values.insert("z_score".to_string(), z_score);
            }
        }
        alert
    }
}
