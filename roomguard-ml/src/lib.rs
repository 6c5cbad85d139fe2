//! Anomaly overlay for RoomGuard
//!
//! ## Overview
//!
//! The deterministic trend rules catch what thresholds can express. The
//! overlay looks for values that are unusual *for this room*, on top of those
//! rules, and never replaces them.
//!
//! Two strategies implement [`AnomalyOverlay`]:
//!
//! 1. **Statistical** ([`StatisticalScorer`]): z-score of the current value
//!    against the last 20 window values. Always available.
//! 2. **Model-backed** ([`ModelBackedOverlay`]): per-quantity logistic models
//!    loaded from JSON artifacts, delegating to the statistical scorer
//!    whenever a model is missing or misbehaves.
//!
//! The strategy is chosen once, at construction:
//!
//! ```text
//! models dir ──exists + valid──→ ModelBackedOverlay ─(no model / error)─→ StatisticalScorer
//!      │
//!      └──missing / empty / invalid──→ StatisticalScorer
//! ```
//!
//! Training is out of scope; artifacts are produced offline.

#![deny(unsafe_code)]

pub mod model;
pub mod overlay;
pub mod scoring;
pub mod statistical;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};
use thiserror::Error;

pub use model::{LinearModel, Model, ModelRegistry, StandardScaler};
pub use overlay::ModelBackedOverlay;
pub use roomguard_core::AnomalyOverlay;
pub use statistical::StatisticalScorer;

/// Result type for model loading and inference
pub type ModelResult<T> = Result<T, ModelError>;

/// Model loading and inference errors
///
/// None of these reach the evaluators: loading errors select the statistical
/// strategy, inference errors fall back per call.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Artifact or directory could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Artifact is not valid JSON for a model
    #[error("invalid model json: {0}")]
    Parse(#[from] serde_json::Error),

    /// Artifact parsed but its parameters are unusable
    #[error("invalid model artifact: {0}")]
    InvalidArtifact(String),

    /// Input row does not match the model's dimensions
    #[error("expected {expected} features, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    /// Inference produced NaN or infinity
    #[error("model produced a non-finite output")]
    NonFinite,

    /// Directory contained no usable artifact
    #[error("no valid model artifacts in {0}")]
    NoModels(PathBuf),
}

/// Build the overlay strategy for a deployment
///
/// Loads models from `models_dir` when it exists and holds at least one valid
/// artifact; otherwise returns the statistical strategy.
pub fn build_overlay(models_dir: Option<&Path>) -> Arc<dyn AnomalyOverlay> {
    let Some(dir) = models_dir else {
        info!("no model directory configured, using statistical anomaly overlay");
        return Arc::new(StatisticalScorer::default());
    };

    if !dir.is_dir() {
        info!(
            "model directory {} not found, using statistical anomaly overlay",
            dir.display()
        );
        return Arc::new(StatisticalScorer::default());
    }

    match ModelRegistry::load_dir(dir) {
        Ok(registry) => {
            info!(
                "loaded {} anomaly model(s) from {}: {:?}",
                registry.len(),
                dir.display(),
                registry.quantities()
            );
            Arc::new(ModelBackedOverlay::new(registry))
        }
        Err(err) => {
            warn!("{err}, using statistical anomaly overlay");
            Arc::new(StatisticalScorer::default())
        }
    }
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
