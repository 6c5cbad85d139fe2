//! Learned model artifacts
//!
//! ## Artifact Format
//!
//! Models are trained offline and shipped as one JSON file per quantity:
//!
//! ```json
//! {
//!   "quantity": "temperature",
//!   "scaler": { "mean": [22.0, 22.0, 0.5, 21.0, 23.0, 0.0, 45.0],
//!               "scale": [2.0, 2.0, 0.3, 2.0, 2.0, 0.01, 8.0] },
//!   "weights": [1.2, -0.4, 0.9, -0.1, 0.3, 2.5, -0.2],
//!   "bias": -3.0,
//!   "threshold": 0.7
//! }
//! ```
//!
//! Inputs are standardized with the scaler, combined linearly and squashed
//! with a sigmoid into a confidence in [0, 1]. The input layout is
//! [`FeatureVector::as_model_input`](roomguard_core::FeatureVector::as_model_input).
//!
//! ## Loading
//!
//! [`ModelRegistry::load_dir`] reads every `*.json` file in a directory.
//! Files that fail to parse or validate are skipped with a warning so one bad
//! artifact does not disable the others.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use roomguard_core::features::MODEL_INPUT_LEN;
use roomguard_core::Quantity;

use crate::scoring::sigmoid;
use crate::{ModelError, ModelResult};

/// Default decision threshold on model confidence
pub const DEFAULT_DECISION_THRESHOLD: f64 = 0.7;

fn default_threshold() -> f64 {
    DEFAULT_DECISION_THRESHOLD
}

/// Anything that turns a feature row into a confidence
pub trait Model: Send + Sync {
    /// Confidence in [0, 1] that the row is anomalous
    fn predict(&self, input: &[f64]) -> ModelResult<f64>;

    /// Confidence above which the row counts as anomalous
    fn threshold(&self) -> f64;
}

/// Per-feature standardization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    fn transform<'a>(&'a self, input: &'a [f64]) -> impl Iterator<Item = f64> + 'a {
        input
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(x, (mean, scale))| (x - mean) / scale)
    }
}

/// Logistic regression over standardized features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub quantity: Quantity,
    pub scaler: StandardScaler,
    pub weights: Vec<f64>,
    #[serde(default)]
    pub bias: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl LinearModel {
    /// Parse and validate an artifact
    pub fn from_json(text: &str) -> ModelResult<Self> {
        let model: LinearModel = serde_json::from_str(text)?;
        model.validate()?;
        Ok(model)
    }

    /// Check dimensions and numeric sanity
    pub fn validate(&self) -> ModelResult<()> {
        let dims = [self.scaler.mean.len(), self.scaler.scale.len(), self.weights.len()];
        if dims.iter().any(|d| *d != MODEL_INPUT_LEN) {
            return Err(ModelError::InvalidArtifact(format!(
                "expected {MODEL_INPUT_LEN} features, got mean={} scale={} weights={}",
                dims[0], dims[1], dims[2]
            )));
        }
        if self.scaler.scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return Err(ModelError::InvalidArtifact(
                "scaler scale must be finite and non-zero".to_string(),
            ));
        }
        let mut numbers = self
            .scaler
            .mean
            .iter()
            .chain(self.weights.iter())
            .chain(std::iter::once(&self.bias));
        if numbers.any(|v| !v.is_finite()) {
            return Err(ModelError::InvalidArtifact("non-finite parameter".to_string()));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ModelError::InvalidArtifact(format!(
                "threshold {} outside [0, 1]",
                self.threshold
            )));
        }
        Ok(())
    }
}

impl Model for LinearModel {
    fn predict(&self, input: &[f64]) -> ModelResult<f64> {
        if input.len() != self.weights.len() {
            return Err(ModelError::FeatureMismatch {
                expected: self.weights.len(),
                actual: input.len(),
            });
        }

        let logit = self
            .scaler
            .transform(input)
            .zip(self.weights.iter())
            .map(|(x, w)| x * w)
            .sum::<f64>()
            + self.bias;

        let confidence = sigmoid(logit);
        if !confidence.is_finite() {
            return Err(ModelError::NonFinite);
        }
        Ok(confidence)
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }
}

/// Loaded models keyed by quantity
#[derive(Default)]
pub struct ModelRegistry {
    models: HashMap<Quantity, Box<dyn Model>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model, replacing any previous one for the quantity
    pub fn insert(&mut self, quantity: Quantity, model: Box<dyn Model>) {
        self.models.insert(quantity, model);
    }

    pub fn get(&self, quantity: Quantity) -> Option<&dyn Model> {
        self.models.get(&quantity).map(|model| model.as_ref())
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Quantities with a model, sorted
    pub fn quantities(&self) -> Vec<Quantity> {
        let mut quantities: Vec<Quantity> = self.models.keys().copied().collect();
        quantities.sort();
        quantities
    }

    /// Load every valid artifact in `dir`
    ///
    /// Fails when the directory cannot be read or holds no valid model.
    pub fn load_dir(dir: &Path) -> ModelResult<Self> {
        let entries = fs::read_dir(dir).map_err(|source| ModelError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut registry = Self::new();
        for path in paths {
            match load_file(&path) {
                Ok(model) => {
                    debug!("loaded {} model from {}", model.quantity, path.display());
                    registry.insert(model.quantity, Box::new(model));
                }
                Err(err) => warn!("skipping model artifact {}: {err}", path.display()),
            }
        }

        if registry.is_empty() {
            return Err(ModelError::NoModels(dir.to_path_buf()));
        }
        Ok(registry)
    }
}

fn load_file(path: &Path) -> ModelResult<LinearModel> {
    let text = fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    LinearModel::from_json(&text)
}
