//! Model-backed overlay with statistical fallback

use log::warn;

use roomguard_core::{AlertDraft, AnomalyOverlay, DraftSource, FeatureVector, Quantity};

use crate::model::ModelRegistry;
use crate::scoring::severity_from_confidence;
use crate::statistical::StatisticalScorer;

/// Scores with a learned model where one exists
///
/// A quantity without a model, a failed inference or a non-finite output is
/// handed to the statistical scorer. A model that scores the row as normal is
/// trusted and produces no draft.
pub struct ModelBackedOverlay {
    registry: ModelRegistry,
    fallback: StatisticalScorer,
}

impl ModelBackedOverlay {
    pub fn new(registry: ModelRegistry) -> Self {
        Self {
            registry,
            fallback: StatisticalScorer::default(),
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }
}

impl AnomalyOverlay for ModelBackedOverlay {
    fn try_score(&self, quantity: Quantity, features: &FeatureVector) -> Option<AlertDraft> {
        let Some(model) = self.registry.get(quantity) else {
            return self.fallback.try_score(quantity, features);
        };

        let confidence = match model.predict(&features.as_model_input()) {
            Ok(confidence) => confidence,
            Err(err) => {
                warn!("{quantity} model inference failed, using statistical fallback: {err}");
                return self.fallback.try_score(quantity, features);
            }
        };

        if confidence <= model.threshold() {
            return None;
        }

        Some(
            AlertDraft::new(
                quantity,
                severity_from_confidence(confidence),
                format!(
                    "{} anomaly predicted ({:.0}% confidence)",
                    quantity.name(),
                    confidence * 100.0
                ),
                DraftSource::Model { confidence },
            )
            .with_value(quantity.field(), features.current),
        )
    }

    fn strategy(&self) -> &'static str {
        "model"
    }
}
