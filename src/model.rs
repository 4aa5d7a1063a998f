//! Trained model wrapper.
//!
//! [`BoostedModel`] couples a fitted forest with the metadata that makes it
//! usable on new data: the ordered feature schema it was trained on, the
//! label name, and the winning hyperparameters. Prediction validates the
//! schema and fails loudly on any mismatch instead of silently reindexing.

use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::data::Frame;
use crate::error::{ModelError, Result};
use crate::repr::Forest;
use crate::training::gbdt::GbdtParams;
use crate::training::metrics::DEFAULT_THRESHOLD;
use crate::training::objective::LogisticLoss;
use crate::utils::Parallelism;

/// Metadata carried alongside the forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
    /// Input feature names, order-sensitive.
    pub feature_names: Vec<String>,
    /// Label column the model predicts.
    pub label: String,
    /// Hyperparameters the search settled on.
    pub best_params: GbdtParams,
    /// Cross-validated score of the winning candidate.
    pub best_score: f64,
}

/// A fitted binary classifier with a fixed input schema.
#[derive(Debug, Clone, PartialEq)]
pub struct BoostedModel {
    forest: Forest,
    meta: ModelMeta,
}

impl BoostedModel {
    pub fn new(forest: Forest, meta: ModelMeta) -> Self {
        Self { forest, meta }
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    /// Positive-class probabilities for a feature-major matrix whose rows
    /// follow the model's feature order.
    pub fn predict_proba(
        &self,
        features: ArrayView2<f32>,
        parallelism: Parallelism,
    ) -> Array1<f32> {
        let margins = self.forest.predict_margin(features, parallelism);
        LogisticLoss.transform_predictions(margins.view())
    }

    /// Probabilities for a frame, after validating its column schema.
    pub fn predict_frame(&self, frame: &Frame, parallelism: Parallelism) -> Result<Array1<f32>> {
        let (names, matrix) = frame.to_matrix()?;
        if names != self.meta.feature_names {
            return Err(ModelError::SchemaMismatch {
                expected: self.meta.feature_names.join(", "),
                got: names.join(", "),
            }
            .into());
        }
        Ok(self.predict_proba(matrix.view(), parallelism))
    }

    /// Hard {0, 1} classes at the default threshold.
    pub fn predict_classes(
        &self,
        features: ArrayView2<f32>,
        parallelism: Parallelism,
    ) -> Array1<f32> {
        self.predict_proba(features, parallelism)
            .mapv(|p| if p >= DEFAULT_THRESHOLD { 1.0 } else { 0.0 })
    }
}
