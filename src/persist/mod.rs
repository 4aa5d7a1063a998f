//! Model persistence.
//!
//! The trained model is serialized to a compact binary payload with
//! `postcard`. The payload is a version-tagged enum: new format versions add
//! variants, and readers reject discriminants they do not know.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ModelError, PipelineError, Result};
use crate::model::{BoostedModel, ModelMeta};
use crate::repr::{Forest, Tree};

// =============================================================================
// Payload structures
// =============================================================================

/// Version-tagged payload for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Payload {
    V1(PayloadV1),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadV1 {
    pub meta: ModelMeta,
    pub forest: ForestPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestPayload {
    pub base_score: f32,
    pub trees: Vec<TreePayload>,
}

/// Flat SoA arrays of one tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreePayload {
    pub split_features: Vec<u32>,
    pub thresholds: Vec<f32>,
    pub left_children: Vec<u32>,
    pub right_children: Vec<u32>,
    pub default_left: Vec<bool>,
    pub is_leaf: Vec<bool>,
    pub leaf_values: Vec<f32>,
}

impl From<&Tree> for TreePayload {
    fn from(tree: &Tree) -> Self {
        Self {
            split_features: tree.split_features().to_vec(),
            thresholds: tree.thresholds().to_vec(),
            left_children: tree.left_children().to_vec(),
            right_children: tree.right_children().to_vec(),
            default_left: tree.default_left().to_vec(),
            is_leaf: tree.leaf_flags().to_vec(),
            leaf_values: tree.leaf_values().to_vec(),
        }
    }
}

impl TreePayload {
    fn into_tree(self) -> Tree {
        Tree::from_parts(
            self.split_features,
            self.thresholds,
            self.left_children,
            self.right_children,
            self.default_left,
            self.is_leaf,
            self.leaf_values,
        )
    }
}

// =============================================================================
// Save / load
// =============================================================================

/// Serialize a model, creating parent directories as needed.
pub fn save_model(model: &BoostedModel, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }

    let payload = Payload::V1(PayloadV1 {
        meta: model.meta().clone(),
        forest: ForestPayload {
            base_score: model.forest().base_score(),
            trees: model.forest().trees().iter().map(TreePayload::from).collect(),
        },
    });
    let bytes = postcard::to_allocvec(&payload)
        .map_err(|e| PipelineError::Model(ModelError::Decode(e)))?;
    std::fs::write(path, &bytes).map_err(|e| PipelineError::io(path, e))?;
    info!(
        path = %path.display(),
        bytes = bytes.len(),
        trees = model.forest().n_trees(),
        "saved model"
    );
    Ok(())
}

/// Load a model saved by [`save_model`].
pub fn load_model(path: impl AsRef<Path>) -> Result<BoostedModel> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| PipelineError::io(path, e))?;
    let payload: Payload =
        postcard::from_bytes(&bytes).map_err(|e| PipelineError::Model(ModelError::Decode(e)))?;

    let Payload::V1(v1) = payload;
    let mut forest = Forest::new(v1.forest.base_score);
    for tree in v1.forest.trees {
        forest.push_tree(tree.into_tree());
    }
    info!(path = %path.display(), trees = forest.n_trees(), "loaded model");
    Ok(BoostedModel::new(forest, v1.meta))
}
