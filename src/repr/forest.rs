//! Additive forest over SoA trees.

use ndarray::{Array1, ArrayView2};

use crate::repr::Tree;
use crate::utils::Parallelism;

/// Sum-of-trees model: margin = base score + Σ tree outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    trees: Vec<Tree>,
    base_score: f32,
}

impl Forest {
    pub fn new(base_score: f32) -> Self {
        Self {
            trees: Vec::new(),
            base_score,
        }
    }

    pub fn push_tree(&mut self, tree: Tree) {
        self.trees.push(tree);
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn base_score(&self) -> f32 {
        self.base_score
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Raw margin for every sample.
    ///
    /// `features` is feature-major `[n_features, n_samples]`.
    pub fn predict_margin(
        &self,
        features: ArrayView2<f32>,
        parallelism: Parallelism,
    ) -> Array1<f32> {
        let n_samples = features.ncols();
        let margins = parallelism.maybe_par_map(0..n_samples, |sample| {
            let mut margin = self.base_score;
            for tree in &self.trees {
                margin += tree.predict_row(|f| features[[f, sample]]);
            }
            margin
        });
        Array1::from(margins)
    }
}
