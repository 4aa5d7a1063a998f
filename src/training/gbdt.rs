//! Gradient-boosted decision trees, exact greedy training.
//!
//! Depth-wise growth over feature-major matrices. Split quality is the usual
//! second-order gain; leaf values are `−G/(H+λ)` scaled by the learning rate.
//! Training has no row or column sampling, so a fixed configuration is fully
//! deterministic.

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ModelError;
use crate::repr::{Forest, NodeId, Tree, TreeBuilder};
use crate::training::objective::{GradsPair, LogisticLoss};
use crate::utils::Parallelism;

// =============================================================================
// GbdtParams
// =============================================================================

/// Hyperparameters for boosted-tree training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbdtParams {
    /// Number of boosting rounds (trees).
    pub n_trees: u32,
    /// Shrinkage applied to every leaf value.
    pub learning_rate: f32,
    /// Maximum tree depth.
    pub max_depth: u32,
    /// Minimum hessian sum required on each side of a split.
    pub min_child_weight: f32,
    /// L2 regularization on leaf values.
    pub reg_lambda: f32,
    /// Minimum gain required to keep a split.
    pub min_gain: f32,
}

impl Default for GbdtParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            min_gain: 0.0,
        }
    }
}

// =============================================================================
// GbdtTrainer
// =============================================================================

/// Trains a [`Forest`] with the logistic objective.
pub struct GbdtTrainer {
    objective: LogisticLoss,
    params: GbdtParams,
}

struct SplitCandidate {
    feature: usize,
    threshold: f32,
    gain: f64,
}

impl GbdtTrainer {
    pub fn new(params: GbdtParams) -> Self {
        Self {
            objective: LogisticLoss,
            params,
        }
    }

    pub fn params(&self) -> &GbdtParams {
        &self.params
    }

    /// Train a forest on feature-major `features` against {0, 1} targets.
    pub fn train(
        &self,
        features: ArrayView2<f32>,
        targets: ArrayView1<f32>,
        parallelism: Parallelism,
    ) -> Result<Forest, ModelError> {
        let n_samples = features.ncols();
        let n_features = features.nrows();
        if n_samples == 0 || n_features == 0 {
            return Err(ModelError::InvalidTrainingInput {
                reason: format!("empty training data ({n_features} features, {n_samples} rows)"),
            });
        }
        if targets.len() != n_samples {
            return Err(ModelError::InvalidTrainingInput {
                reason: format!(
                    "targets have {} rows, features have {n_samples}",
                    targets.len()
                ),
            });
        }
        if self.params.n_trees == 0 || self.params.learning_rate <= 0.0 {
            return Err(ModelError::InvalidTrainingInput {
                reason: "n_trees must be >= 1 and learning_rate positive".to_string(),
            });
        }

        let base = self.objective.base_score(targets);
        let mut margins = Array1::from_elem(n_samples, base);
        let mut grad_hess = vec![GradsPair::default(); n_samples];
        let mut forest = Forest::new(base);

        for round in 0..self.params.n_trees {
            self.objective
                .compute_gradients(margins.view(), targets, &mut grad_hess);
            let tree = self.grow_tree(features, &grad_hess, parallelism);
            for (sample, margin) in margins.iter_mut().enumerate() {
                *margin += tree.predict_row(|f| features[[f, sample]]);
            }
            debug!(round, leaves = tree.n_leaves(), "boosting round");
            forest.push_tree(tree);
        }
        Ok(forest)
    }

    fn grow_tree(
        &self,
        features: ArrayView2<f32>,
        grad_hess: &[GradsPair],
        parallelism: Parallelism,
    ) -> Tree {
        let mut builder = TreeBuilder::new();
        let indices: Vec<u32> = (0..features.ncols() as u32).collect();
        self.grow_node(features, grad_hess, indices, 0, &mut builder, parallelism);
        builder.build()
    }

    fn grow_node(
        &self,
        features: ArrayView2<f32>,
        grad_hess: &[GradsPair],
        indices: Vec<u32>,
        depth: u32,
        builder: &mut TreeBuilder,
        parallelism: Parallelism,
    ) -> NodeId {
        let (g_sum, h_sum) = sums(grad_hess, &indices);
        if depth >= self.params.max_depth || indices.len() < 2 {
            return builder.push_leaf(self.leaf_value(g_sum, h_sum));
        }

        let Some(split) = self.find_split(features, grad_hess, &indices, g_sum, h_sum, parallelism)
        else {
            return builder.push_leaf(self.leaf_value(g_sum, h_sum));
        };

        let node = builder.push_split(split.feature as u32, split.threshold, true);
        let (left_idx, right_idx): (Vec<u32>, Vec<u32>) = indices.into_iter().partition(|&i| {
            let v = features[[split.feature, i as usize]];
            v.is_nan() || v < split.threshold
        });
        let left = self.grow_node(features, grad_hess, left_idx, depth + 1, builder, parallelism);
        let right = self.grow_node(features, grad_hess, right_idx, depth + 1, builder, parallelism);
        builder.set_children(node, left, right);
        node
    }

    fn leaf_value(&self, g_sum: f64, h_sum: f64) -> f32 {
        let value = -g_sum / (h_sum + self.params.reg_lambda as f64);
        value as f32 * self.params.learning_rate
    }

    fn find_split(
        &self,
        features: ArrayView2<f32>,
        grad_hess: &[GradsPair],
        indices: &[u32],
        g_sum: f64,
        h_sum: f64,
        parallelism: Parallelism,
    ) -> Option<SplitCandidate> {
        let lambda = self.params.reg_lambda as f64;
        let parent_score = g_sum * g_sum / (h_sum + lambda);

        let candidates = parallelism.maybe_par_map(0..features.nrows(), |feature| {
            self.best_split_for_feature(features, grad_hess, indices, feature, g_sum, h_sum, parent_score)
        });

        // First strictly-better candidate wins: tie-break by feature index.
        let mut best: Option<SplitCandidate> = None;
        for candidate in candidates.into_iter().flatten() {
            if best.as_ref().is_none_or(|b| candidate.gain > b.gain) {
                best = Some(candidate);
            }
        }
        best.filter(|b| b.gain > 0.0)
    }

    #[allow(clippy::too_many_arguments)]
    fn best_split_for_feature(
        &self,
        features: ArrayView2<f32>,
        grad_hess: &[GradsPair],
        indices: &[u32],
        feature: usize,
        g_sum: f64,
        h_sum: f64,
        parent_score: f64,
    ) -> Option<SplitCandidate> {
        let lambda = self.params.reg_lambda as f64;
        let min_child = self.params.min_child_weight as f64;

        // Missing values ride along on the left of every candidate split.
        let mut nan_g = 0.0f64;
        let mut nan_h = 0.0f64;
        let mut valued: Vec<(f32, f32, f32)> = Vec::with_capacity(indices.len());
        for &i in indices {
            let v = features[[feature, i as usize]];
            let pair = grad_hess[i as usize];
            if v.is_nan() {
                nan_g += pair.grad as f64;
                nan_h += pair.hess as f64;
            } else {
                valued.push((v, pair.grad, pair.hess));
            }
        }
        if valued.len() < 2 {
            return None;
        }
        valued.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut gl = nan_g;
        let mut hl = nan_h;
        let mut best: Option<SplitCandidate> = None;
        for window in 0..valued.len() - 1 {
            let (value, grad, hess) = valued[window];
            gl += grad as f64;
            hl += hess as f64;
            let next_value = valued[window + 1].0;
            if value == next_value {
                continue;
            }

            let gr = g_sum - gl;
            let hr = h_sum - hl;
            if hl < min_child || hr < min_child {
                continue;
            }

            let gain = 0.5 * (gl * gl / (hl + lambda) + gr * gr / (hr + lambda) - parent_score)
                - self.params.min_gain as f64;
            if best.as_ref().is_none_or(|b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: (value + next_value) * 0.5,
                    gain,
                });
            }
        }
        best
    }
}

fn sums(grad_hess: &[GradsPair], indices: &[u32]) -> (f64, f64) {
    indices.iter().fold((0.0, 0.0), |(g, h), &i| {
        let pair = grad_hess[i as usize];
        (g + pair.grad as f64, h + pair.hess as f64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::LogisticLoss;
    use ndarray::{Array2, array};

    /// 1 feature, perfectly separable at x = 5.
    fn separable() -> (Array2<f32>, Array1<f32>) {
        let features = array![[0.0, 1.0, 2.0, 3.0, 4.0, 6.0, 7.0, 8.0, 9.0, 10.0]];
        let targets = array![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        (features, targets)
    }

    fn probabilities(forest: &Forest, features: &Array2<f32>) -> Array1<f32> {
        let margins = forest.predict_margin(features.view(), Parallelism::Sequential);
        LogisticLoss.transform_predictions(margins.view())
    }

    #[test]
    fn default_params() {
        let params = GbdtParams::default();
        assert_eq!(params.n_trees, 100);
        assert!((params.learning_rate - 0.3).abs() < 1e-6);
        assert_eq!(params.max_depth, 6);
    }

    #[test]
    fn learns_a_separable_boundary() {
        let (features, targets) = separable();
        let params = GbdtParams {
            n_trees: 20,
            min_child_weight: 0.5,
            ..Default::default()
        };
        let forest = GbdtTrainer::new(params)
            .train(features.view(), targets.view(), Parallelism::Sequential)
            .unwrap();
        assert_eq!(forest.n_trees(), 20);

        let probs = probabilities(&forest, &features);
        for (i, &p) in probs.iter().enumerate() {
            if targets[i] > 0.5 {
                assert!(p > 0.5, "sample {i} should be positive, got {p}");
            } else {
                assert!(p < 0.5, "sample {i} should be negative, got {p}");
            }
        }
    }

    #[test]
    fn training_is_deterministic() {
        let (features, targets) = separable();
        let trainer = GbdtTrainer::new(GbdtParams {
            n_trees: 5,
            ..Default::default()
        });
        let a = trainer
            .train(features.view(), targets.view(), Parallelism::Sequential)
            .unwrap();
        let b = trainer
            .train(features.view(), targets.view(), Parallelism::Parallel)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn homogeneous_targets_grow_no_splits() {
        let features = array![[1.0, 2.0, 3.0, 4.0]];
        let targets = array![1.0, 1.0, 1.0, 1.0];
        let forest = GbdtTrainer::new(GbdtParams {
            n_trees: 2,
            ..Default::default()
        })
        .train(features.view(), targets.view(), Parallelism::Sequential)
        .unwrap();

        for tree in forest.trees() {
            assert_eq!(tree.n_nodes(), 1, "pure targets should stay a single leaf");
        }
    }

    #[test]
    fn nan_values_are_routed_left() {
        let features = array![[f32::NAN, 1.0, 2.0, 9.0, 10.0, 11.0]];
        let targets = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let forest = GbdtTrainer::new(GbdtParams {
            n_trees: 10,
            min_child_weight: 0.1,
            ..Default::default()
        })
        .train(features.view(), targets.view(), Parallelism::Sequential)
        .unwrap();

        let probs = probabilities(&forest, &features);
        // The NaN sample shares the left (negative) side.
        assert!(probs[0] < 0.5);
        assert!(probs[5] > 0.5);
    }

    #[test]
    fn empty_input_is_rejected() {
        let features = Array2::<f32>::zeros((0, 0));
        let targets = Array1::<f32>::zeros(0);
        let err = GbdtTrainer::new(GbdtParams::default())
            .train(features.view(), targets.view(), Parallelism::Sequential)
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidTrainingInput { .. }));
    }

    #[test]
    fn mismatched_targets_are_rejected() {
        let features = array![[1.0, 2.0, 3.0]];
        let targets = array![0.0, 1.0];
        let err = GbdtTrainer::new(GbdtParams::default())
            .train(features.view(), targets.view(), Parallelism::Sequential)
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidTrainingInput { .. }));
    }

    #[test]
    fn max_depth_bounds_tree_size() {
        let (features, targets) = separable();
        let forest = GbdtTrainer::new(GbdtParams {
            n_trees: 1,
            max_depth: 1,
            min_child_weight: 0.1,
            ..Default::default()
        })
        .train(features.view(), targets.view(), Parallelism::Sequential)
        .unwrap();
        // Depth 1 = one split, two leaves.
        assert!(forest.trees()[0].n_nodes() <= 3);
    }
}
