//! Random forest used for feature-importance ranking.
//!
//! Gini CART trees over bootstrap samples with √m feature subsets per split.
//! Importance is mean impurity decrease: per-node decreases accumulate on the
//! split feature, are normalized per tree, and averaged over the forest.

use ndarray::{ArrayView1, ArrayView2};
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::error::DataError;
use crate::repr::{NodeId, Tree, TreeBuilder};

/// Forest-fitting parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomForestParams {
    pub n_trees: usize,
    pub max_depth: u32,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 16,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

/// A fitted importance forest.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<Tree>,
    importances: Vec<f64>,
}

impl RandomForest {
    /// Fit on feature-major `features` against categorical labels.
    pub fn fit(
        features: ArrayView2<f32>,
        labels: ArrayView1<f32>,
        params: &RandomForestParams,
    ) -> Result<Self, DataError> {
        let n_features = features.nrows();
        let n_samples = features.ncols();
        if n_samples == 0 {
            return Err(DataError::EmptyTable);
        }
        if n_features == 0 {
            return Err(DataError::NoFeaturesLeft);
        }

        // Map labels onto dense class indices in ascending label order.
        let mut distinct: Vec<f32> = Vec::new();
        for &l in labels.iter() {
            if !distinct.iter().any(|&d| d == l) {
                distinct.push(l);
            }
        }
        distinct.sort_by(f32::total_cmp);
        let classes: Vec<u32> = labels
            .iter()
            .map(|&l| {
                distinct
                    .iter()
                    .position(|&d| d == l)
                    .expect("label collected above") as u32
            })
            .collect();
        let n_classes = distinct.len();

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(params.seed);
        let mut totals = vec![0.0f64; n_features];
        let mut trees = Vec::with_capacity(params.n_trees);

        for _ in 0..params.n_trees {
            let bootstrap: Vec<u32> = (0..n_samples)
                .map(|_| rng.random_range(0..n_samples) as u32)
                .collect();
            let mut grower = TreeGrower {
                features,
                classes: &classes,
                n_classes,
                params,
                n_total: bootstrap.len(),
                importances: vec![0.0f64; n_features],
            };
            let mut builder = TreeBuilder::new();
            grower.grow(&mut builder, bootstrap, 0, &mut rng);
            trees.push(builder.build());

            let sum: f64 = grower.importances.iter().sum();
            if sum > 0.0 {
                for (total, value) in totals.iter_mut().zip(&grower.importances) {
                    *total += value / sum;
                }
            }
        }

        let mut importances: Vec<f64> = totals
            .into_iter()
            .map(|v| v / params.n_trees as f64)
            .collect();
        let sum: f64 = importances.iter().sum();
        if sum > 0.0 {
            for value in &mut importances {
                *value /= sum;
            }
        }

        Ok(Self { trees, importances })
    }

    /// Normalized per-feature importance, summing to 1 when any split exists.
    pub fn importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }
}

// =============================================================================
// Tree growing
// =============================================================================

struct TreeGrower<'f, 'c, 'p> {
    features: ArrayView2<'f, f32>,
    classes: &'c [u32],
    n_classes: usize,
    params: &'p RandomForestParams,
    n_total: usize,
    importances: Vec<f64>,
}

struct GiniSplit {
    feature: usize,
    threshold: f32,
    decrease: f64,
}

impl TreeGrower<'_, '_, '_> {
    fn grow(
        &mut self,
        builder: &mut TreeBuilder,
        indices: Vec<u32>,
        depth: u32,
        rng: &mut Xoshiro256PlusPlus,
    ) -> NodeId {
        let counts = self.class_counts(&indices);
        let node_gini = gini(&counts, indices.len());

        let stop = depth >= self.params.max_depth
            || indices.len() < self.params.min_samples_split
            || node_gini == 0.0;
        if stop {
            return builder.push_leaf(majority_class(&counts));
        }

        let Some(split) = self.find_split(&indices, node_gini, rng) else {
            return builder.push_leaf(majority_class(&counts));
        };

        self.importances[split.feature] += split.decrease;
        let node = builder.push_split(split.feature as u32, split.threshold, true);
        let (left_idx, right_idx): (Vec<u32>, Vec<u32>) = indices.into_iter().partition(|&i| {
            let v = self.features[[split.feature, i as usize]];
            v.is_nan() || v < split.threshold
        });
        let left = self.grow(builder, left_idx, depth + 1, rng);
        let right = self.grow(builder, right_idx, depth + 1, rng);
        builder.set_children(node, left, right);
        node
    }

    fn class_counts(&self, indices: &[u32]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in indices {
            counts[self.classes[i as usize] as usize] += 1;
        }
        counts
    }

    fn find_split(
        &self,
        indices: &[u32],
        node_gini: f64,
        rng: &mut Xoshiro256PlusPlus,
    ) -> Option<GiniSplit> {
        let n_features = self.features.nrows();
        let n_sub = ((n_features as f64).sqrt().floor() as usize).clamp(1, n_features);
        let mut subset: Vec<usize> = index::sample(rng, n_features, n_sub).into_vec();
        subset.sort_unstable();

        let n_node = indices.len();
        let mut best: Option<GiniSplit> = None;
        for feature in subset {
            // NaN rows stay on the left of every candidate threshold.
            let mut left_counts = vec![0usize; self.n_classes];
            let mut n_left_base = 0usize;
            let mut valued: Vec<(f32, u32)> = Vec::with_capacity(n_node);
            for &i in indices {
                let v = self.features[[feature, i as usize]];
                let class = self.classes[i as usize];
                if v.is_nan() {
                    left_counts[class as usize] += 1;
                    n_left_base += 1;
                } else {
                    valued.push((v, class));
                }
            }
            if valued.len() < 2 {
                continue;
            }
            valued.sort_by(|a, b| a.0.total_cmp(&b.0));

            let total_counts = self.class_counts(indices);
            let mut n_left = n_left_base;
            for window in 0..valued.len() - 1 {
                let (value, class) = valued[window];
                left_counts[class as usize] += 1;
                n_left += 1;
                if value == valued[window + 1].0 {
                    continue;
                }
                let n_right = n_node - n_left;
                if n_right == 0 {
                    break;
                }

                let right_counts: Vec<usize> = total_counts
                    .iter()
                    .zip(&left_counts)
                    .map(|(&t, &l)| t - l)
                    .collect();
                let weighted = (n_left as f64 * gini(&left_counts, n_left)
                    + n_right as f64 * gini(&right_counts, n_right))
                    / n_node as f64;
                let decrease = (n_node as f64 / self.n_total as f64) * (node_gini - weighted);
                if decrease > 0.0 && best.as_ref().is_none_or(|b| decrease > b.decrease) {
                    best = Some(GiniSplit {
                        feature,
                        threshold: (value + valued[window + 1].0) * 0.5,
                        decrease,
                    });
                }
            }
        }
        best
    }
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let nf = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / nf;
            p * p
        })
        .sum::<f64>()
}

fn majority_class(counts: &[usize]) -> f32 {
    counts
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
        .map(|(class, _)| class as f32)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    /// Feature 0 decides the class; features 1 and 2 are noise.
    fn informative_dataset() -> (Array2<f32>, Array1<f32>) {
        let n = 80;
        let mut data = Vec::with_capacity(3 * n);
        for i in 0..n {
            data.push(if i % 2 == 0 { 1.0 } else { 10.0 });
        }
        for i in 0..n {
            data.push(((i * 17) % 13) as f32);
        }
        for i in 0..n {
            data.push(((i * 29) % 7) as f32);
        }
        let features = Array2::from_shape_vec((3, n), data).unwrap();
        let labels: Array1<f32> = (0..n).map(|i| (i % 2) as f32).collect();
        (features, labels)
    }

    #[test]
    fn informative_feature_dominates() {
        let (features, labels) = informative_dataset();
        let forest = RandomForest::fit(
            features.view(),
            labels.view(),
            &RandomForestParams::default(),
        )
        .unwrap();

        let imp = forest.importances();
        assert_eq!(imp.len(), 3);
        assert!(
            imp[0] > imp[1] && imp[0] > imp[2],
            "importances: {imp:?}"
        );
        let sum: f64 = imp.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fit_is_deterministic() {
        let (features, labels) = informative_dataset();
        let params = RandomForestParams {
            n_trees: 20,
            ..Default::default()
        };
        let a = RandomForest::fit(features.view(), labels.view(), &params).unwrap();
        let b = RandomForest::fit(features.view(), labels.view(), &params).unwrap();
        assert_eq!(a.importances(), b.importances());
        assert_eq!(a.trees(), b.trees());
    }

    #[test]
    fn builds_the_requested_number_of_trees() {
        let (features, labels) = informative_dataset();
        let params = RandomForestParams {
            n_trees: 7,
            ..Default::default()
        };
        let forest = RandomForest::fit(features.view(), labels.view(), &params).unwrap();
        assert_eq!(forest.n_trees(), 7);
    }

    #[test]
    fn empty_input_is_rejected() {
        let features = Array2::<f32>::zeros((2, 0));
        let labels = Array1::<f32>::zeros(0);
        let err = RandomForest::fit(
            features.view(),
            labels.view(),
            &RandomForestParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DataError::EmptyTable));
    }

    #[test]
    fn gini_values() {
        assert_eq!(gini(&[4, 0], 4), 0.0);
        assert!((gini(&[2, 2], 4) - 0.5).abs() < 1e-12);
        assert!((gini(&[1, 1, 1], 3) - (1.0 - 3.0 * (1.0f64 / 9.0))).abs() < 1e-12);
    }

    #[test]
    fn majority_breaks_ties_towards_lower_class() {
        assert_eq!(majority_class(&[3, 3]), 0.0);
        assert_eq!(majority_class(&[1, 4]), 1.0);
    }
}
