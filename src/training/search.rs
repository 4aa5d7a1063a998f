//! Randomized hyperparameter search with k-fold cross-validation.
//!
//! Candidates are sampled upfront from the parameter space with a seeded RNG,
//! so the iteration order is fixed; every candidate is scored by shuffled
//! k-fold cross-validation and the first best score wins ties. The winner is
//! refitted on the full training split.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ModelError;
use crate::repr::Forest;
use crate::training::gbdt::{GbdtParams, GbdtTrainer};
use crate::training::metrics::{DEFAULT_THRESHOLD, Scoring, evaluate_binary};
use crate::training::objective::LogisticLoss;
use crate::utils::Parallelism;

// =============================================================================
// Parameter space
// =============================================================================

/// Inclusive integer range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntRange {
    pub low: u32,
    pub high: u32,
}

impl IntRange {
    fn sample(&self, rng: &mut impl Rng) -> u32 {
        rng.random_range(self.low..=self.high)
    }
}

/// Uniform float range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FloatRange {
    pub low: f32,
    pub high: f32,
}

impl FloatRange {
    fn sample(&self, rng: &mut impl Rng) -> f32 {
        self.low + rng.random::<f32>() * (self.high - self.low)
    }
}

/// Distributions for every searched hyperparameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamSpace {
    pub n_trees: IntRange,
    pub max_depth: IntRange,
    pub learning_rate: FloatRange,
    pub min_child_weight: FloatRange,
    pub reg_lambda: FloatRange,
}

impl ParamSpace {
    /// Draw one parameter set. Field order is fixed, so a fixed RNG stream
    /// yields a fixed candidate sequence.
    pub fn sample(&self, rng: &mut impl Rng) -> GbdtParams {
        GbdtParams {
            n_trees: self.n_trees.sample(rng),
            max_depth: self.max_depth.sample(rng),
            learning_rate: self.learning_rate.sample(rng),
            min_child_weight: self.min_child_weight.sample(rng),
            reg_lambda: self.reg_lambda.sample(rng),
            min_gain: 0.0,
        }
    }

    /// Reject inverted or degenerate ranges.
    pub fn validate(&self) -> Result<(), String> {
        if self.n_trees.low == 0 {
            return Err("space.n_trees.low must be at least 1".to_string());
        }
        if self.n_trees.low > self.n_trees.high {
            return Err("space.n_trees range is inverted".to_string());
        }
        if self.max_depth.low == 0 || self.max_depth.low > self.max_depth.high {
            return Err("space.max_depth range is invalid".to_string());
        }
        for (name, range) in [
            ("learning_rate", &self.learning_rate),
            ("min_child_weight", &self.min_child_weight),
            ("reg_lambda", &self.reg_lambda),
        ] {
            if !(range.low <= range.high) {
                return Err(format!("space.{name} range is inverted"));
            }
        }
        if self.learning_rate.low <= 0.0 {
            return Err("space.learning_rate.low must be positive".to_string());
        }
        if self.reg_lambda.low < 0.0 || self.min_child_weight.low < 0.0 {
            return Err("space regularization ranges must be non-negative".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Randomized search
// =============================================================================

/// Result of one search: the winning configuration and its refitted forest.
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub best_params: GbdtParams,
    pub best_score: f64,
    pub forest: Forest,
    /// (candidate, mean CV score) in evaluation order.
    pub evaluated: Vec<(GbdtParams, f64)>,
}

/// Randomized search settings.
#[derive(Debug, Clone)]
pub struct RandomizedSearch {
    pub n_iter: usize,
    pub cv: usize,
    pub seed: u64,
    pub scoring: Scoring,
    /// 0 keeps per-candidate results at debug level.
    pub verbose: usize,
}

impl RandomizedSearch {
    /// Run the search and refit the best candidate on the full split.
    pub fn run(
        &self,
        features: ArrayView2<f32>,
        targets: ArrayView1<f32>,
        space: &ParamSpace,
        parallelism: Parallelism,
    ) -> Result<SearchReport, ModelError> {
        let n_samples = features.ncols();
        if self.cv < 2 || n_samples < self.cv {
            return Err(ModelError::InvalidTrainingInput {
                reason: format!("{n_samples} samples cannot be split into {} folds", self.cv),
            });
        }

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        let candidates: Vec<GbdtParams> =
            (0..self.n_iter).map(|_| space.sample(&mut rng)).collect();
        let folds = k_fold(n_samples, self.cv, self.seed);

        let mut evaluated = Vec::with_capacity(candidates.len());
        let mut best: Option<(usize, f64)> = None;
        for (idx, params) in candidates.iter().enumerate() {
            let score = self.cross_validate(features, targets, params, &folds, parallelism)?;
            if self.verbose > 0 {
                info!(
                    candidate = idx,
                    score = %format!("{score:.4}"),
                    metric = %self.scoring,
                    "evaluated candidate"
                );
            } else {
                debug!(
                    candidate = idx,
                    score = %format!("{score:.4}"),
                    metric = %self.scoring,
                    "evaluated candidate"
                );
            }
            if score.is_finite() && best.is_none_or(|(_, b)| score > b) {
                best = Some((idx, score));
            }
            evaluated.push((params.clone(), score));
        }

        let (best_idx, best_score) = best.ok_or(ModelError::NoViableCandidate)?;
        let best_params = candidates[best_idx].clone();
        info!(
            candidate = best_idx,
            score = %format!("{best_score:.4}"),
            params = ?best_params,
            "best candidate"
        );

        let forest = GbdtTrainer::new(best_params.clone()).train(features, targets, parallelism)?;
        Ok(SearchReport {
            best_params,
            best_score,
            forest,
            evaluated,
        })
    }

    /// Mean validation score of one candidate across all folds.
    fn cross_validate(
        &self,
        features: ArrayView2<f32>,
        targets: ArrayView1<f32>,
        params: &GbdtParams,
        folds: &[Vec<usize>],
        parallelism: Parallelism,
    ) -> Result<f64, ModelError> {
        let all: Vec<usize> = (0..features.ncols()).collect();
        let scores = parallelism.maybe_par_map(folds, |valid_idx| {
            let train_idx: Vec<usize> = all
                .iter()
                .copied()
                .filter(|i| !valid_idx.contains(i))
                .collect();

            let train_x = gather_columns(features, &train_idx);
            let train_y = gather_values(targets, &train_idx);
            let valid_x = gather_columns(features, valid_idx);
            let valid_y = gather_values(targets, valid_idx);

            // Folds run on the shared pool; the trainer itself stays
            // sequential to avoid nested oversubscription.
            let forest = GbdtTrainer::new(params.clone()).train(
                train_x.view(),
                train_y.view(),
                Parallelism::Sequential,
            )?;
            let margins = forest.predict_margin(valid_x.view(), Parallelism::Sequential);
            let probs = LogisticLoss.transform_predictions(margins.view());
            let metrics = evaluate_binary(probs.view(), valid_y.view(), DEFAULT_THRESHOLD);
            Ok::<f64, ModelError>(self.scoring.score(&metrics))
        });

        let mut total = 0.0;
        for score in scores {
            total += score?;
        }
        Ok(total / folds.len() as f64)
    }
}

/// Shuffled k-fold assignment: deterministic for a fixed seed.
fn k_fold(n_samples: usize, k: usize, seed: u64) -> Vec<Vec<usize>> {
    let mut indices: Vec<usize> = (0..n_samples).collect();
    // Separate stream from candidate sampling so adding candidates does not
    // reshuffle the folds.
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed.wrapping_add(1));
    indices.shuffle(&mut rng);

    let base = n_samples / k;
    let extra = n_samples % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let len = base + usize::from(fold < extra);
        folds.push(indices[start..start + len].to_vec());
        start += len;
    }
    folds
}

/// Gather selected samples (columns) into a new feature-major matrix.
fn gather_columns(features: ArrayView2<f32>, idx: &[usize]) -> Array2<f32> {
    Array2::from_shape_fn((features.nrows(), idx.len()), |(f, j)| {
        features[[f, idx[j]]]
    })
}

fn gather_values(values: ArrayView1<f32>, idx: &[usize]) -> Array1<f32> {
    idx.iter().map(|&i| values[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn space() -> ParamSpace {
        ParamSpace {
            n_trees: IntRange { low: 5, high: 20 },
            max_depth: IntRange { low: 2, high: 4 },
            learning_rate: FloatRange {
                low: 0.1,
                high: 0.4,
            },
            min_child_weight: FloatRange {
                low: 0.1,
                high: 1.0,
            },
            reg_lambda: FloatRange {
                low: 0.0,
                high: 2.0,
            },
        }
    }

    /// Two informative features, 60 samples, separable-ish.
    fn dataset() -> (Array2<f32>, Array1<f32>) {
        let n = 60;
        let mut data = Vec::with_capacity(2 * n);
        // feature 0: class signal with overlap
        for i in 0..n {
            let noise = ((i * 7) % 5) as f32 - 2.0;
            data.push(if i % 2 == 0 { 2.0 } else { 8.0 } + noise * 0.4);
        }
        // feature 1: weak signal
        for i in 0..n {
            data.push(((i * 13) % 11) as f32);
        }
        let features = Array2::from_shape_vec((2, n), data).unwrap();
        let targets: Array1<f32> = (0..n).map(|i| (i % 2) as f32).collect();
        (features, targets)
    }

    #[test]
    fn sampling_is_deterministic_and_in_range() {
        let space = space();
        let mut a = Xoshiro256PlusPlus::seed_from_u64(7);
        let mut b = Xoshiro256PlusPlus::seed_from_u64(7);
        for _ in 0..20 {
            let pa = space.sample(&mut a);
            let pb = space.sample(&mut b);
            assert_eq!(pa, pb);
            assert!((5..=20).contains(&pa.n_trees));
            assert!((2..=4).contains(&pa.max_depth));
            assert!(pa.learning_rate >= 0.1 && pa.learning_rate <= 0.4);
        }
    }

    #[test]
    fn k_fold_partitions_every_sample_once() {
        let folds = k_fold(23, 4, 42);
        assert_eq!(folds.len(), 4);
        let mut all: Vec<usize> = folds.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..23).collect::<Vec<_>>());
        // 23 = 6 + 6 + 6 + 5
        assert_eq!(folds[0].len(), 6);
        assert_eq!(folds[3].len(), 5);
    }

    #[test]
    fn k_fold_is_seed_stable() {
        assert_eq!(k_fold(50, 5, 9), k_fold(50, 5, 9));
        assert_ne!(k_fold(50, 5, 9), k_fold(50, 5, 10));
    }

    #[test]
    fn search_finds_a_working_candidate() {
        let (features, targets) = dataset();
        let search = RandomizedSearch {
            n_iter: 4,
            cv: 3,
            seed: 42,
            scoring: Scoring::Accuracy,
            verbose: 0,
        };
        let report = search
            .run(features.view(), targets.view(), &space(), Parallelism::Sequential)
            .unwrap();
        assert_eq!(report.evaluated.len(), 4);
        assert!(report.best_score > 0.7, "score {}", report.best_score);
        assert!(report.forest.n_trees() >= 5);
    }

    #[test]
    fn search_is_deterministic() {
        let (features, targets) = dataset();
        let search = RandomizedSearch {
            n_iter: 3,
            cv: 2,
            seed: 42,
            scoring: Scoring::F1,
            verbose: 0,
        };
        let a = search
            .run(features.view(), targets.view(), &space(), Parallelism::Sequential)
            .unwrap();
        let b = search
            .run(features.view(), targets.view(), &space(), Parallelism::Parallel)
            .unwrap();
        assert_eq!(a.best_params, b.best_params);
        assert_eq!(a.best_score, b.best_score);
        assert_eq!(a.forest, b.forest);
    }

    #[test]
    fn too_many_folds_is_rejected() {
        let (features, targets) = dataset();
        let search = RandomizedSearch {
            n_iter: 2,
            cv: 100,
            seed: 1,
            scoring: Scoring::Accuracy,
            verbose: 0,
        };
        let err = search
            .run(features.view(), targets.view(), &space(), Parallelism::Sequential)
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidTrainingInput { .. }));
    }

    #[test]
    fn validate_rejects_inverted_ranges() {
        let mut bad = space();
        bad.learning_rate = FloatRange {
            low: 0.5,
            high: 0.1,
        };
        assert!(bad.validate().is_err());
        assert!(space().validate().is_ok());
    }
}
