//! Binary classification metrics.
//!
//! Predictions are probabilities; a fixed threshold turns them into classes.
//! Zero-denominator cases (no predicted positives, no actual positives)
//! score 0.0.

use std::collections::BTreeMap;
use std::fmt;

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Classification threshold used throughout the pipeline.
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// The four metrics reported for every run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl Metrics {
    /// Name → value mapping for experiment tracking.
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("accuracy", self.accuracy),
            ("precision", self.precision),
            ("recall", self.recall),
            ("f1", self.f1),
        ])
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "accuracy={:.4} precision={:.4} recall={:.4} f1={:.4}",
            self.accuracy, self.precision, self.recall, self.f1
        )
    }
}

/// Evaluate probabilities against {0, 1} targets at `threshold`.
pub fn evaluate_binary(
    probabilities: ArrayView1<f32>,
    targets: ArrayView1<f32>,
    threshold: f32,
) -> Metrics {
    debug_assert_eq!(probabilities.len(), targets.len());

    let (mut tp, mut fp, mut tn, mut fn_) = (0u64, 0u64, 0u64, 0u64);
    for (&p, &t) in probabilities.iter().zip(targets) {
        let predicted = p >= threshold;
        let actual = t >= 0.5;
        match (predicted, actual) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, false) => tn += 1,
            (false, true) => fn_ += 1,
        }
    }

    let total = (tp + fp + tn + fn_) as f64;
    let accuracy = if total > 0.0 {
        (tp + tn) as f64 / total
    } else {
        0.0
    };
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Metrics {
        accuracy,
        precision,
        recall,
        f1,
    }
}

fn ratio(num: u64, denom: u64) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

/// Metric used to rank search candidates. Higher is better for all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scoring {
    Accuracy,
    Precision,
    Recall,
    F1,
}

impl Scoring {
    pub fn score(&self, metrics: &Metrics) -> f64 {
        match self {
            Scoring::Accuracy => metrics.accuracy,
            Scoring::Precision => metrics.precision,
            Scoring::Recall => metrics.recall,
            Scoring::F1 => metrics.f1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scoring::Accuracy => "accuracy",
            Scoring::Precision => "precision",
            Scoring::Recall => "recall",
            Scoring::F1 => "f1",
        }
    }
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
