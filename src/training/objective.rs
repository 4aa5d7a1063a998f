//! Binary logistic objective.
//!
//! The trainer works in margin (log-odds) space:
//! - gradient: `σ(pred) − y`
//! - hessian: `σ(pred)·(1 − σ(pred))`, clamped away from zero
//! - base score: log-odds of the positive rate

use ndarray::{Array1, ArrayView1};

/// One sample's gradient/hessian pair.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GradsPair {
    pub grad: f32,
    pub hess: f32,
}

/// Logistic loss (binary cross-entropy) over {0, 1} labels.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogisticLoss;

impl LogisticLoss {
    const HESS_MIN: f32 = 1e-6;

    #[inline]
    pub fn sigmoid(x: f32) -> f32 {
        1.0 / (1.0 + (-x).exp())
    }

    /// Fill `grad_hess` from current margins and targets.
    pub fn compute_gradients(
        &self,
        margins: ArrayView1<f32>,
        targets: ArrayView1<f32>,
        grad_hess: &mut [GradsPair],
    ) {
        debug_assert_eq!(margins.len(), targets.len());
        debug_assert_eq!(margins.len(), grad_hess.len());

        for ((pair, &m), &t) in grad_hess.iter_mut().zip(margins).zip(targets) {
            let p = Self::sigmoid(m);
            pair.grad = p - t;
            pair.hess = (p * (1.0 - p)).max(Self::HESS_MIN);
        }
    }

    /// Log-odds of the positive rate, the margin every sample starts from.
    pub fn base_score(&self, targets: ArrayView1<f32>) -> f32 {
        if targets.is_empty() {
            return 0.0;
        }
        let pos = targets.iter().map(|&t| t as f64).sum::<f64>();
        let p = (pos / targets.len() as f64).clamp(1e-7, 1.0 - 1e-7);
        (p / (1.0 - p)).ln() as f32
    }

    /// Map raw margins to probabilities.
    pub fn transform_predictions(&self, margins: ArrayView1<f32>) -> Array1<f32> {
        margins.mapv(Self::sigmoid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn sigmoid_midpoint_and_tails() {
        assert_abs_diff_eq!(LogisticLoss::sigmoid(0.0), 0.5);
        assert!(LogisticLoss::sigmoid(10.0) > 0.999);
        assert!(LogisticLoss::sigmoid(-10.0) < 0.001);
    }

    #[test]
    fn gradients_point_towards_targets() {
        let margins = array![0.0, 0.0];
        let targets = array![1.0, 0.0];
        let mut pairs = vec![GradsPair::default(); 2];
        LogisticLoss.compute_gradients(margins.view(), targets.view(), &mut pairs);

        // p = 0.5 on both: grad = p - y.
        assert_abs_diff_eq!(pairs[0].grad, -0.5);
        assert_abs_diff_eq!(pairs[1].grad, 0.5);
        assert_abs_diff_eq!(pairs[0].hess, 0.25);
    }

    #[test]
    fn hessian_never_reaches_zero() {
        let margins = array![40.0];
        let targets = array![1.0];
        let mut pairs = vec![GradsPair::default(); 1];
        LogisticLoss.compute_gradients(margins.view(), targets.view(), &mut pairs);
        assert!(pairs[0].hess >= 1e-6);
    }

    #[test]
    fn base_score_matches_log_odds() {
        // 3 positives out of 4: ln(0.75 / 0.25) = ln 3.
        let targets = array![1.0, 1.0, 1.0, 0.0];
        assert_abs_diff_eq!(
            LogisticLoss.base_score(targets.view()),
            3.0f32.ln(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn base_score_balanced_is_zero() {
        let targets = array![1.0, 0.0, 1.0, 0.0];
        assert_abs_diff_eq!(LogisticLoss.base_score(targets.view()), 0.0);
    }
}
