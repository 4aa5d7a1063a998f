//! Feature selection by random-forest importance.
//!
//! Fits an importance forest on the training split, ranks features by score
//! (descending, stable on ties), keeps the top k plus the label, and projects
//! the table onto them in ranking order.

mod forest;

pub use forest::{RandomForest, RandomForestParams};

use tracing::{info, warn};

use crate::data::Frame;
use crate::error::DataError;

/// Selects the top-k features of a labeled table.
pub struct FeatureSelector {
    n_features: usize,
    params: RandomForestParams,
}

impl FeatureSelector {
    pub fn new(n_features: usize) -> Self {
        Self {
            n_features,
            params: RandomForestParams::default(),
        }
    }

    pub fn with_params(n_features: usize, params: RandomForestParams) -> Self {
        Self { n_features, params }
    }

    /// Rank features and project `frame` onto the top k plus the label.
    ///
    /// Returns the reduced table and the full descending ranking.
    pub fn select(
        &self,
        frame: &Frame,
        label: &str,
    ) -> Result<(Frame, Vec<(String, f64)>), DataError> {
        let (features, targets) = frame.split_label(label)?;
        let (names, matrix) = features.to_matrix()?;
        if names.is_empty() {
            return Err(DataError::NoFeaturesLeft);
        }

        let forest = RandomForest::fit(matrix.view(), targets.view(), &self.params)?;
        let mut ranking: Vec<(String, f64)> = names
            .into_iter()
            .zip(forest.importances().iter().copied())
            .collect();
        // Stable sort: equal scores keep their original column order.
        ranking.sort_by(|a, b| b.1.total_cmp(&a.1));

        let k = self.n_features.min(ranking.len());
        if k < self.n_features {
            warn!(
                requested = self.n_features,
                available = ranking.len(),
                "fewer features available than requested"
            );
        }

        let mut selected: Vec<String> =
            ranking.iter().take(k).map(|(name, _)| name.clone()).collect();
        info!(features = %selected.join(", "), "selected features");
        selected.push(label.to_string());

        let reduced = frame.select_columns(&selected)?;
        Ok((reduced, ranking))
    }
}
