//! Class balancing via synthetic minority oversampling (SMOTE).
//!
//! Every non-majority class is oversampled to the majority count. A synthetic
//! row interpolates between a random class member and one of its k nearest
//! same-class neighbours. Original rows pass through unchanged and in order;
//! synthetic rows are appended.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::info;

use crate::data::{Column, ColumnValues, Frame};
use crate::error::DataError;

/// SMOTE oversampler.
#[derive(Debug, Clone)]
pub struct Smote {
    /// Neighbours considered for interpolation.
    pub k_neighbors: usize,
    /// RNG seed; fixed seed gives identical synthetic rows.
    pub seed: u64,
}

impl Default for Smote {
    fn default() -> Self {
        Self {
            k_neighbors: 5,
            seed: 42,
        }
    }
}

impl Smote {
    pub fn new(k_neighbors: usize, seed: u64) -> Self {
        Self { k_neighbors, seed }
    }

    /// Oversample every minority class of `label` up to the majority count.
    pub fn balance(&self, frame: &Frame, label: &str) -> Result<Frame, DataError> {
        if frame.n_rows() == 0 {
            return Err(DataError::EmptyTable);
        }
        let (features, targets) = frame.split_label(label)?;
        let (_, matrix) = features.to_matrix()?;
        let n_features = matrix.nrows();

        // Classes in ascending label order for a deterministic pass.
        let mut classes: Vec<f32> = Vec::new();
        for &t in targets.iter() {
            if !classes.iter().any(|&c| c == t) {
                classes.push(t);
            }
        }
        classes.sort_by(f32::total_cmp);
        if classes.len() < 2 {
            return Err(DataError::InsufficientClasses {
                found: classes.len(),
            });
        }

        let members: Vec<Vec<usize>> = classes
            .iter()
            .map(|&c| {
                targets
                    .iter()
                    .enumerate()
                    .filter(|&(_, &t)| t == c)
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();
        let majority = members.iter().map(Vec::len).max().expect("classes checked");

        for (&class, rows) in classes.iter().zip(&members) {
            if rows.len() < majority && rows.len() < self.k_neighbors + 1 {
                return Err(DataError::TooFewClassSamples {
                    label: class,
                    count: rows.len(),
                    required: self.k_neighbors + 1,
                });
            }
        }

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        let mut synth_rows: Vec<Vec<f32>> = Vec::new();
        let mut synth_labels: Vec<f32> = Vec::new();

        for (&class, rows) in classes.iter().zip(&members) {
            let needed = majority - rows.len();
            if needed == 0 {
                continue;
            }
            let neighbors = nearest_neighbors(&matrix, rows, self.k_neighbors);
            for _ in 0..needed {
                let base = rng.random_range(0..rows.len());
                let pick = rng.random_range(0..neighbors[base].len());
                let other = neighbors[base][pick];
                let gap: f32 = rng.random();

                let bi = rows[base];
                let oi = rows[other];
                let row: Vec<f32> = (0..n_features)
                    .map(|f| {
                        let a = matrix[[f, bi]];
                        let b = matrix[[f, oi]];
                        a + gap * (b - a)
                    })
                    .collect();
                synth_rows.push(row);
                synth_labels.push(class);
            }
            info!(class = class, synthesized = needed, "oversampled class");
        }

        self.extend_frame(frame, label, &features, &synth_rows, &synth_labels)
    }

    /// Originals first (unchanged), synthetic rows appended; column order kept.
    fn extend_frame(
        &self,
        frame: &Frame,
        label: &str,
        features: &Frame,
        synth_rows: &[Vec<f32>],
        synth_labels: &[f32],
    ) -> Result<Frame, DataError> {
        let feature_names = features.column_names();
        let columns = frame
            .columns()
            .iter()
            .map(|col| {
                let ColumnValues::Numeric(values) = col.values() else {
                    return Err(DataError::NotNumeric {
                        name: col.name().to_string(),
                    });
                };
                let mut extended = values.clone();
                if col.name() == label {
                    extended.extend_from_slice(synth_labels);
                } else {
                    let feature_idx = feature_names
                        .iter()
                        .position(|n| n == col.name())
                        .expect("feature frame mirrors the input minus the label");
                    extended.extend(synth_rows.iter().map(|row| row[feature_idx]));
                }
                Ok(Column::numeric(col.name(), extended))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Frame::new(columns)
    }
}

/// For each class member, the indices (into `rows`) of its k nearest
/// same-class neighbours by Euclidean distance.
fn nearest_neighbors(
    matrix: &ndarray::Array2<f32>,
    rows: &[usize],
    k: usize,
) -> Vec<Vec<usize>> {
    let n = rows.len();
    let k = k.min(n.saturating_sub(1)).max(1);
    (0..n)
        .map(|i| {
            let mut dist: Vec<(usize, f32)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| {
                    let d = (0..matrix.nrows())
                        .map(|f| {
                            let diff = matrix[[f, rows[i]]] - matrix[[f, rows[j]]];
                            diff * diff
                        })
                        .sum::<f32>();
                    (j, d)
                })
                .collect();
            dist.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
            dist.into_iter().take(k).map(|(j, _)| j).collect()
        })
        .collect()
}
