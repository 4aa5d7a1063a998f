//! Multicollinearity filter based on variance inflation factors.
//!
//! The design matrix is every column of the table plus an intercept term.
//! A column's VIF is `1 / (1 - R²)` from regressing it on all other columns;
//! perfectly collinear columns come out infinite and are dropped. Only
//! columns scoring below [`VIF_THRESHOLD`] are kept.

use tracing::info;

use crate::data::Frame;
use crate::error::DataError;

/// Columns with a VIF at or above this are dropped.
pub const VIF_THRESHOLD: f64 = 5.0;

/// Pivots below this are treated as a singular system (perfect collinearity).
const SINGULAR_EPS: f64 = 1e-10;

/// Compute the VIF score of every column in an all-numeric frame.
pub fn variance_inflation(frame: &Frame) -> Result<Vec<(String, f64)>, DataError> {
    let n_rows = frame.n_rows();
    if n_rows == 0 {
        return Err(DataError::EmptyTable);
    }

    let columns: Vec<(&str, Vec<f64>)> = frame
        .columns()
        .iter()
        .map(|col| {
            col.numeric_values()
                .map(|v| (col.name(), v.iter().map(|&x| x as f64).collect()))
        })
        .collect::<Result<_, _>>()?;

    let mut scores = Vec::with_capacity(columns.len());
    for target in 0..columns.len() {
        // Predictors: intercept plus every other column.
        let mut predictors: Vec<&[f64]> = Vec::with_capacity(columns.len());
        for (idx, (_, values)) in columns.iter().enumerate() {
            if idx != target {
                predictors.push(values);
            }
        }
        let r2 = r_squared(&predictors, &columns[target].1);
        let vif = if 1.0 - r2 < SINGULAR_EPS {
            f64::INFINITY
        } else {
            1.0 / (1.0 - r2)
        };
        scores.push((columns[target].0.to_string(), vif));
    }
    Ok(scores)
}

/// Drop columns whose VIF reaches the threshold, preserving table order.
///
/// Degenerate outcomes fail loudly instead of propagating an unusable table:
/// losing the label column or every feature column is a data error.
pub fn filter_collinear(frame: Frame, label: &str) -> Result<Frame, DataError> {
    frame.require_column(label)?;

    let scores = variance_inflation(&frame)?;
    let selected: Vec<String> = scores
        .iter()
        .filter(|(_, vif)| *vif < VIF_THRESHOLD)
        .map(|(name, _)| name.clone())
        .collect();

    for (name, vif) in &scores {
        info!(column = %name, vif = %format!("{vif:.3}"), "variance inflation");
    }

    if !selected.iter().any(|name| name == label) {
        return Err(DataError::LabelRemovedByFilter {
            label: label.to_string(),
        });
    }
    if selected.iter().filter(|name| *name != label).count() == 0 {
        return Err(DataError::NoFeaturesLeft);
    }

    if selected.len() < frame.n_cols() {
        let dropped: Vec<&str> = scores
            .iter()
            .filter(|(_, vif)| *vif >= VIF_THRESHOLD)
            .map(|(name, _)| name.as_str())
            .collect();
        info!(dropped = %dropped.join(", "), "dropped collinear columns");
    }
    frame.select_columns(&selected)
}

/// R² of regressing `y` on an intercept plus the given predictor columns.
fn r_squared(predictors: &[&[f64]], y: &[f64]) -> f64 {
    let n = y.len();
    let p = predictors.len() + 1; // intercept

    // Normal equations over the design matrix [1 | predictors].
    let design = |row: usize, col: usize| -> f64 {
        if col == 0 { 1.0 } else { predictors[col - 1][row] }
    };

    let mut ata = vec![vec![0.0f64; p]; p];
    let mut aty = vec![0.0f64; p];
    for row in 0..n {
        for i in 0..p {
            let xi = design(row, i);
            aty[i] += xi * y[row];
            for j in i..p {
                ata[i][j] += xi * design(row, j);
            }
        }
    }
    for i in 0..p {
        for j in 0..i {
            ata[i][j] = ata[j][i];
        }
    }

    let Some(coeffs) = solve(&mut ata, &mut aty) else {
        // Singular system: the column is an exact combination of the others.
        return 1.0;
    };

    let mean_y = y.iter().sum::<f64>() / n as f64;
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for row in 0..n {
        let mut fitted = 0.0;
        for i in 0..p {
            fitted += coeffs[i] * design(row, i);
        }
        ss_res += (y[row] - fitted).powi(2);
        ss_tot += (y[row] - mean_y).powi(2);
    }

    if ss_tot < SINGULAR_EPS {
        // Constant column: fully explained by the intercept.
        return 1.0;
    }
    (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
}

/// Gaussian elimination with partial pivoting. Returns `None` when singular.
fn solve(a: &mut [Vec<f64>], b: &mut [f64]) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .expect("non-empty pivot range");
        if a[pivot_row][col].abs() < SINGULAR_EPS {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        let pivot = a[col].clone();
        let pivot_b = b[col];
        for row in (col + 1)..n {
            let factor = a[row][col] / pivot[col];
            for k in col..n {
                a[row][k] -= factor * pivot[k];
            }
            b[row] -= factor * pivot_b;
        }
    }

    let mut x = vec![0.0f64; n];
    for row in (0..n).rev() {
        let mut sum = b[row];
        for col in (row + 1)..n {
            sum -= a[row][col] * x[col];
        }
        x[row] = sum / a[row][row];
    }
    Some(x)
}
