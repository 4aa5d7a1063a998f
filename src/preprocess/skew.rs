//! Skewness correction for numeric columns.
//!
//! Columns whose sample skewness exceeds the configured threshold are
//! replaced by `ln(1 + x)` elementwise. The transform runs once per pipeline
//! run and is not re-checked afterwards.

use tracing::info;

use crate::data::{Column, Frame};
use crate::error::DataError;

/// Adjusted Fisher–Pearson sample skewness (the pandas `.skew()` estimator).
///
/// NaN values are skipped. Fewer than three usable values, or zero variance,
/// yields 0.0.
pub fn sample_skewness(values: &[f32]) -> f64 {
    let usable: Vec<f64> = values
        .iter()
        .filter(|v| !v.is_nan())
        .map(|&v| v as f64)
        .collect();
    let n = usable.len();
    if n < 3 {
        return 0.0;
    }

    let nf = n as f64;
    let mean = usable.iter().sum::<f64>() / nf;
    let (m2, m3) = usable.iter().fold((0.0f64, 0.0f64), |(m2, m3), &v| {
        let d = v - mean;
        (m2 + d * d, m3 + d * d * d)
    });
    let m2 = m2 / nf;
    let m3 = m3 / nf;
    if m2 < 1e-12 {
        return 0.0;
    }

    let g1 = m3 / m2.powf(1.5);
    g1 * (nf * (nf - 1.0)).sqrt() / (nf - 2.0)
}

/// Apply `ln(1 + x)` to every configured numeric column whose skewness
/// exceeds `threshold`. Columns no longer present in the table are skipped.
pub fn correct_skewed(
    mut frame: Frame,
    numerical_columns: &[String],
    threshold: f64,
) -> Result<Frame, DataError> {
    for name in numerical_columns {
        let Some(column) = frame.column(name) else {
            continue;
        };
        let values = column.numeric_values()?;
        let skew = sample_skewness(values);
        if skew > threshold {
            info!(
                column = %name,
                skewness = %format!("{skew:.3}"),
                "applying log1p transform"
            );
            let transformed: Vec<f32> = values.iter().map(|&v| v.ln_1p()).collect();
            frame = frame.replace_column(Column::numeric(name.clone(), transformed))?;
        }
    }
    Ok(frame)
}
