//! Table cleaning: drop bookkeeping columns, deduplicate, encode
//! categoricals, filter multicollinearity, correct skew.
//!
//! The encoder is fitted by [`Preprocessor::fit_transform`] on the training
//! split and reused frozen by [`Preprocessor::transform`] for every other
//! split.

mod encode;
mod skew;
mod vif;

pub use encode::LabelEncoder;
pub use skew::{correct_skewed, sample_skewness};
pub use vif::{VIF_THRESHOLD, filter_collinear, variance_inflation};

use tracing::info;

use crate::config::ProcessingConfig;
use crate::data::{Frame, LABEL_COLUMN};
use crate::error::DataError;

/// Auto-generated index column in raw exports.
pub const INDEX_COLUMN: &str = "Unnamed: 0";
/// Booking identifier column in raw exports.
pub const ID_COLUMN: &str = "Booking_ID";

/// Cleans raw frames into model-ready numeric tables.
pub struct Preprocessor {
    processing: ProcessingConfig,
    encoder: Option<LabelEncoder>,
}

impl Preprocessor {
    pub fn new(processing: ProcessingConfig) -> Self {
        Self {
            processing,
            encoder: None,
        }
    }

    /// The encoder fitted on the training split, once available.
    pub fn encoder(&self) -> Option<&LabelEncoder> {
        self.encoder.as_ref()
    }

    /// Clean the training split, fitting the label encoder on it.
    pub fn fit_transform(&mut self, frame: Frame) -> Result<Frame, DataError> {
        let frame = Self::strip(frame);
        let encoder = LabelEncoder::fit(&frame, &self.processing.categorical_columns)?;
        encoder.log_mappings();
        let frame = encoder.transform(frame)?;
        self.encoder = Some(encoder);
        self.finish(frame)
    }

    /// Clean a later split with the frozen training-split encoder.
    pub fn transform(&self, frame: Frame) -> Result<Frame, DataError> {
        let encoder = self.encoder.as_ref().ok_or(DataError::EncoderNotFitted)?;
        let frame = Self::strip(frame);
        let frame = encoder.transform(frame)?;
        self.finish(frame)
    }

    fn strip(frame: Frame) -> Frame {
        let before = frame.n_rows();
        let frame = frame
            .drop_columns(&[INDEX_COLUMN, ID_COLUMN])
            .dedup_rows();
        info!(
            rows_before = before,
            rows_after = frame.n_rows(),
            "dropped bookkeeping columns and duplicate rows"
        );
        frame
    }

    fn finish(&self, frame: Frame) -> Result<Frame, DataError> {
        let frame = filter_collinear(frame, LABEL_COLUMN)?;
        let frame = correct_skewed(
            frame,
            &self.processing.numerical_columns,
            self.processing.skewness_threshold,
        )?;
        info!(cols = frame.n_cols(), rows = frame.n_rows(), "preprocessing finished");
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;

    fn processing() -> ProcessingConfig {
        ProcessingConfig {
            categorical_columns: vec!["meal_plan".into(), LABEL_COLUMN.into()],
            numerical_columns: vec!["lead_time".into(), "price".into()],
            skewness_threshold: 5.0,
            number_of_features: 2,
        }
    }

    fn raw_frame() -> Frame {
        let n = 40;
        let ids: Vec<String> = (0..n).map(|i| format!("INN{i:05}")).collect();
        let index: Vec<f32> = (0..n).map(|i| i as f32).collect();
        let lead: Vec<f32> = (0..n).map(|i| ((i * 37 + 11) % 23) as f32).collect();
        let price: Vec<f32> = (0..n).map(|i| 50.0 + ((i * 53 + 7) % 19) as f32).collect();
        let meal: Vec<String> = (0..n)
            .map(|i| if i % 3 == 0 { "plan_a" } else { "plan_b" }.to_string())
            .collect();
        let status: Vec<String> = (0..n)
            .map(|i| {
                if i % 4 == 0 { "Canceled" } else { "Not_Canceled" }.to_string()
            })
            .collect();
        Frame::new(vec![
            Column::numeric(INDEX_COLUMN, index),
            Column::text(ID_COLUMN, ids),
            Column::numeric("lead_time", lead),
            Column::numeric("price", price),
            Column::text("meal_plan", meal),
            Column::text(LABEL_COLUMN, status),
        ])
        .unwrap()
    }

    #[test]
    fn fit_transform_strips_and_encodes() {
        let mut preprocessor = Preprocessor::new(processing());
        let cleaned = preprocessor.fit_transform(raw_frame()).unwrap();

        assert!(!cleaned.contains(INDEX_COLUMN));
        assert!(!cleaned.contains(ID_COLUMN));
        assert!(cleaned.column(LABEL_COLUMN).unwrap().is_numeric());
        assert!(cleaned.column("meal_plan").unwrap().is_numeric());

        // Canceled sorts before Not_Canceled, so it encodes to 0.
        let encoder = preprocessor.encoder().unwrap();
        assert_eq!(encoder.decode(LABEL_COLUMN, 0), Some("Canceled"));
        assert_eq!(encoder.decode(LABEL_COLUMN, 1), Some("Not_Canceled"));
    }

    #[test]
    fn transform_before_fit_fails() {
        let preprocessor = Preprocessor::new(processing());
        let err = preprocessor.transform(raw_frame()).unwrap_err();
        assert!(matches!(err, DataError::EncoderNotFitted));
    }

    #[test]
    fn test_split_reuses_frozen_mapping() {
        let mut preprocessor = Preprocessor::new(processing());
        let train = preprocessor.fit_transform(raw_frame()).unwrap();
        let test = preprocessor.transform(raw_frame()).unwrap();
        assert_eq!(
            train.column("meal_plan").unwrap().numeric_values().unwrap(),
            test.column("meal_plan").unwrap().numeric_values().unwrap()
        );
    }

    #[test]
    fn duplicate_rows_are_removed() {
        let base = raw_frame();
        // Duplicate every row by concatenating the frame with itself, minus
        // the unique bookkeeping columns.
        let doubled_rows: Vec<usize> =
            (0..base.n_rows()).chain(0..base.n_rows()).collect();
        let doubled = base
            .drop_columns(&[INDEX_COLUMN, ID_COLUMN])
            .take_rows(&doubled_rows);

        let mut preprocessor = Preprocessor::new(processing());
        let cleaned = preprocessor.fit_transform(doubled).unwrap();
        assert_eq!(cleaned.n_rows(), 40);
    }
}
