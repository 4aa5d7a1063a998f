//! Label encoding for categorical columns.
//!
//! Codes are assigned by sorting a column's distinct values and numbering
//! them from zero. The encoder is fitted once, on the training split, and the
//! frozen mapping is applied to every later split; a value the training split
//! never produced is an error, not a silent remap.

use std::collections::BTreeSet;

use tracing::info;

use crate::data::{Column, Frame};
use crate::error::DataError;

/// Per-column mapping from categorical value to integer code.
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    /// (column name, sorted distinct values); code = index in the vector.
    mappings: Vec<(String, Vec<String>)>,
}

impl LabelEncoder {
    /// Fit mappings from the observed values of the given columns.
    ///
    /// Columns that are already numeric are passed through without a mapping
    /// (they carry pre-encoded codes). A missing column is an error.
    pub fn fit(frame: &Frame, columns: &[String]) -> Result<Self, DataError> {
        let mut mappings = Vec::new();
        for name in columns {
            let column = frame.require_column(name)?;
            if column.is_numeric() {
                continue;
            }
            let distinct: BTreeSet<&String> = column.text_values()?.iter().collect();
            let classes: Vec<String> = distinct.into_iter().cloned().collect();
            mappings.push((name.clone(), classes));
        }
        Ok(Self { mappings })
    }

    /// Replace every mapped column's values with integer codes.
    pub fn transform(&self, mut frame: Frame) -> Result<Frame, DataError> {
        for (name, classes) in &self.mappings {
            let column = frame.require_column(name)?;
            if column.is_numeric() {
                continue;
            }
            let codes = column
                .text_values()?
                .iter()
                .map(|value| {
                    classes
                        .binary_search(value)
                        .map(|code| code as f32)
                        .map_err(|_| DataError::UnseenCategory {
                            column: name.clone(),
                            value: value.clone(),
                        })
                })
                .collect::<Result<Vec<f32>, DataError>>()?;
            frame = frame.replace_column(Column::numeric(name.clone(), codes))?;
        }
        Ok(frame)
    }

    /// Sorted distinct values for one column, if it was mapped.
    pub fn classes(&self, column: &str) -> Option<&[String]> {
        self.mappings
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, classes)| classes.as_slice())
    }

    /// Original value for a code in one column.
    pub fn decode(&self, column: &str, code: usize) -> Option<&str> {
        self.classes(column)?.get(code).map(String::as_str)
    }

    /// Log every mapping for audit.
    pub fn log_mappings(&self) {
        for (name, classes) in &self.mappings {
            let rendered: Vec<String> = classes
                .iter()
                .enumerate()
                .map(|(code, value)| format!("{value}={code}"))
                .collect();
            info!(column = %name, mapping = %rendered.join(", "), "label mapping");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        Frame::new(vec![
            Column::text(
                "meal_plan",
                vec!["plan_b".into(), "plan_a".into(), "plan_b".into()],
            ),
            Column::numeric("lead_time", vec![5.0, 6.0, 7.0]),
        ])
        .unwrap()
    }

    #[test]
    fn codes_follow_sorted_order() {
        let encoder = LabelEncoder::fit(&frame(), &["meal_plan".into()]).unwrap();
        let encoded = encoder.transform(frame()).unwrap();
        assert_eq!(
            encoded.column("meal_plan").unwrap().numeric_values().unwrap(),
            &[1.0, 0.0, 1.0]
        );
    }

    #[test]
    fn mapping_is_a_bijection() {
        let encoder = LabelEncoder::fit(&frame(), &["meal_plan".into()]).unwrap();
        let classes = encoder.classes("meal_plan").unwrap();
        let decoded: BTreeSet<&str> = (0..classes.len())
            .map(|code| encoder.decode("meal_plan", code).unwrap())
            .collect();
        assert_eq!(decoded, BTreeSet::from(["plan_a", "plan_b"]));
    }

    #[test]
    fn unseen_value_is_an_error() {
        let encoder = LabelEncoder::fit(&frame(), &["meal_plan".into()]).unwrap();
        let test = Frame::new(vec![
            Column::text("meal_plan", vec!["plan_z".into()]),
            Column::numeric("lead_time", vec![1.0]),
        ])
        .unwrap();
        let err = encoder.transform(test).unwrap_err();
        assert!(matches!(err, DataError::UnseenCategory { .. }));
    }

    #[test]
    fn numeric_column_passes_through() {
        let encoder =
            LabelEncoder::fit(&frame(), &["meal_plan".into(), "lead_time".into()]).unwrap();
        assert!(encoder.classes("lead_time").is_none());
        let encoded = encoder.transform(frame()).unwrap();
        assert_eq!(
            encoded.column("lead_time").unwrap().numeric_values().unwrap(),
            &[5.0, 6.0, 7.0]
        );
    }

    #[test]
    fn missing_column_is_an_error() {
        let err = LabelEncoder::fit(&frame(), &["ghost".into()]).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { .. }));
    }
}
