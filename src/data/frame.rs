//! Column-major table of named, typed columns.
//!
//! Numeric columns are `f32` to match the feature-major matrices the trainers
//! consume; text columns carry raw categorical values until label encoding
//! turns them numeric. Transforms consume a frame and return a new one.

use std::collections::HashSet;

use ndarray::{Array1, Array2, ArrayView2};

use crate::error::DataError;

// =============================================================================
// Column
// =============================================================================

/// Values held by one column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<f32>),
    Text(Vec<String>),
}

impl ColumnValues {
    fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
        }
    }
}

/// One named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    values: ColumnValues,
}

impl Column {
    /// Build a numeric column.
    pub fn numeric(name: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Numeric(values),
        }
    }

    /// Build a text column.
    pub fn text(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Text(values),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.values, ColumnValues::Numeric(_))
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    /// Numeric values, or a typed error naming the column.
    pub fn numeric_values(&self) -> Result<&[f32], DataError> {
        match &self.values {
            ColumnValues::Numeric(v) => Ok(v),
            ColumnValues::Text(_) => Err(DataError::NotNumeric {
                name: self.name.clone(),
            }),
        }
    }

    /// Text values, or a typed error naming the column.
    pub fn text_values(&self) -> Result<&[String], DataError> {
        match &self.values {
            ColumnValues::Text(v) => Ok(v),
            ColumnValues::Numeric(_) => Err(DataError::NotNumeric {
                name: self.name.clone(),
            }),
        }
    }
}

// =============================================================================
// Frame
// =============================================================================

/// A table: equally sized named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: Vec<Column>,
}

impl Frame {
    /// Build a frame, validating column lengths and name uniqueness.
    pub fn new(columns: Vec<Column>) -> Result<Self, DataError> {
        if let Some(first) = columns.first() {
            let expected = first.len();
            for col in &columns {
                if col.len() != expected {
                    return Err(DataError::LengthMismatch {
                        name: col.name.clone(),
                        expected,
                        got: col.len(),
                    });
                }
            }
        }
        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(DataError::DuplicateColumn {
                    name: col.name.clone(),
                });
            }
        }
        Ok(Self { columns })
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in table order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column by name, or a typed error.
    pub fn require_column(&self, name: &str) -> Result<&Column, DataError> {
        self.column(name).ok_or_else(|| DataError::MissingColumn {
            name: name.to_string(),
        })
    }

    /// Drop the named columns when present; absent names are ignored.
    pub fn drop_columns(self, names: &[&str]) -> Frame {
        let columns = self
            .columns
            .into_iter()
            .filter(|c| !names.contains(&c.name.as_str()))
            .collect();
        Frame { columns }
    }

    /// Remove exact-duplicate rows, keeping the first occurrence.
    ///
    /// Numeric cells compare by bit pattern, so identical NaNs are treated as
    /// equal the way the raw export produced them.
    pub fn dedup_rows(self) -> Frame {
        let n_rows = self.n_rows();
        let mut seen: HashSet<Vec<RowCell>> = HashSet::with_capacity(n_rows);
        let mut keep = Vec::with_capacity(n_rows);
        for row in 0..n_rows {
            let key: Vec<RowCell> = self
                .columns
                .iter()
                .map(|col| match &col.values {
                    ColumnValues::Numeric(v) => RowCell::Num(v[row].to_bits()),
                    ColumnValues::Text(v) => RowCell::Text(v[row].clone()),
                })
                .collect();
            if seen.insert(key) {
                keep.push(row);
            }
        }
        if keep.len() == n_rows {
            return self;
        }
        self.take_rows(&keep)
    }

    /// New frame with only the given row indices, in the given order.
    pub fn take_rows(&self, rows: &[usize]) -> Frame {
        let columns = self
            .columns
            .iter()
            .map(|col| {
                let values = match &col.values {
                    ColumnValues::Numeric(v) => {
                        ColumnValues::Numeric(rows.iter().map(|&r| v[r]).collect())
                    }
                    ColumnValues::Text(v) => {
                        ColumnValues::Text(rows.iter().map(|&r| v[r].clone()).collect())
                    }
                };
                Column {
                    name: col.name.clone(),
                    values,
                }
            })
            .collect();
        Frame { columns }
    }

    /// Project onto the named columns, preserving the requested order.
    ///
    /// Any missing name fails loudly; this is the check that keeps the test
    /// split aligned with the train split's selected columns.
    pub fn select_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<Frame, DataError> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            columns.push(self.require_column(name.as_ref())?.clone());
        }
        Frame::new(columns)
    }

    /// Replace a column in place, keeping table order.
    pub fn replace_column(mut self, column: Column) -> Result<Frame, DataError> {
        let slot = self
            .columns
            .iter_mut()
            .find(|c| c.name == column.name)
            .ok_or_else(|| DataError::MissingColumn {
                name: column.name.clone(),
            })?;
        if column.len() != slot.len() {
            return Err(DataError::LengthMismatch {
                name: column.name.clone(),
                expected: slot.len(),
                got: column.len(),
            });
        }
        *slot = column;
        Ok(self)
    }

    /// Append a column on the right.
    pub fn push_column(mut self, column: Column) -> Result<Frame, DataError> {
        if !self.columns.is_empty() && column.len() != self.n_rows() {
            return Err(DataError::LengthMismatch {
                name: column.name.clone(),
                expected: self.n_rows(),
                got: column.len(),
            });
        }
        if self.contains(column.name()) {
            return Err(DataError::DuplicateColumn {
                name: column.name.clone(),
            });
        }
        self.columns.push(column);
        Ok(self)
    }

    /// Split off a numeric label column: remaining feature frame + targets.
    pub fn split_label(&self, label: &str) -> Result<(Frame, Array1<f32>), DataError> {
        let targets = Array1::from(self.require_column(label)?.numeric_values()?.to_vec());
        let features = Frame {
            columns: self
                .columns
                .iter()
                .filter(|c| c.name != label)
                .cloned()
                .collect(),
        };
        Ok((features, targets))
    }

    /// All-numeric frame as ordered names plus a feature-major matrix
    /// `[n_features, n_samples]`.
    pub fn to_matrix(&self) -> Result<(Vec<String>, Array2<f32>), DataError> {
        let n_rows = self.n_rows();
        let mut names = Vec::with_capacity(self.columns.len());
        let mut data = Vec::with_capacity(self.columns.len() * n_rows);
        for col in &self.columns {
            names.push(col.name.clone());
            data.extend_from_slice(col.numeric_values()?);
        }
        let matrix = Array2::from_shape_vec((names.len(), n_rows), data)
            .expect("column-major copy matches declared shape");
        Ok((names, matrix))
    }

    /// Rebuild a numeric frame from a feature-major matrix.
    pub fn from_matrix(names: &[String], matrix: ArrayView2<f32>) -> Result<Frame, DataError> {
        debug_assert_eq!(names.len(), matrix.nrows(), "one name per feature row");
        let columns = names
            .iter()
            .zip(matrix.rows())
            .map(|(name, row)| Column::numeric(name.clone(), row.to_vec()))
            .collect();
        Frame::new(columns)
    }
}

/// Hashable cell used for duplicate-row detection.
#[derive(Hash, PartialEq, Eq)]
enum RowCell {
    Num(u32),
    Text(String),
}
