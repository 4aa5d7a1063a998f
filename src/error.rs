//! Error types for the training pipeline.
//!
//! Failures are grouped into four categories (configuration, I/O, data,
//! model) so callers can tell a bad config key from a malformed table from a
//! failed fit without string-matching messages. Every variant keeps the
//! original cause reachable through `source()`.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

// =============================================================================
// DataError
// =============================================================================

/// Errors raised while validating or transforming tables.
#[derive(Debug, Error)]
pub enum DataError {
    /// A step referenced a column that is not present in the table.
    #[error("column `{name}` not found in table")]
    MissingColumn { name: String },

    /// A numeric operation was applied to a non-numeric column.
    #[error("column `{name}` is not numeric")]
    NotNumeric { name: String },

    /// The frozen label encoding saw a value absent from the training split.
    #[error("unseen category `{value}` in column `{column}`")]
    UnseenCategory { column: String, value: String },

    /// `transform` was called on an encoder that was never fitted.
    #[error("label encoder used before fitting")]
    EncoderNotFitted,

    /// The multicollinearity filter would remove the label column.
    #[error("multicollinearity filter removed label column `{label}`")]
    LabelRemovedByFilter { label: String },

    /// The multicollinearity filter would keep no feature columns.
    #[error("multicollinearity filter kept no feature columns")]
    NoFeaturesLeft,

    /// Balancing requires at least two classes.
    #[error("class balancing needs at least 2 classes, found {found}")]
    InsufficientClasses { found: usize },

    /// A class is too small for neighbour-based oversampling.
    #[error(
        "class {label} has {count} samples, oversampling needs at least {required}"
    )]
    TooFewClassSamples {
        label: f32,
        count: usize,
        required: usize,
    },

    /// An operation ran on a table with no rows.
    #[error("table has no rows")]
    EmptyTable,

    /// Column lengths disagree within one table.
    #[error("column `{name}` has {got} rows, table has {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    /// Two columns share one name.
    #[error("duplicate column `{name}`")]
    DuplicateColumn { name: String },
}

// =============================================================================
// ModelError
// =============================================================================

/// Errors raised while fitting, searching, or applying models.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Prediction input does not match the schema the model was trained on.
    #[error("feature schema mismatch: expected [{expected}], got [{got}]")]
    SchemaMismatch { expected: String, got: String },

    /// The hyperparameter search produced no usable candidate.
    #[error("hyperparameter search found no finite-scoring candidate")]
    NoViableCandidate,

    /// Training inputs are inconsistent (shapes, empty data).
    #[error("invalid training input: {reason}")]
    InvalidTrainingInput { reason: String },

    /// A persisted model could not be decoded.
    #[error("model payload could not be decoded: {0}")]
    Decode(#[from] postcard::Error),
}

// =============================================================================
// PipelineError
// =============================================================================

/// Top-level error for a pipeline run.
///
/// Each stage maps its failures into exactly one of these categories before
/// propagating; the driver logs the error and aborts the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration could not be read or is invalid.
    #[error("configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A file could not be read or written.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A table violated a data contract.
    #[error("data error: {0}")]
    Data(#[from] DataError),

    /// Model fitting, search, or prediction failed.
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

impl PipelineError {
    /// Build a config error with a message only.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Build a config error wrapping a cause.
    pub fn config_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Build an I/O error with path context.
    pub fn io(
        path: impl Into<PathBuf>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Io {
            path: path.into(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn io_error_keeps_path_and_source() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = PipelineError::io("/tmp/raw/train.csv", inner);
        let msg = err.to_string();
        assert!(msg.contains("/tmp/raw/train.csv"));
        assert!(err.source().is_some());
    }

    #[test]
    fn data_error_converts() {
        let err: PipelineError = DataError::MissingColumn {
            name: "lead_time".into(),
        }
        .into();
        assert!(matches!(err, PipelineError::Data(_)));
        assert!(err.to_string().contains("lead_time"));
    }

    #[test]
    fn schema_mismatch_message_lists_both_sides() {
        let err = ModelError::SchemaMismatch {
            expected: "a, b".into(),
            got: "a, c".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("a, b"));
        assert!(msg.contains("a, c"));
    }
}
