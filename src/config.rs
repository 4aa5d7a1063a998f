//! Pipeline configuration.
//!
//! One YAML file drives a whole run: raw/processed/model paths, the column
//! taxonomy and preprocessing thresholds, the randomized-search settings, and
//! the hyperparameter space. Every key is required; a missing key fails
//! deserialization and therefore the run.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::training::metrics::Scoring;
use crate::training::search::ParamSpace;

/// Root configuration for one pipeline run.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub data_processing: ProcessingConfig,
    pub search: SearchConfig,
    pub space: ParamSpace,
}

/// Filesystem layout for a run.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    /// Raw training split.
    pub train_csv: PathBuf,
    /// Raw test split.
    pub test_csv: PathBuf,
    /// Directory for processed train/test CSVs.
    pub processed_dir: PathBuf,
    /// Output path for the serialized model.
    pub model_path: PathBuf,
    /// Root directory for experiment-run records.
    pub experiment_dir: PathBuf,
}

impl PathsConfig {
    /// Processed training split location.
    pub fn processed_train(&self) -> PathBuf {
        self.processed_dir.join("train.csv")
    }

    /// Processed test split location.
    pub fn processed_test(&self) -> PathBuf {
        self.processed_dir.join("test.csv")
    }
}

/// Column taxonomy and preprocessing thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Columns that hold categorical labels (includes the target column).
    pub categorical_columns: Vec<String>,
    /// Columns that hold numeric measurements.
    pub numerical_columns: Vec<String>,
    /// Skewness above this triggers a `ln(1+x)` transform.
    pub skewness_threshold: f64,
    /// How many top-ranked features to keep.
    pub number_of_features: usize,
}

/// Randomized-search settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Number of sampled hyperparameter configurations.
    pub n_iter: usize,
    /// Number of cross-validation folds.
    pub cv: usize,
    /// Worker threads: 0 = all cores, 1 = sequential, n = exact.
    pub n_jobs: usize,
    /// 0 = quiet search, higher values log every candidate.
    pub verbose: usize,
    /// Seed for sampling, fold shuffling, and oversampling.
    pub seed: u64,
    /// Metric used to rank candidates.
    pub scoring: Scoring,
}

impl PipelineConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            PipelineError::config_with(format!("cannot open config file {}", path.display()), e)
        })?;
        let config: PipelineConfig = serde_yaml::from_reader(file).map_err(|e| {
            PipelineError::config_with(format!("invalid config file {}", path.display()), e)
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.data_processing.number_of_features == 0 {
            return Err(PipelineError::config("number_of_features must be at least 1"));
        }
        if self.search.n_iter == 0 {
            return Err(PipelineError::config("search.n_iter must be at least 1"));
        }
        if self.search.cv < 2 {
            return Err(PipelineError::config("search.cv must be at least 2"));
        }
        self.space
            .validate()
            .map_err(|message| PipelineError::Config {
                message,
                source: None,
            })
    }
}
