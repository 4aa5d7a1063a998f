//! Experiment tracking.
//!
//! Every pipeline execution opens one run: a timestamped directory under the
//! experiments root holding `params.json`, `metrics.json`, and copies of the
//! logged artifacts (processed datasets, model file).

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::training::metrics::Metrics;

/// Creates runs under one experiments root.
#[derive(Debug, Clone)]
pub struct ExperimentTracker {
    root: PathBuf,
}

impl ExperimentTracker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open a new run directory named after the current UTC time; a numeric
    /// suffix avoids collisions when runs start within the same second.
    pub fn start_run(&self) -> Result<ExperimentRun> {
        let stamp = OffsetDateTime::now_utc()
            .format(format_description!(
                "[year][month][day]_[hour][minute][second]"
            ))
            .map_err(|e| PipelineError::config_with("cannot format run timestamp", e))?;

        let mut dir = self.root.join(format!("run_{stamp}"));
        let mut attempt = 1u32;
        while dir.exists() {
            attempt += 1;
            dir = self.root.join(format!("run_{stamp}_{attempt}"));
        }
        fs::create_dir_all(dir.join("artifacts")).map_err(|e| PipelineError::io(&dir, e))?;
        info!(run = %dir.display(), "started experiment run");
        Ok(ExperimentRun { dir })
    }
}

/// One open run.
#[derive(Debug)]
pub struct ExperimentRun {
    dir: PathBuf,
}

impl ExperimentRun {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the chosen hyperparameters (and any search settings) to
    /// `params.json`.
    pub fn log_params<T: Serialize>(&self, params: &T) -> Result<()> {
        self.write_json("params.json", params)
    }

    /// Write all four metrics to `metrics.json`.
    pub fn log_metrics(&self, metrics: &Metrics) -> Result<()> {
        self.write_json("metrics.json", &metrics.to_map())
    }

    /// Copy a produced file into the run's `artifacts/` directory.
    pub fn log_artifact(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .ok_or_else(|| PipelineError::config(format!("artifact {} has no file name", path.display())))?;
        let target = self.dir.join("artifacts").join(name);
        fs::copy(path, &target).map_err(|e| PipelineError::io(path, e))?;
        info!(artifact = %target.display(), "logged artifact");
        Ok(target)
    }

    fn write_json<T: Serialize>(&self, file: &str, value: &T) -> Result<()> {
        let path = self.dir.join(file);
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| PipelineError::io(&path, e))?;
        fs::write(&path, json).map_err(|e| PipelineError::io(&path, e))?;
        info!(path = %path.display(), "wrote run record");
        Ok(())
    }
}
