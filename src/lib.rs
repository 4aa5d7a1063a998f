//! bookcast: batch training pipeline for booking-cancellation prediction.
//!
//! Raw tabular booking data goes in; a trained gradient-boosted classifier,
//! processed datasets, and an experiment-run record come out. The stages run
//! strictly in sequence: ingest → preprocess → balance → select features →
//! randomized search → evaluate → persist.
//!
//! # Key Types
//!
//! - [`config::PipelineConfig`] - YAML-driven run configuration
//! - [`data::Frame`] - named, typed table every stage consumes and produces
//! - [`preprocess::Preprocessor`] - cleaning, encoding, VIF and skew handling
//! - [`balance::Smote`] - synthetic minority oversampling
//! - [`select::FeatureSelector`] - importance ranking and top-k projection
//! - [`training::RandomizedSearch`] - cross-validated hyperparameter search
//! - [`model::BoostedModel`] - fitted classifier with a fixed input schema
//!
//! # Running
//!
//! The `train` binary executes [`pipeline::run`] end-to-end from a config
//! file; see `config/config.yaml` for the expected layout.

pub mod balance;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod model;
pub mod persist;
pub mod pipeline;
pub mod preprocess;
pub mod repr;
pub mod select;
pub mod tracking;
pub mod training;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use config::PipelineConfig;
pub use data::{Frame, LABEL_COLUMN};
pub use error::{DataError, ModelError, PipelineError, Result};
pub use model::{BoostedModel, ModelMeta};
pub use training::{GbdtParams, Metrics, Scoring};
pub use utils::{Parallelism, run_with_threads};
