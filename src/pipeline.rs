//! End-to-end pipeline driver.
//!
//! [`DataStage`] turns the raw train/test CSVs into processed, balanced,
//! feature-selected tables on disk. [`TrainingStage`] searches, fits,
//! evaluates, and persists the model inside one experiment run. Any failure
//! aborts the run; nothing is retried and partial artifacts are left as-is.

use tracing::info;

use crate::balance::Smote;
use crate::config::PipelineConfig;
use crate::data::{self, LABEL_COLUMN};
use crate::error::Result;
use crate::model::{BoostedModel, ModelMeta};
use crate::persist;
use crate::preprocess::Preprocessor;
use crate::select::FeatureSelector;
use crate::tracking::ExperimentTracker;
use crate::training::metrics::{DEFAULT_THRESHOLD, Metrics, evaluate_binary};
use crate::training::search::RandomizedSearch;
use crate::utils::{Parallelism, run_with_threads};

/// Ingest raw splits, clean, balance, select, and write processed tables.
pub struct DataStage<'a> {
    config: &'a PipelineConfig,
}

impl<'a> DataStage<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<()> {
        let paths = &self.config.paths;
        info!("starting data stage");

        let train = data::csv::read_frame(&paths.train_csv)?;
        let test = data::csv::read_frame(&paths.test_csv)?;

        let mut preprocessor = Preprocessor::new(self.config.data_processing.clone());
        let train = preprocessor.fit_transform(train)?;
        let test = preprocessor.transform(test)?;

        let smote = Smote::default();
        let train = smote.balance(&train, LABEL_COLUMN)?;
        let test = smote.balance(&test, LABEL_COLUMN)?;

        let selector = FeatureSelector::new(self.config.data_processing.number_of_features);
        let (train, _ranking) = selector.select(&train, LABEL_COLUMN)?;

        // The test split is never selected on its own: it is projected onto
        // the exact column list the training split settled on, and a missing
        // column aborts the run here.
        let test = test.select_columns(&train.column_names())?;

        data::csv::write_frame(&train, paths.processed_train())?;
        data::csv::write_frame(&test, paths.processed_test())?;
        info!("data stage complete");
        Ok(())
    }
}

/// Search hyperparameters, refit, evaluate, and persist inside one run.
pub struct TrainingStage<'a> {
    config: &'a PipelineConfig,
}

impl<'a> TrainingStage<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<Metrics> {
        let paths = &self.config.paths;
        let settings = &self.config.search;
        info!("starting training stage");

        let tracker = ExperimentTracker::new(&paths.experiment_dir);
        let run = tracker.start_run()?;
        run.log_artifact(paths.processed_train())?;
        run.log_artifact(paths.processed_test())?;

        let train = data::csv::read_frame(paths.processed_train())?;
        let test = data::csv::read_frame(paths.processed_test())?;

        let (train_features, train_targets) = train.split_label(LABEL_COLUMN)?;
        let (feature_names, train_matrix) = train_features.to_matrix()?;

        let search = RandomizedSearch {
            n_iter: settings.n_iter,
            cv: settings.cv,
            seed: settings.seed,
            scoring: settings.scoring,
            verbose: settings.verbose,
        };
        let report = run_with_threads(settings.n_jobs, |parallelism| {
            search.run(
                train_matrix.view(),
                train_targets.view(),
                &self.config.space,
                parallelism,
            )
        })?;

        let model = BoostedModel::new(
            report.forest,
            ModelMeta {
                feature_names,
                label: LABEL_COLUMN.to_string(),
                best_params: report.best_params.clone(),
                best_score: report.best_score,
            },
        );

        let (test_features, test_targets) = test.split_label(LABEL_COLUMN)?;
        let probabilities = model.predict_frame(
            &test_features,
            Parallelism::from_threads(settings.n_jobs),
        )?;
        let metrics = evaluate_binary(probabilities.view(), test_targets.view(), DEFAULT_THRESHOLD);
        info!(%metrics, "evaluation complete");

        persist::save_model(&model, &paths.model_path)?;
        run.log_artifact(&paths.model_path)?;
        run.log_params(&report.best_params)?;
        run.log_metrics(&metrics)?;
        info!("training stage complete");
        Ok(metrics)
    }
}

/// Run the whole pipeline: data stage, then training stage.
pub fn run(config: &PipelineConfig) -> Result<Metrics> {
    DataStage::new(config).run()?;
    TrainingStage::new(config).run()
}
