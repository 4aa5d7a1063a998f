//! Pipeline entry point.
//!
//! Runs ingestion → preprocessing → training end-to-end. No flags: the config
//! path defaults to `config/config.yaml`, with an optional positional
//! override.

use std::process::ExitCode;

use bookcast::config::PipelineConfig;
use bookcast::{logging, pipeline};

const DEFAULT_CONFIG: &str = "config/config.yaml";

fn main() -> ExitCode {
    logging::init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());

    let outcome = PipelineConfig::load(&config_path).and_then(|config| pipeline::run(&config));
    match outcome {
        Ok(metrics) => {
            tracing::info!(%metrics, "pipeline finished");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "pipeline failed");
            ExitCode::FAILURE
        }
    }
}
