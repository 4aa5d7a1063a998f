//! Logging setup for the pipeline binary.
//!
//! Installs a global tracing subscriber writing to stdout. The filter honours
//! `RUST_LOG` and defaults to `info`. Repeated calls are no-ops so tests and
//! the binary can both call [`init`] safely.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
