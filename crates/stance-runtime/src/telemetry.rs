//! Tracing subscriber setup for binaries and integration harnesses.

use thiserror::Error;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter directive: {0}")]
    InvalidDirective(#[from] tracing_subscriber::filter::ParseError),

    #[error("Tracing subscriber already installed: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"stance_runtime=info"`).
pub fn init_tracing(default_directive: &str) -> Result<(), TelemetryError> {
    let filter = filter_from(std::env::var("RUST_LOG").ok(), default_directive)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()?;
    Ok(())
}

fn filter_from(env: Option<String>, default_directive: &str) -> Result<EnvFilter, TelemetryError> {
    match env.filter(|value| !value.trim().is_empty()) {
        Some(value) => Ok(EnvFilter::try_new(value)?),
        None => Ok(EnvFilter::try_new(default_directive)?),
    }
}
