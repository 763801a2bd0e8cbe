//! Errors surfaced by the console binary.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::console::LifecycleError;
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("failed to list methods: {0}")]
    ListMethods(io::Error),
    #[error("console lifecycle failed: {0}")]
    Lifecycle(#[from] LifecycleError),
    #[error("console session ended with an error: {0}")]
    Session(String),
}
