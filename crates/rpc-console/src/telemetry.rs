//! Diagnostics for the console binary.
//!
//! Events go to stderr; stdout carries only the session transcript. The
//! subscriber is global, so only the first [`initialise`] call installs one.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use rpc_console_config::{Config, LogFormat};
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

static INSTALLED_FORMAT: OnceCell<LogFormat> = OnceCell::new();

/// Errors raised while installing the diagnostics subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// `log_filter` is not a valid list of filter directives.
    #[error("invalid log filter {filter:?}: {reason}")]
    InvalidFilter {
        /// The rejected filter text.
        filter: String,
        /// Parser message.
        reason: String,
    },
    /// A global subscriber was installed by someone else.
    #[error("a global tracing subscriber is already installed: {0}")]
    AlreadyInstalled(#[source] SetGlobalDefaultError),
}

/// Installs the stderr subscriber described by `config`.
///
/// Returns the format in effect, which is the one chosen by the first
/// successful call.
///
/// # Examples
///
/// ```rust
/// use rpc_console::telemetry;
/// use rpc_console_config::Config;
///
/// # fn main() -> Result<(), telemetry::TelemetryError> {
/// let config = Config::default();
/// let format = telemetry::initialise(&config)?;
/// assert_eq!(telemetry::initialise(&config)?, format);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter does not parse or another
/// subscriber already owns the global default.
pub fn initialise(config: &Config) -> Result<LogFormat, TelemetryError> {
    INSTALLED_FORMAT
        .get_or_try_init(|| {
            let filter = parse_filter(config.log_filter())?;
            let format = config.log_format();
            tracing::subscriber::set_global_default(stderr_subscriber(filter, format))
                .map_err(TelemetryError::AlreadyInstalled)?;
            Ok(format)
        })
        .copied()
}

fn parse_filter(filter: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(filter).map_err(|error| TelemetryError::InvalidFilter {
        filter: filter.to_owned(),
        reason: error.to_string(),
    })
}

fn stderr_subscriber(filter: EnvFilter, format: LogFormat) -> Box<dyn Subscriber + Send + Sync> {
    // Thread names tell the loop thread apart from the line editor.
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(fmt::time::UtcTime::rfc_3339());

    match format {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    }
}
