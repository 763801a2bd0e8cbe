//! Shared configuration for the RPC console.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, then an
//! optional TOML file (`--config-path` or `RPC_CONSOLE_CONFIG_PATH`), then
//! `RPC_CONSOLE_*` environment variables, and finally command-line flags.

mod defaults;
mod logging;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_PROMPT, default_log_filter, default_log_filter_string,
    default_log_format, default_prompt, default_prompt_string,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved console configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "RPC_CONSOLE")]
pub struct Config {
    /// Prompt rendered before each line is read.
    ///
    /// Values from `RPC_CONSOLE_PROMPT` are trimmed, so a trailing space must
    /// be set through the configuration file or `--prompt`.
    #[ortho_config(default = default_prompt_string())]
    pub prompt: String,
    /// Tracing filter expression (for example `warn` or `rpc_console=debug`).
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for diagnostics written to stderr.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Optional file used to persist interactive line history.
    pub history_file: Option<Utf8PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: default_prompt_string(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            history_file: None,
        }
    }
}

impl Config {
    /// Prompt rendered before each line is read.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format for diagnostics.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// File used to persist interactive history, when configured.
    #[must_use]
    pub fn history_file(&self) -> Option<&Utf8Path> {
        self.history_file.as_deref()
    }
}
