use crate::logging::LogFormat;

/// Prompt shown before each line is read.
pub const DEFAULT_PROMPT: &str = ">>> ";

/// Default log filter expression used by the console.
///
/// Diagnostics share the terminal with the session transcript, so only
/// warnings and errors are emitted unless the operator asks for more.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Default prompt shown before each line is read.
#[must_use]
pub fn default_prompt() -> &'static str {
    DEFAULT_PROMPT
}

/// Owned prompt value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_prompt_string() -> String {
    DEFAULT_PROMPT.to_owned()
}

/// Default log filter expression used by the console.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the console.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
