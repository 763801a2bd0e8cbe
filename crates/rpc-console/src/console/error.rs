//! Error types for the console lifecycle and per-line failures.

use std::io;
use std::str::Utf8Error;

use thiserror::Error;

use crate::dispatch::DispatchError;
use crate::protocol::ParseError;

/// Misuse of the lifecycle API or failure to manage the loop thread.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// `start()` was called while a loop is active.
    #[error("console is already running")]
    AlreadyRunning,
    /// `start()` was called on a stopped console that was not reset.
    #[error("console has stopped; reset it before starting again")]
    Stopped,
    /// `wait()` was called before the console was ever started.
    #[error("console has not been started")]
    NotStarted,
    /// The loop thread could not be spawned.
    #[error("failed to spawn console thread: {0}")]
    Spawn(#[source] io::Error),
    /// The loop thread panicked.
    #[error("console thread panicked")]
    TaskPanicked,
    /// The line source and output were lost with a panicked loop thread.
    #[error("console resources were lost when its thread panicked")]
    ResourcesLost,
}

/// Failure of a single input line; rendered and then skipped.
#[derive(Debug, Error)]
pub enum LineError {
    /// The line was not valid UTF-8.
    #[error("line is not valid UTF-8: {0}")]
    Encoding(#[source] Utf8Error),
    /// The line could not be decoded.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The dispatcher rejected the call.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// The default printer failed to serialise the result.
    #[error("failed to render result: {0}")]
    Render(#[source] serde_json::Error),
}
