//! Lifecycle states and loop outcomes.

use std::fmt;

/// Lifecycle state of a console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// `start()` has not been called (or the console was reset).
    NotStarted,
    /// The run loop is active.
    Running,
    /// `stop()` was requested and the loop has not exited yet.
    CancelRequested,
    /// The run loop has exited.
    Stopped,
}

impl RunState {
    /// Returns `true` while a run loop may still be executing.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::CancelRequested)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::NotStarted => "not started",
            Self::Running => "running",
            Self::CancelRequested => "cancel requested",
            Self::Stopped => "stopped",
        })
    }
}

/// How a run loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// The line source ran out of input.
    EndOfInput,
    /// Cancellation was observed.
    Cancelled,
    /// The session ended on an unrecoverable error.
    Failed(String),
}
