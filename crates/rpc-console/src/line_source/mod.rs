//! Line sources feeding the run loop.
//!
//! A [`LineSource`] yields one line per call. [`PipedSource`] prints the prompt
//! and performs a plain buffered read; [`InteractiveSource`] drives a
//! `rustyline` editor on a dedicated thread with method-name completion.
//! [`TerminalAwareSource`] picks between them on every read depending on
//! whether stdin is a terminal, so redirecting input mid-session is honoured.
//!
//! End of input is an ordinary [`ReadOutcome`], not an error. Errors returned
//! by a source end the session.

mod completion_helper;
mod interactive;
mod piped;

use std::io::{self, BufReader, IsTerminal, Stdin, Write};
use std::path::PathBuf;
use std::string::FromUtf8Error;

use thiserror::Error;

use crate::completion::CompletionEngine;
use crate::console::CancelToken;

pub use self::interactive::InteractiveSource;
pub use self::piped::PipedSource;

pub(crate) use self::completion_helper::CompletionHelper;

/// Tracing target for line source operations.
pub(crate) const LINE_SOURCE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::line_source");

/// Result of asking a source for a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A line without its terminator.
    Line(String),
    /// A line whose bytes are not valid UTF-8; reported and skipped.
    Undecodable(FromUtf8Error),
    /// The source is exhausted.
    EndOfInput,
    /// Cancellation was observed before a line arrived.
    Cancelled,
}

/// Everything a source needs to produce the next line.
pub struct LineRequest<'a> {
    /// Prompt to render before reading.
    pub prompt: &'a str,
    /// The console's output stream.
    pub output: &'a mut dyn Write,
    /// Cancellation flag of the running loop.
    pub cancel: &'a CancelToken,
    /// Completion over the registry snapshot taken at start-up.
    pub completion: &'a CompletionEngine,
}

/// Failures that end the session.
#[derive(Debug, Error)]
pub enum LineSourceError {
    /// Reading the input stream or writing the prompt failed.
    #[error("failed to read input: {0}")]
    Io(#[from] io::Error),
    /// The line editor reported an error other than end of input.
    #[error("line editor failed: {0}")]
    Editor(String),
    /// The line editor thread is gone.
    #[error("line editor thread exited unexpectedly")]
    EditorUnavailable,
}

/// Produces input lines for the run loop.
pub trait LineSource: Send {
    /// Reads the next line.
    ///
    /// # Errors
    ///
    /// Returns [`LineSourceError`] when the source fails; the session ends.
    fn read_line(&mut self, request: LineRequest<'_>) -> Result<ReadOutcome, LineSourceError>;
}

impl<S: LineSource + ?Sized> LineSource for Box<S> {
    fn read_line(&mut self, request: LineRequest<'_>) -> Result<ReadOutcome, LineSourceError> {
        (**self).read_line(request)
    }
}

/// Reports whether standard input is attached to a terminal.
pub trait TerminalProbe: Send {
    /// Returns `true` when reads should use the interactive editor.
    fn stdin_is_terminal(&self) -> bool;
}

/// Probe backed by [`IsTerminal`] on the process's stdin.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinProbe;

impl TerminalProbe for StdinProbe {
    fn stdin_is_terminal(&self) -> bool {
        io::stdin().is_terminal()
    }
}

impl<F> TerminalProbe for F
where
    F: Fn() -> bool + Send,
{
    fn stdin_is_terminal(&self) -> bool {
        self()
    }
}

/// Chooses the interactive or piped source on every read.
#[derive(Debug)]
pub struct TerminalAwareSource<P, I, N> {
    probe: P,
    interactive: I,
    piped: N,
}

/// Terminal-aware source over the process's stdin.
pub type StdinSource = TerminalAwareSource<StdinProbe, InteractiveSource, PipedSource<BufReader<Stdin>>>;

impl<P, I, N> TerminalAwareSource<P, I, N> {
    /// Combines a probe with the two sources it selects between.
    pub const fn new(probe: P, interactive: I, piped: N) -> Self {
        Self {
            probe,
            interactive,
            piped,
        }
    }
}

impl StdinSource {
    /// Source reading the process's stdin, persisting interactive history to
    /// `history_file` when given.
    #[must_use]
    pub fn stdin(history_file: Option<PathBuf>) -> Self {
        Self::new(
            StdinProbe,
            InteractiveSource::new(history_file),
            PipedSource::new(BufReader::new(io::stdin())),
        )
    }
}

impl<P, I, N> LineSource for TerminalAwareSource<P, I, N>
where
    P: TerminalProbe,
    I: LineSource,
    N: LineSource,
{
    fn read_line(&mut self, request: LineRequest<'_>) -> Result<ReadOutcome, LineSourceError> {
        if self.probe.stdin_is_terminal() {
            self.interactive.read_line(request)
        } else {
            self.piped.read_line(request)
        }
    }
}
