//! Console lifecycle: start, stop, wait and reset around a background loop.
//!
//! A [`Console`] owns a line source and an output stream. `start()` snapshots
//! the dispatcher's method names for completion and moves both resources
//! onto a dedicated `rpc-console` thread running the cycle. `stop()` cancels
//! and joins; `wait()` joins without cancelling. Either way the thread hands
//! the resources back, which is what lets `reset()` prepare the console for a
//! second run.
//!
//! Cancellation is cooperative. The loop checks its token before every read
//! and again when a read returns, so a line that arrives after `stop()` is
//! discarded unprocessed. Interactive reads notice cancellation within a poll
//! interval; a piped read blocks `stop()` until the stream yields a line or
//! ends.

mod error;
mod run_loop;
mod state;
mod task;

use std::fmt;
use std::io::Write;
use std::sync::mpsc;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::completion::CompletionEngine;
use crate::dispatch::{Dispatcher, SESSION_ID};
use crate::formatter::FormatterRegistry;
use crate::line_source::LineSource;
use crate::registry::CommandRegistry;

use self::run_loop::{LoopParts, RunLoop};
use self::task::PendingTask;

pub use self::error::{LifecycleError, LineError};
pub use self::state::{LoopExit, RunState};
pub use self::task::CancelToken;

/// Tracing target for console lifecycle and loop events.
pub(crate) const CONSOLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::console");

const LOOP_THREAD: &str = "rpc-console";

/// State read by the loop and written by the owner at any time.
pub(crate) struct Shared {
    prompt: RwLock<String>,
    pub(crate) formatters: FormatterRegistry,
}

impl Shared {
    pub(crate) fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: RwLock::new(prompt.into()),
            formatters: FormatterRegistry::new(),
        }
    }

    pub(crate) fn prompt(&self) -> String {
        self.prompt
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_prompt(&self, prompt: String) {
        *self.prompt.write().unwrap_or_else(PoisonError::into_inner) = prompt;
    }
}

type LoopTask = PendingTask<Option<(LoopParts, LoopExit)>>;

/// Interactive front end forwarding each input line to a [`Dispatcher`].
pub struct Console<D: ?Sized> {
    dispatcher: Arc<D>,
    shared: Arc<Shared>,
    registry: CommandRegistry,
    parts: Option<LoopParts>,
    task: Option<LoopTask>,
    state: RunState,
    exit: Option<LoopExit>,
}

impl<D: ?Sized> fmt::Debug for Console<D> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Console")
            .field("state", &self.state())
            .field("prompt", &self.shared.prompt())
            .field("registry", &self.registry)
            .field("exit", &self.exit)
            .finish_non_exhaustive()
    }
}

impl<D> Console<D>
where
    D: Dispatcher + ?Sized + 'static,
{
    /// Creates a console that reads from `source` and writes to `output`.
    ///
    /// The prompt starts empty.
    pub fn new<S, W>(dispatcher: Arc<D>, source: S, output: W) -> Self
    where
        S: LineSource + 'static,
        W: Write + Send + 'static,
    {
        Self {
            dispatcher,
            shared: Arc::new(Shared::new(String::new())),
            registry: CommandRegistry::default(),
            parts: Some(LoopParts {
                source: Box::new(source),
                output: Box::new(output),
            }),
            task: None,
            state: RunState::NotStarted,
            exit: None,
        }
    }

    /// Starts the loop on a background thread.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadyRunning`] while a loop is active,
    /// [`LifecycleError::Stopped`] when the console must be reset first, and
    /// [`LifecycleError::Spawn`] when the thread cannot be created.
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        let state = self.state();
        if state.is_active() {
            return Err(LifecycleError::AlreadyRunning);
        }
        if state == RunState::Stopped {
            return Err(LifecycleError::Stopped);
        }
        let Some(parts) = self.parts.take() else {
            return Err(LifecycleError::ResourcesLost);
        };

        self.registry = CommandRegistry::new(self.dispatcher.method_names(SESSION_ID));
        let (handoff, inbox) = mpsc::sync_channel::<LoopParts>(1);
        let dispatcher = Arc::clone(&self.dispatcher);
        let shared = Arc::clone(&self.shared);
        let completion = CompletionEngine::new(self.registry.clone());
        let spawned = PendingTask::spawn(LOOP_THREAD, move |cancel| {
            let parts = inbox.recv().ok()?;
            let run_loop = RunLoop {
                dispatcher,
                shared,
                completion,
                parts,
            };
            Some(run_loop.run(&cancel))
        });

        let task = match spawned {
            Ok(task) => task,
            Err(error) => {
                self.parts = Some(parts);
                return Err(LifecycleError::Spawn(error));
            }
        };
        if let Err(mpsc::SendError(parts)) = handoff.send(parts) {
            self.parts = Some(parts);
            return Err(LifecycleError::TaskPanicked);
        }
        info!(
            target: CONSOLE_TARGET,
            methods = self.registry.len(),
            "console started"
        );
        self.task = Some(task);
        self.state = RunState::Running;
        Ok(())
    }

    /// Cancels the loop and blocks until it has exited.
    ///
    /// Does nothing when no loop is active. Once this returns the console
    /// writes no further output.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::TaskPanicked`] when the loop thread panicked.
    pub fn stop(&mut self) -> Result<(), LifecycleError> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        task.request_cancel();
        self.state = RunState::CancelRequested;
        debug!(target: CONSOLE_TARGET, "console stop requested");
        self.join(task).map(|_| ())
    }

    /// Blocks until the loop exits on its own and reports how it ended.
    ///
    /// Calling it again after the loop stopped returns the recorded exit.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotStarted`] when no loop has run and
    /// [`LifecycleError::TaskPanicked`] when the loop thread panicked.
    pub fn wait(&mut self) -> Result<LoopExit, LifecycleError> {
        if let Some(task) = self.task.take() {
            return self.join(task);
        }
        self.exit.clone().ok_or(LifecycleError::NotStarted)
    }

    /// Returns a stopped console to [`RunState::NotStarted`].
    ///
    /// The line source and output recovered from the finished loop are kept,
    /// as are the prompt and formatters.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadyRunning`] while the loop is still
    /// executing and [`LifecycleError::ResourcesLost`] when the loop thread
    /// panicked and took the resources with it.
    pub fn reset(&mut self) -> Result<(), LifecycleError> {
        let state = self.state();
        if state.is_active() {
            return Err(LifecycleError::AlreadyRunning);
        }
        if state == RunState::NotStarted {
            return Ok(());
        }
        if let Some(task) = self.task.take() {
            self.join(task).map_err(|_| LifecycleError::ResourcesLost)?;
        }
        if self.parts.is_none() {
            return Err(LifecycleError::ResourcesLost);
        }
        self.state = RunState::NotStarted;
        self.exit = None;
        debug!(target: CONSOLE_TARGET, "console reset");
        Ok(())
    }

    fn join(&mut self, task: LoopTask) -> Result<LoopExit, LifecycleError> {
        let outcome = task.await_completion();
        self.state = RunState::Stopped;
        match outcome {
            Ok(Some((parts, exit))) => {
                self.parts = Some(parts);
                self.exit = Some(exit.clone());
                Ok(exit)
            }
            Ok(None) | Err(_) => {
                self.exit = Some(LoopExit::Failed(LifecycleError::TaskPanicked.to_string()));
                Err(LifecycleError::TaskPanicked)
            }
        }
    }
}

impl<D: ?Sized> Console<D> {
    /// Current lifecycle state.
    ///
    /// A loop that finished on its own reports [`RunState::Stopped`] even
    /// before it is joined.
    #[must_use]
    pub fn state(&self) -> RunState {
        match &self.task {
            Some(task) if task.is_finished() => RunState::Stopped,
            Some(task) if task.is_cancel_requested() => RunState::CancelRequested,
            _ => self.state,
        }
    }

    /// Replaces the prompt; the next read uses it.
    pub fn set_prompt(&self, prompt: impl Into<String>) {
        self.shared.set_prompt(prompt.into());
    }

    /// Prompt shown before each read.
    #[must_use]
    pub fn prompt(&self) -> String {
        self.shared.prompt()
    }

    /// Registers `formatter` for results of `method`, replacing any previous
    /// one. Takes effect from the next line, even while running.
    pub fn set_formatter<F>(&self, method: impl Into<String>, formatter: F)
    where
        F: Fn(&Value, &[Value]) -> String + Send + Sync + 'static,
    {
        self.shared.formatters.set(method, formatter);
    }

    /// Formatters consulted when rendering results.
    #[must_use]
    pub fn formatters(&self) -> &FormatterRegistry {
        &self.shared.formatters
    }

    /// Method names captured by the most recent `start()`.
    #[must_use]
    pub const fn registry(&self) -> &CommandRegistry {
        &self.registry
    }
}

impl<D: ?Sized> Drop for Console<D> {
    fn drop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        task.request_cancel();
        if task.await_completion().is_err() {
            warn!(target: CONSOLE_TARGET, "console thread panicked during teardown");
        }
    }
}
