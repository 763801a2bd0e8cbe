//! Test support utilities for console behavioural coverage.
//!
//! Supplies a scripted line source fed from the test thread, a shared
//! transcript buffer, and a dispatcher that records every call, so step
//! definitions and unit tests stay focused on their assertions.

use std::cell::RefCell;
use std::ffi::OsString;
use std::io::{self, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail, ensure};
use rpc_console_config::Config;
use rstest::fixture;
use serde_json::Value;

use crate::config::ConfigLoader;
use crate::errors::AppError;
use crate::{
    CompletionEngine, Console, DispatchError, Dispatcher, LifecycleError, LineRequest, LineSource,
    LineSourceError, LoopExit, MethodTable, ReadOutcome, SessionId, install_builtins,
};

const POLL: Duration = Duration::from_millis(5);
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

pub(super) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(super) fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

enum ScriptEvent {
    Line(String),
    End,
}

/// Sends lines to a [`ScriptedSource`] from the test thread.
#[derive(Clone)]
pub(super) struct ScriptFeed {
    events: Sender<ScriptEvent>,
}

impl ScriptFeed {
    pub(super) fn line(&self, line: &str) -> Result<()> {
        self.events
            .send(ScriptEvent::Line(line.to_owned()))
            .map_err(|_| anyhow!("scripted source dropped"))
    }

    pub(super) fn end(&self) -> Result<()> {
        self.events
            .send(ScriptEvent::End)
            .map_err(|_| anyhow!("scripted source dropped"))
    }
}

/// Line source that blocks until the test feeds a line, polling for
/// cancellation while it waits.
pub(super) struct ScriptedSource {
    events: Receiver<ScriptEvent>,
}

impl ScriptedSource {
    pub(super) fn new() -> (Self, ScriptFeed) {
        let (sender, receiver) = mpsc::channel();
        (Self { events: receiver }, ScriptFeed { events: sender })
    }
}

impl LineSource for ScriptedSource {
    fn read_line(&mut self, request: LineRequest<'_>) -> Result<ReadOutcome, LineSourceError> {
        request.output.write_all(request.prompt.as_bytes())?;
        request.output.flush()?;
        loop {
            match self.events.recv_timeout(POLL) {
                Ok(ScriptEvent::Line(line)) => return Ok(ReadOutcome::Line(line)),
                Ok(ScriptEvent::End) | Err(RecvTimeoutError::Disconnected) => {
                    return Ok(ReadOutcome::EndOfInput);
                }
                Err(RecvTimeoutError::Timeout) if request.cancel.is_cancelled() => {
                    return Ok(ReadOutcome::Cancelled);
                }
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }
}

/// Cloneable writer capturing everything the console prints.
#[derive(Clone, Default)]
pub(super) struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub(super) fn text(&self) -> Result<String> {
        let bytes = self
            .bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        String::from_utf8(bytes).context("transcript is not UTF-8")
    }

    /// Waits until the transcript contains `snippet`.
    pub(super) fn wait_for(&self, snippet: &str) -> Result<()> {
        let deadline = Instant::now() + SETTLE_TIMEOUT;
        loop {
            let text = self.text()?;
            if text.contains(snippet) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                bail!("transcript {text:?} never contained {snippet:?}");
            }
            thread::sleep(POLL);
        }
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A dispatched call as seen by [`RecordingDispatcher`].
#[derive(Debug, Clone, PartialEq)]
pub(super) struct RecordedCall {
    pub(super) method: String,
    pub(super) arguments: Vec<Value>,
}

/// Built-in method table that records every invocation.
#[derive(Default)]
pub(super) struct RecordingDispatcher {
    table: MethodTable,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingDispatcher {
    pub(super) fn with_builtins() -> Self {
        let dispatcher = Self::default();
        install_builtins(&dispatcher.table);
        dispatcher
    }

    pub(super) fn register_echo(&self, name: &str) {
        self.table
            .register(name, |call| Ok(Value::Array(call.arguments)));
    }

    pub(super) fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Dispatcher for RecordingDispatcher {
    fn method_names(&self, session: SessionId) -> Vec<String> {
        self.table.method_names(session)
    }

    fn invoke(
        &self,
        session: SessionId,
        method: &str,
        arguments: Vec<Value>,
    ) -> Result<Value, DispatchError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                method: method.to_owned(),
                arguments: arguments.clone(),
            });
        self.table.invoke(session, method, arguments)
    }
}

pub(super) struct TestWorld {
    pub(super) dispatcher: Arc<RecordingDispatcher>,
    pub(super) console: Console<RecordingDispatcher>,
    pub(super) feed: ScriptFeed,
    pub(super) transcript: SharedBuffer,
    pub(super) lifecycle_error: Option<LifecycleError>,
    pub(super) exit: Option<LoopExit>,
}

impl Default for TestWorld {
    fn default() -> Self {
        let dispatcher = Arc::new(RecordingDispatcher::with_builtins());
        let (source, feed) = ScriptedSource::new();
        let transcript = SharedBuffer::default();
        let console = Console::new(Arc::clone(&dispatcher), source, transcript.clone());
        Self {
            dispatcher,
            console,
            feed,
            transcript,
            lifecycle_error: None,
            exit: None,
        }
    }
}

impl TestWorld {
    pub(super) fn start(&mut self) {
        if let Err(error) = self.console.start() {
            self.lifecycle_error = Some(error);
        }
    }

    pub(super) fn wait(&mut self) -> Result<()> {
        let exit = self.console.wait().context("console wait")?;
        self.exit = Some(exit);
        Ok(())
    }

    pub(super) fn stop(&mut self) -> Result<()> {
        self.console.stop().context("console stop")?;
        self.wait()
    }

    pub(super) fn completion(&self) -> CompletionEngine {
        CompletionEngine::new(self.console.registry().clone())
    }

    pub(super) fn take_lifecycle_error(&mut self) -> Result<LifecycleError> {
        self.lifecycle_error
            .take()
            .context("expected a lifecycle error")
    }

    pub(super) fn assert_exit(&self, expected: &LoopExit) -> Result<()> {
        let exit = self.exit.as_ref().context("loop exit recorded")?;
        ensure!(exit == expected, "expected exit {expected:?}, got {exit:?}");
        Ok(())
    }

    pub(super) fn assert_transcript_contains(&self, snippet: &str) -> Result<()> {
        let text = self.transcript.text()?;
        ensure!(
            text.contains(snippet),
            "transcript {text:?} did not contain {snippet:?}"
        );
        Ok(())
    }

    pub(super) fn assert_transcript_lacks(&self, snippet: &str) -> Result<()> {
        let text = self.transcript.text()?;
        ensure!(
            !text.contains(snippet),
            "transcript {text:?} unexpectedly contained {snippet:?}"
        );
        Ok(())
    }
}

#[fixture]
pub(super) fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::default())
}
