//! Terminal line editing on a dedicated thread.
//!
//! `rustyline` blocks inside `readline`, so the editor lives on its own
//! `getline` thread. Each read sends a request and polls for the reply,
//! checking the cancel token between polls. A read abandoned on cancellation
//! stays outstanding; the next read on the same source waits for that reply
//! instead of issuing a second prompt.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use rustyline::error::ReadlineError;
use rustyline::history::{DefaultHistory, History};
use rustyline::{CompletionType, Config, Editor};
use tracing::{debug, warn};

use super::{
    CompletionHelper, LINE_SOURCE_TARGET, LineRequest, LineSource, LineSourceError, ReadOutcome,
};
use crate::completion::CompletionEngine;

const CANCEL_POLL: Duration = Duration::from_millis(50);
const EDITOR_THREAD: &str = "getline";

struct EditorRequest {
    prompt: String,
    completion: CompletionEngine,
}

enum EditorReply {
    Line(String),
    EndOfInput,
    Failed(String),
}

struct EditorWorker {
    requests: Sender<EditorRequest>,
    replies: Receiver<EditorReply>,
    outstanding: bool,
}

enum Poll {
    Reply(EditorReply),
    Cancelled,
    Disconnected,
}

impl EditorWorker {
    fn spawn(history_file: Option<PathBuf>) -> Result<Self, LineSourceError> {
        let (request_tx, request_rx) = mpsc::channel();
        let (reply_tx, reply_rx) = mpsc::channel();
        thread::Builder::new()
            .name(EDITOR_THREAD.to_owned())
            .spawn(move || run_editor(history_file.as_deref(), &request_rx, &reply_tx))?;
        Ok(Self {
            requests: request_tx,
            replies: reply_rx,
            outstanding: false,
        })
    }

    fn poll(&mut self, request: &LineRequest<'_>) -> Poll {
        if !self.outstanding {
            let sent = self.requests.send(EditorRequest {
                prompt: request.prompt.to_owned(),
                completion: request.completion.clone(),
            });
            if sent.is_err() {
                return Poll::Disconnected;
            }
            self.outstanding = true;
        }
        loop {
            match self.replies.recv_timeout(CANCEL_POLL) {
                Ok(reply) => {
                    self.outstanding = false;
                    return Poll::Reply(reply);
                }
                Err(RecvTimeoutError::Timeout) => {
                    if request.cancel.is_cancelled() {
                        return Poll::Cancelled;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return Poll::Disconnected,
            }
        }
    }
}

/// Line editing with history and method-name completion.
///
/// The editor thread is started on the first read. Its prompt and completion
/// are written straight to the terminal, not to the console's output stream.
pub struct InteractiveSource {
    history_file: Option<PathBuf>,
    worker: Option<EditorWorker>,
}

impl std::fmt::Debug for InteractiveSource {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("InteractiveSource")
            .field("history_file", &self.history_file)
            .field("started", &self.worker.is_some())
            .finish()
    }
}

impl InteractiveSource {
    /// Creates a source that persists history to `history_file` when given.
    #[must_use]
    pub const fn new(history_file: Option<PathBuf>) -> Self {
        Self {
            history_file,
            worker: None,
        }
    }
}

impl LineSource for InteractiveSource {
    fn read_line(&mut self, request: LineRequest<'_>) -> Result<ReadOutcome, LineSourceError> {
        request.output.flush()?;
        if self.worker.is_none() {
            self.worker = Some(EditorWorker::spawn(self.history_file.clone())?);
        }
        let Some(worker) = self.worker.as_mut() else {
            return Err(LineSourceError::EditorUnavailable);
        };
        match worker.poll(&request) {
            Poll::Reply(EditorReply::Line(line)) => Ok(ReadOutcome::Line(line)),
            Poll::Reply(EditorReply::EndOfInput) => Ok(ReadOutcome::EndOfInput),
            Poll::Reply(EditorReply::Failed(message)) => Err(LineSourceError::Editor(message)),
            Poll::Cancelled => {
                debug!(
                    target: LINE_SOURCE_TARGET,
                    "read abandoned on cancellation; reply left outstanding"
                );
                Ok(ReadOutcome::Cancelled)
            }
            Poll::Disconnected => {
                self.worker = None;
                Err(LineSourceError::EditorUnavailable)
            }
        }
    }
}

fn run_editor(
    history_file: Option<&Path>,
    requests: &Receiver<EditorRequest>,
    replies: &Sender<EditorReply>,
) {
    let config = Config::builder()
        .completion_type(CompletionType::List)
        .auto_add_history(false)
        .build();
    let mut editor = match Editor::<CompletionHelper, DefaultHistory>::with_config(config) {
        Ok(editor) => editor,
        Err(error) => {
            warn!(target: LINE_SOURCE_TARGET, %error, "line editor unavailable");
            if replies.send(EditorReply::Failed(error.to_string())).is_err() {
                debug!(target: LINE_SOURCE_TARGET, "editor reply dropped");
            }
            return;
        }
    };
    load_history(editor.history_mut(), history_file);

    for request in requests {
        install_helper(&mut editor, request.completion);
        let reply = match editor.readline(&request.prompt) {
            Ok(line) => {
                record_history(editor.history_mut(), &line, history_file);
                EditorReply::Line(line)
            }
            Err(ReadlineError::Eof) => EditorReply::EndOfInput,
            Err(ReadlineError::Interrupted) => EditorReply::Line(String::new()),
            Err(error) => EditorReply::Failed(error.to_string()),
        };
        if replies.send(reply).is_err() {
            break;
        }
    }
    debug!(target: LINE_SOURCE_TARGET, "line editor thread exiting");
}

fn install_helper(editor: &mut Editor<CompletionHelper, DefaultHistory>, completion: CompletionEngine) {
    let current = editor
        .helper()
        .is_some_and(|helper| helper.engine().registry().same_snapshot(completion.registry()));
    if !current {
        editor.set_helper(Some(CompletionHelper::new(completion)));
    }
}

fn load_history(history: &mut DefaultHistory, history_file: Option<&Path>) {
    if let Some(path) = history_file
        && let Err(error) = history.load(path)
    {
        debug!(target: LINE_SOURCE_TARGET, path = %path.display(), %error, "history not loaded");
    }
}

/// Adds a non-blank line to `history` and rewrites the history file.
fn record_history(history: &mut DefaultHistory, line: &str, history_file: Option<&Path>) {
    if line.trim().is_empty() {
        return;
    }
    if let Err(error) = history.add(line) {
        debug!(target: LINE_SOURCE_TARGET, %error, "history entry not recorded");
        return;
    }
    if let Some(path) = history_file
        && let Err(error) = history.save(path)
    {
        debug!(target: LINE_SOURCE_TARGET, path = %path.display(), %error, "history not saved");
    }
}
