//! The read, echo, parse, dispatch and render cycle.

use std::io::{self, Write};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error};

use super::error::LineError;
use super::state::LoopExit;
use super::task::CancelToken;
use super::{CONSOLE_TARGET, Shared};
use crate::completion::CompletionEngine;
use crate::dispatch::{Dispatcher, SESSION_ID};
use crate::line_source::{LineRequest, LineSource, ReadOutcome};
use crate::protocol::parse_line;

/// Resources moved into the loop thread and handed back when it exits.
pub(crate) struct LoopParts {
    pub(crate) source: Box<dyn LineSource>,
    pub(crate) output: Box<dyn Write + Send>,
}

pub(crate) struct RunLoop<D: ?Sized> {
    pub(crate) dispatcher: Arc<D>,
    pub(crate) shared: Arc<Shared>,
    pub(crate) completion: CompletionEngine,
    pub(crate) parts: LoopParts,
}

impl<D: Dispatcher + ?Sized> RunLoop<D> {
    /// Runs until end of input, cancellation or a session-ending failure.
    pub(crate) fn run(mut self, cancel: &CancelToken) -> (LoopParts, LoopExit) {
        let exit = self.cycle(cancel);
        match &exit {
            LoopExit::Failed(reason) => {
                error!(target: CONSOLE_TARGET, %reason, "console session failed");
            }
            LoopExit::EndOfInput | LoopExit::Cancelled => {
                debug!(target: CONSOLE_TARGET, ?exit, "console loop finished");
            }
        }
        if let Err(error) = self.parts.output.flush() {
            debug!(target: CONSOLE_TARGET, %error, "final flush failed");
        }
        (self.parts, exit)
    }

    fn cycle(&mut self, cancel: &CancelToken) -> LoopExit {
        loop {
            if cancel.is_cancelled() {
                return LoopExit::Cancelled;
            }
            let prompt = self.shared.prompt();
            let request = LineRequest {
                prompt: &prompt,
                output: self.parts.output.as_mut(),
                cancel,
                completion: &self.completion,
            };
            let (line, rejected) = match self.parts.source.read_line(request) {
                Ok(ReadOutcome::Line(line)) => (line, None),
                Ok(ReadOutcome::Undecodable(error)) => {
                    let rejected = LineError::Encoding(error.utf8_error());
                    (String::from_utf8_lossy(error.as_bytes()).into_owned(), Some(rejected))
                }
                Ok(ReadOutcome::EndOfInput) => return LoopExit::EndOfInput,
                Ok(ReadOutcome::Cancelled) => return LoopExit::Cancelled,
                Err(error) => return LoopExit::Failed(error.to_string()),
            };
            if cancel.is_cancelled() {
                debug!(target: CONSOLE_TARGET, "discarding line read after cancellation");
                return LoopExit::Cancelled;
            }
            if let Err(error) = self.process(&line, rejected) {
                return LoopExit::Failed(format!("failed to write output: {error}"));
            }
        }
    }

    /// Echoes `line`, then prints its result or error. A line rejected while
    /// reading is echoed with replacement characters and never dispatched.
    fn process(&mut self, line: &str, rejected: Option<LineError>) -> io::Result<()> {
        let output = &mut self.parts.output;
        writeln!(output, "{line}")?;
        let evaluated = rejected.map_or_else(
            || evaluate(self.dispatcher.as_ref(), &self.shared, line),
            Err,
        );
        match evaluated {
            Ok(Some(rendered)) => writeln!(output, "{rendered}")?,
            Ok(None) => {}
            Err(error) => {
                debug!(target: CONSOLE_TARGET, %error, "line rejected");
                writeln!(output, "{error}")?;
            }
        }
        output.flush()
    }
}

fn evaluate<D: Dispatcher + ?Sized>(
    dispatcher: &D,
    shared: &Shared,
    line: &str,
) -> Result<Option<String>, LineError> {
    let Some(call) = parse_line(line)? else {
        return Ok(None);
    };
    let method = call.method();
    let arguments: Vec<Value> = call.arguments().to_vec();
    let result = dispatcher.invoke(SESSION_ID, method, arguments)?;
    let rendered = shared
        .formatters
        .render(method, &result, call.elements())
        .map_err(LineError::Render)?;
    Ok(Some(rendered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{DispatchError, MockDispatcher};
    use crate::line_source::{LineSourceError, PipedSource};
    use mockall::predicate::eq;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::sync::Mutex;

    struct Lines(VecDeque<&'static str>);

    impl LineSource for Lines {
        fn read_line(&mut self, request: LineRequest<'_>) -> Result<ReadOutcome, LineSourceError> {
            request.output.write_all(request.prompt.as_bytes())?;
            Ok(self
                .0
                .pop_front()
                .map_or(ReadOutcome::EndOfInput, |line| ReadOutcome::Line(line.to_owned())))
        }
    }

    #[derive(Clone, Default)]
    struct Transcript(Arc<Mutex<Vec<u8>>>);

    impl Write for Transcript {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("transcript lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transcript {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().expect("transcript lock").clone()).expect("utf-8")
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn run_lines(
        dispatcher: MockDispatcher,
        lines: &[&'static str],
        shared: Shared,
    ) -> (LoopExit, String) {
        let transcript = Transcript::default();
        let run_loop = RunLoop {
            dispatcher: Arc::new(dispatcher),
            shared: Arc::new(shared),
            completion: CompletionEngine::default(),
            parts: LoopParts {
                source: Box::new(Lines(lines.iter().copied().collect())),
                output: Box::new(transcript.clone()),
            },
        };
        let (_, exit) = run_loop.run(&CancelToken::new());
        (exit, transcript.text())
    }

    #[test]
    fn blank_lines_are_echoed_but_never_dispatched() {
        let mut dispatcher = MockDispatcher::new();
        dispatcher.expect_invoke().never();
        let (exit, transcript) = run_lines(dispatcher, &["", "   ", "[]"], Shared::new("> "));
        assert_eq!(exit, LoopExit::EndOfInput);
        assert_eq!(transcript, "> \n>    \n> []\n> ");
    }

    #[test]
    fn results_are_pretty_printed_after_the_echo() {
        let mut dispatcher = MockDispatcher::new();
        dispatcher
            .expect_invoke()
            .with(eq(SESSION_ID), eq("info"), eq(vec![json!(1)]))
            .times(1)
            .returning(|_, _, _| Ok(json!({"height": 1})));
        let (_, transcript) = run_lines(dispatcher, &["info 1"], Shared::new("> "));
        assert_eq!(transcript, "> info 1\n{\n  \"height\": 1\n}\n> ");
    }

    #[test]
    fn dispatch_errors_are_printed_and_the_loop_continues() {
        let mut dispatcher = MockDispatcher::new();
        dispatcher
            .expect_invoke()
            .with(eq(SESSION_ID), eq("nope"), eq(Vec::<Value>::new()))
            .returning(|_, method, _| Err(DispatchError::unknown_method(method)));
        dispatcher
            .expect_invoke()
            .with(eq(SESSION_ID), eq("ok"), eq(Vec::<Value>::new()))
            .returning(|_, _, _| Ok(Value::Bool(true)));
        let (exit, transcript) = run_lines(dispatcher, &["nope", "ok"], Shared::new(""));
        assert_eq!(exit, LoopExit::EndOfInput);
        assert_eq!(transcript, "nope\nunknown method: nope\nok\ntrue\n");
    }

    #[test]
    fn formatter_receives_the_full_call() {
        let mut dispatcher = MockDispatcher::new();
        dispatcher
            .expect_invoke()
            .returning(|_, _, _| Ok(json!(3)));
        let shared = Shared::new("");
        shared
            .formatters
            .set("count", |result, call| format!("{result} from {}", Value::from(call.to_vec())));
        let (_, transcript) = run_lines(dispatcher, &["count \"a\""], shared);
        assert_eq!(transcript, "count \"a\"\n3 from [\"count\",\"a\"]\n");
    }

    #[test]
    fn undecodable_lines_are_reported_and_the_loop_continues() {
        let mut dispatcher = MockDispatcher::new();
        dispatcher
            .expect_invoke()
            .with(eq(SESSION_ID), eq("echo"), eq(vec![json!("ok")]))
            .times(1)
            .returning(|_, _, _| Ok(json!(["ok"])));
        let transcript = Transcript::default();
        let run_loop = RunLoop {
            dispatcher: Arc::new(dispatcher),
            shared: Arc::new(Shared::new("")),
            completion: CompletionEngine::default(),
            parts: LoopParts {
                source: Box::new(PipedSource::new(Cursor::new(&b"echo \xff\necho ok\n"[..]))),
                output: Box::new(transcript.clone()),
            },
        };
        let (_, exit) = run_loop.run(&CancelToken::new());
        assert_eq!(exit, LoopExit::EndOfInput);
        let text = transcript.text();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("echo \u{fffd}"));
        assert!(
            lines.next().is_some_and(|line| line.starts_with("line is not valid UTF-8")),
            "transcript: {text:?}"
        );
        assert_eq!(lines.next(), Some("echo ok"));
    }

    /// Observes cancellation only after a line has already been read.
    struct CancelsWhileReading {
        cancel: CancelToken,
    }

    impl LineSource for CancelsWhileReading {
        fn read_line(&mut self, request: LineRequest<'_>) -> Result<ReadOutcome, LineSourceError> {
            request.output.write_all(request.prompt.as_bytes())?;
            self.cancel.cancel();
            Ok(ReadOutcome::Line(String::from("echo late")))
        }
    }

    #[test]
    fn lines_read_after_cancellation_are_discarded() {
        let mut dispatcher = MockDispatcher::new();
        dispatcher.expect_invoke().never();
        let transcript = Transcript::default();
        let cancel = CancelToken::new();
        let run_loop = RunLoop {
            dispatcher: Arc::new(dispatcher),
            shared: Arc::new(Shared::new("> ")),
            completion: CompletionEngine::default(),
            parts: LoopParts {
                source: Box::new(CancelsWhileReading {
                    cancel: cancel.clone(),
                }),
                output: Box::new(transcript.clone()),
            },
        };
        let (_, exit) = run_loop.run(&cancel);
        assert_eq!(exit, LoopExit::Cancelled);
        assert_eq!(transcript.text(), "> ");
    }

    #[test]
    fn cancellation_before_the_first_read_produces_no_output() {
        let transcript = Transcript::default();
        let cancel = CancelToken::new();
        cancel.cancel();
        let run_loop = RunLoop {
            dispatcher: Arc::new(MockDispatcher::new()),
            shared: Arc::new(Shared::new("> ")),
            completion: CompletionEngine::default(),
            parts: LoopParts {
                source: Box::new(Lines(VecDeque::from(["unread"]))),
                output: Box::new(transcript.clone()),
            },
        };
        let (_, exit) = run_loop.run(&cancel);
        assert_eq!(exit, LoopExit::Cancelled);
        assert!(transcript.text().is_empty());
    }

    #[test]
    fn output_failures_end_the_session() {
        let mut dispatcher = MockDispatcher::new();
        dispatcher.expect_invoke().never();
        let run_loop = RunLoop {
            dispatcher: Arc::new(dispatcher),
            shared: Arc::new(Shared::new("")),
            completion: CompletionEngine::default(),
            parts: LoopParts {
                source: Box::new(Lines(VecDeque::from(["echo 1", "echo 2"]))),
                output: Box::new(BrokenPipe),
            },
        };
        let (_, exit) = run_loop.run(&CancelToken::new());
        assert!(matches!(exit, LoopExit::Failed(reason) if reason.starts_with("failed to write output")));
    }
}
