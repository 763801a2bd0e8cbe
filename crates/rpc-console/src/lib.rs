//! Interactive line-oriented console for invoking RPC methods.
//!
//! Each input line is echoed, decoded into a method name and positional JSON
//! arguments, handed to a [`Dispatcher`], and the result is rendered through
//! a per-method formatter or pretty-printed. A [`Console`] runs this cycle on
//! a background thread with cooperative cancellation, reading from a
//! terminal-aware [`LineSource`] that offers method-name completion when
//! stdin is a terminal and plain buffered reads otherwise.
//!
//! The [`run`] entry point wires the console to process stdin and stdout,
//! with configuration loaded through `rpc-console-config` and the built-in
//! methods installed on a [`MethodTable`].

pub mod completion;
pub mod console;
pub mod dispatch;
pub mod formatter;
pub mod line_source;
pub mod protocol;
pub mod registry;
pub mod telemetry;

mod cli;
mod config;
mod errors;

use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use clap::error::ErrorKind;
use rpc_console_config::Config;
use tracing::info;

pub use completion::{Completion, CompletionEngine};
pub use console::{CancelToken, Console, LifecycleError, LineError, LoopExit, RunState};
pub use dispatch::{
    DispatchError, DispatchErrorKind, Dispatcher, MethodCall, MethodHandler, MethodTable,
    SESSION_ID, SessionId, install_builtins,
};
pub use formatter::{Formatter, FormatterRegistry, render_lines};
pub use line_source::{
    InteractiveSource, LineRequest, LineSource, LineSourceError, PipedSource, ReadOutcome,
    StdinProbe, StdinSource, TerminalAwareSource, TerminalProbe,
};
pub use protocol::{Call, ParseError, parse_line};
pub use registry::CommandRegistry;

use cli::Cli;
use config::{ConfigLoader, OrthoConfigLoader, split_config_arguments};
use errors::AppError;

const APP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::app");

/// Input and output a console session runs over.
pub(crate) struct SessionStreams {
    pub(crate) source: Box<dyn LineSource>,
    pub(crate) output: Box<dyn Write + Send>,
}

impl SessionStreams {
    fn stdio(config: &Config) -> Self {
        let history_file = config
            .history_file()
            .map(|path| path.as_std_path().to_path_buf());
        Self {
            source: Box::new(StdinSource::stdin(history_file)),
            output: Box::new(io::stdout()),
        }
    }
}

/// Runs the console binary with the given arguments.
///
/// The transcript goes to stdout; usage and failure messages go to `stderr`.
#[must_use]
pub fn run<I, E>(args: I, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    E: Write,
{
    run_with_loader(args, stderr, &OrthoConfigLoader, SessionStreams::stdio)
}

pub(crate) fn run_with_loader<I, E, L, F>(
    args: I,
    stderr: &mut E,
    loader: &L,
    streams: F,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    E: Write,
    L: ConfigLoader,
    F: FnOnce(&Config) -> SessionStreams,
{
    match execute(args, loader, streams) {
        Ok(exit_code) => exit_code,
        Err(AppError::CliUsage(error))
            if matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) =>
        {
            let _ = write!(stderr, "{error}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            ExitCode::FAILURE
        }
    }
}

fn execute<I, L, F>(args: I, loader: &L, streams: F) -> Result<ExitCode, AppError>
where
    I: IntoIterator<Item = OsString>,
    L: ConfigLoader,
    F: FnOnce(&Config) -> SessionStreams,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);
    let cli = Cli::try_parse_from(split.cli_arguments(&args)).map_err(AppError::CliUsage)?;
    let config = loader.load(&split.config_arguments)?;
    telemetry::initialise(&config)?;

    let table = Arc::new(MethodTable::new());
    install_builtins(&table);
    let SessionStreams { source, mut output } = streams(&config);

    if cli.list_methods {
        write_method_list(&mut output, &table.names()).map_err(AppError::ListMethods)?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut console = Console::new(table, source, output);
    console.set_prompt(config.prompt());
    console.set_formatter("methods", render_lines);
    console.start()?;
    info!(target: APP_TARGET, prompt = config.prompt(), "console running");

    match console.wait()? {
        LoopExit::EndOfInput | LoopExit::Cancelled => Ok(ExitCode::SUCCESS),
        LoopExit::Failed(reason) => Err(AppError::Session(reason)),
    }
}

fn write_method_list(output: &mut impl Write, names: &[String]) -> io::Result<()> {
    for name in names {
        writeln!(output, "{name}")?;
    }
    output.flush()
}
