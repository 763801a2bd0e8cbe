//! Entry point for the `rpc-console` binary.
//!
//! Delegates to [`rpc_console::run`], which loads configuration, installs the
//! built-in methods and runs a console over stdin and stdout until input ends.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    rpc_console::run(std::env::args_os(), &mut io::stderr())
}
