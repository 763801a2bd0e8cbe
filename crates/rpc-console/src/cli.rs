//! Command-line flags owned by the console binary.
//!
//! Configuration flags (`--prompt`, `--log-filter` and friends) are consumed
//! by the configuration loader before this parser runs.

use clap::Parser;

/// Interactive console for invoking RPC methods.
#[derive(Parser, Debug, Default)]
#[command(name = "rpc-console", version, about)]
pub(crate) struct Cli {
    /// Prints the available methods, one per line, and exits.
    #[arg(long)]
    pub(crate) list_methods: bool,
}
