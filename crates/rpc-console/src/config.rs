//! Configuration loading for the console binary.
//!
//! Leading configuration flags are handed to `ortho_config`; everything from
//! the first other token onwards is parsed by the console's own CLI.

use std::ffi::{OsStr, OsString};

use ortho_config::OrthoConfig;
use rpc_console_config::Config;

use crate::errors::AppError;

/// Flags recognised by the configuration loader.
///
/// Keep in sync with the fields of [`Config`].
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--prompt",
    "--log-filter",
    "--log-format",
    "--history-file",
];

pub(crate) trait ConfigLoader {
    /// Loads configuration from the filtered configuration arguments.
    ///
    /// Configuration flags must precede console flags; a configuration flag
    /// after the first other token is left for the console CLI to reject.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Stop,
}

fn classify(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    if !text.starts_with("--") {
        return FlagAction::Stop;
    }
    let (flag, inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (&*text, false),
    };
    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !inline_value,
        }
    } else {
        FlagAction::Stop
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_start: usize,
}

impl ConfigArgumentSplit {
    /// Program name followed by the arguments left for the console CLI.
    pub(crate) fn cli_arguments(&self, args: &[OsString]) -> Vec<OsString> {
        args.first()
            .into_iter()
            .chain(args.get(self.command_start..).unwrap_or_default())
            .cloned()
            .collect()
    }
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some(program) = args.first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_start: 0,
        };
    };

    let mut config_arguments = vec![program.clone()];
    let mut index = 1;
    while let Some(argument) = args.get(index) {
        match classify(argument) {
            FlagAction::Include { needs_value } => {
                config_arguments.push(argument.clone());
                index += 1;
                if needs_value && let Some(value) = args.get(index) {
                    config_arguments.push(value.clone());
                    index += 1;
                }
            }
            FlagAction::Stop => break,
        }
    }

    ConfigArgumentSplit {
        config_arguments,
        command_start: index,
    }
}
