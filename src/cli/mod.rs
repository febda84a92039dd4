//! Commands behind the `gg-sampler-cli` binary.
//!
//! ## Usage
//!
//! ```bash
//! gg-sampler-cli generate --tokenizer tokenizer.json --table bigram.json "Hello"
//! gg-sampler-cli config show
//! gg-sampler-cli config validate --file sampler.toml
//! ```

use std::path::PathBuf;

use thiserror::Error;

pub mod config_cmd;
pub mod generate_cmd;

pub use generate_cmd::{resolve_settings, run_generate, GenerateArgs};

/// Argument errors. Reported on stderr with exit code 1.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("Missing value for {0}")]
    MissingValue(String),
    #[error("Invalid value for {flag}: {value}")]
    InvalidValue { flag: String, value: String },
    #[error("Unknown argument: {0}")]
    UnknownArgument(String),
    #[error("Missing required argument: {0}")]
    MissingRequired(&'static str),
}

/// Cursor over command-line arguments.
pub(crate) struct ArgCursor<'a> {
    args: &'a [String],
    pos: usize,
}

impl<'a> ArgCursor<'a> {
    pub(crate) fn new(args: &'a [String]) -> Self {
        Self { args, pos: 0 }
    }

    pub(crate) fn next_arg(&mut self) -> Option<&'a str> {
        let arg = self.args.get(self.pos)?;
        self.pos += 1;
        Some(arg.as_str())
    }

    pub(crate) fn value(&mut self, flag: &str) -> Result<&'a str, CliError> {
        self.next_arg()
            .ok_or_else(|| CliError::MissingValue(flag.to_string()))
    }

    pub(crate) fn path(&mut self, flag: &str) -> Result<PathBuf, CliError> {
        self.value(flag).map(PathBuf::from)
    }

    pub(crate) fn usize(&mut self, flag: &str) -> Result<usize, CliError> {
        let value = self.value(flag)?;
        value.parse().map_err(|_| CliError::InvalidValue {
            flag: flag.to_string(),
            value: value.to_string(),
        })
    }
}
