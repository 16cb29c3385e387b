//! Operational errors of the driver
//!
//! Source problems are reported as rendered diagnostics before one of these
//! is returned; these cover everything around the compiler itself.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("could not read `{}`: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("could not write `{}`: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("could not create a scratch directory: {0}")]
    Scratch(#[source] io::Error),

    #[error("aborting due to {0} previous error(s)")]
    Compile(usize),

    #[error("could not run `{tool}`: {source}")]
    Spawn { tool: String, source: io::Error },

    #[error("`{tool}` failed ({status})")]
    ToolFailed { tool: String, status: ExitStatus },
}
