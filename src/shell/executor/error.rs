use std::io;

use thiserror::Error;

/// Failures of the interpreter's own process while setting up a run.
///
/// Everything except `InvalidArgument` means the host cannot give us the
/// pipes or processes we asked for; the driver ends the session on those.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("pipe: {}", .0.desc())]
    Pipe(nix::Error),
    #[error("fork: {}", .0.desc())]
    Fork(nix::Error),
    #[error("close: {}", .0.desc())]
    Close(nix::Error),
    #[error("{0}: argument contains a NUL byte")]
    InvalidArgument(String),
}

impl ExecError {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ExecError::InvalidArgument(_))
    }
}

#[derive(Debug, Error)]
pub enum CdError {
    #[error("cd: path expected")]
    MissingPath,
    #[error("cd: too many arguments")]
    TooManyArguments,
    #[error("cd: cannot read current directory: {0}")]
    CurrentDir(io::Error),
    #[error("{path}: {source}")]
    Change { path: String, source: io::Error },
}
