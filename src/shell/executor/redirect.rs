use std::ffi::{CStr, CString};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;

use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{close, dup2};
use thiserror::Error;

use super::error::ExecError;
use super::plan::Binding;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdin,
    Stdout,
    Stderr,
}

impl Stream {
    pub fn fd(self) -> RawFd {
        match self {
            Stream::Stdin => libc::STDIN_FILENO,
            Stream::Stdout => libc::STDOUT_FILENO,
            Stream::Stderr => libc::STDERR_FILENO,
        }
    }

    fn open_flags(self) -> OFlag {
        match self {
            Stream::Stdin => OFlag::O_RDONLY,
            Stream::Stdout | Stream::Stderr => OFlag::O_RDWR | OFlag::O_CREAT | OFlag::O_TRUNC,
        }
    }
}

/// rw-rw-r--, before the umask.
const CREATE_MODE: libc::mode_t = 0o664;

/// A [`Binding`] with its path already converted for the system calls, so
/// the child has nothing left to fail on but the calls themselves.
#[derive(Debug)]
pub enum Wiring {
    Inherit,
    PipeRead(usize),
    PipeWrite(usize),
    File(CString),
}

impl TryFrom<&Binding> for Wiring {
    type Error = ExecError;

    fn try_from(binding: &Binding) -> Result<Self, Self::Error> {
        Ok(match binding {
            Binding::Inherit => Wiring::Inherit,
            Binding::PipeRead(i) => Wiring::PipeRead(*i),
            Binding::PipeWrite(i) => Wiring::PipeWrite(*i),
            Binding::File(path) => Wiring::File(
                CString::new(path.as_os_str().as_bytes())
                    .map_err(|_| ExecError::InvalidArgument(path.display().to_string()))?,
            ),
        })
    }
}

/// A setup step that failed inside a child. Fatal to that child only.
#[derive(Debug, Error)]
#[error("{context}: {}", .errno.desc())]
pub struct SetupError {
    context: String,
    errno: nix::Error,
}

impl SetupError {
    fn new(context: impl Into<String>, errno: nix::Error) -> Self {
        Self {
            context: context.into(),
            errno,
        }
    }
}

/// Installs the child's standard streams. Runs between fork and exec.
///
/// Pipe ends are installed first and then every pipe descriptor is closed,
/// used or not, so the exec'd program holds no stray write end that would
/// keep a reader waiting. File redirections come last and therefore replace
/// a pipe end bound to the same stream.
pub fn wire_child(
    streams: &[(Stream, &Wiring)],
    pipes: &[(OwnedFd, OwnedFd)],
) -> Result<(), SetupError> {
    for (stream, wiring) in streams {
        let end = match wiring {
            Wiring::PipeRead(i) => &pipes[*i].0,
            Wiring::PipeWrite(i) => &pipes[*i].1,
            Wiring::Inherit | Wiring::File(_) => continue,
        };
        dup2(end.as_raw_fd(), stream.fd()).map_err(|e| SetupError::new("dup2", e))?;
    }

    for (read, write) in pipes {
        close(read.as_raw_fd()).map_err(|e| SetupError::new("close", e))?;
        close(write.as_raw_fd()).map_err(|e| SetupError::new("close", e))?;
    }

    for (stream, wiring) in streams {
        if let Wiring::File(path) = wiring {
            redirect_file(path, *stream)?;
        }
    }
    Ok(())
}

fn redirect_file(path: &CStr, stream: Stream) -> Result<(), SetupError> {
    let fd = open(
        path,
        stream.open_flags(),
        Mode::from_bits_truncate(CREATE_MODE),
    )
    .map_err(|e| SetupError::new(path.to_string_lossy(), e))?;

    // the lowest free descriptor may already be the target
    if fd != stream.fd() {
        dup2(fd, stream.fd()).map_err(|e| SetupError::new("dup2", e))?;
        close(fd).map_err(|e| SetupError::new("close", e))?;
    }
    Ok(())
}
