use std::env;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::error::CdError;
use super::executor::Flow;
use crate::shell::parser::ast::{Builtin, SimpleCommand};
use crate::utils::path::join_relative;

/// Runs a builtin in the interpreter's own process. Never forks and never
/// touches a descriptor; redirections on a builtin are ignored.
pub fn run(builtin: Builtin, command: &SimpleCommand) -> Flow {
    debug!("builtin {} with {} arg(s)", command.program(), command.args().len());
    match builtin {
        Builtin::Exit => Flow::Stop,
        Builtin::Cd => {
            if let Err(err) = cd(command.args()) {
                warn!("{}", err);
                eprintln!("{}", err);
            }
            Flow::Continue
        }
    }
}

fn cd(args: &[String]) -> Result<(), CdError> {
    let path = match args {
        [] => return Err(CdError::MissingPath),
        [path] => path,
        _ => return Err(CdError::TooManyArguments),
    };

    let target = resolve(path)?;
    debug!("cd {}", target.display());
    env::set_current_dir(&target).map_err(|source| CdError::Change {
        path: path.clone(),
        source,
    })
}

fn resolve(path: &str) -> Result<PathBuf, CdError> {
    if Path::new(path).is_absolute() {
        return Ok(PathBuf::from(path));
    }
    let cwd = env::current_dir().map_err(CdError::CurrentDir)?;
    Ok(join_relative(&cwd, path))
}
