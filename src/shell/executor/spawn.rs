use std::ffi::CString;
use std::io::{self, Write};
use std::os::fd::{IntoRawFd, OwnedFd};

use log::{debug, error, warn};
use nix::sys::signal::{signal, SigHandler, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{close, execvp, fork, pipe, ForkResult, Pid};

use super::error::ExecError;
use super::plan::{Plan, SpawnRequest};
use super::redirect::{self, Stream, Wiring};

/// nix 0.29 does not re-export `_exit`; call the libc function directly.
fn _exit(status: i32) -> ! {
    // SAFETY: `_exit` terminates the process immediately and never returns.
    unsafe { libc::_exit(status) }
}

struct PreparedStage {
    argv: Vec<CString>,
    stdin: Wiring,
    stdout: Wiring,
    stderr: Wiring,
}

impl PreparedStage {
    fn prepare(request: &SpawnRequest) -> Result<Self, ExecError> {
        let argv = request
            .argv
            .iter()
            .map(|arg| {
                CString::new(arg.as_str()).map_err(|_| ExecError::InvalidArgument(arg.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            argv,
            stdin: Wiring::try_from(&request.stdin)?,
            stdout: Wiring::try_from(&request.stdout)?,
            stderr: Wiring::try_from(&request.stderr)?,
        })
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub pipes: usize,
    pub spawned: usize,
    /// One entry per child that was successfully reaped, in spawn order.
    pub statuses: Vec<WaitStatus>,
}

/// Realizes a plan: one pipe per `plan.pipes`, one process per stage, then
/// blocks until every process it started has exited.
///
/// Exit statuses are collected for logging only. A failing command is not
/// an error here; failing to create a pipe or a process is.
pub fn run(plan: &Plan) -> Result<RunReport, ExecError> {
    let stages = plan
        .stages
        .iter()
        .map(PreparedStage::prepare)
        .collect::<Result<Vec<_>, _>>()?;

    let pipes = (0..plan.pipes)
        .map(|_| pipe().map_err(ExecError::Pipe))
        .collect::<Result<Vec<_>, _>>()?;

    // buffered output would otherwise be written once more by every child
    if let Err(err) = io::stdout().flush() {
        warn!("flush stdout before fork: {}", err);
    }

    let mut children = Vec::with_capacity(stages.len());
    let mut fork_error = None;
    for (stage, request) in stages.iter().zip(&plan.stages) {
        // SAFETY: the interpreter runs on one thread (forking tests hold
        // `process_lock`) and the child never returns from `exec_stage`.
        // It either execs or calls `_exit`.
        match unsafe { fork() } {
            Ok(ForkResult::Child) => exec_stage(stage, &pipes),
            Ok(ForkResult::Parent { child }) => {
                debug!("spawned {} for `{}`", child, shell_words::join(&request.argv));
                children.push(child);
            }
            Err(err) => {
                error!(
                    "fork failed after {} of {} stages: {}",
                    children.len(),
                    stages.len(),
                    err
                );
                fork_error = Some(ExecError::Fork(err));
                break;
            }
        }
    }

    // the interpreter itself reads and writes none of the pipes
    let closed = close_pipes(pipes);
    let statuses = wait_all(&children);

    if let Some(err) = fork_error {
        return Err(err);
    }
    closed?;

    Ok(RunReport {
        pipes: plan.pipes,
        spawned: children.len(),
        statuses,
    })
}

fn close_pipes(pipes: Vec<(OwnedFd, OwnedFd)>) -> Result<(), ExecError> {
    // on an early return the remaining descriptors are closed on drop
    for (read, write) in pipes {
        close(read.into_raw_fd()).map_err(ExecError::Close)?;
        close(write.into_raw_fd()).map_err(ExecError::Close)?;
    }
    Ok(())
}

fn wait_all(children: &[Pid]) -> Vec<WaitStatus> {
    children
        .iter()
        .filter_map(|&pid| match waitpid(pid, None) {
            Ok(status) => {
                debug!("reaped {}: {:?}", pid, status);
                Some(status)
            }
            Err(err) => {
                warn!("waitpid {} failed: {}", pid, err);
                eprintln!("waitpid: {}", err.desc());
                None
            }
        })
        .collect()
}

fn exec_stage(stage: &PreparedStage, pipes: &[(OwnedFd, OwnedFd)]) -> ! {
    let streams = [
        (Stream::Stdin, &stage.stdin),
        (Stream::Stdout, &stage.stdout),
        (Stream::Stderr, &stage.stderr),
    ];
    if let Err(err) = redirect::wire_child(&streams, pipes) {
        eprintln!("{}", err);
        _exit(1);
    }

    // Rust starts with SIGPIPE ignored and exec would keep it that way.
    // SAFETY: installs the default disposition, no handler code runs.
    if let Err(err) = unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) } {
        eprintln!("signal: {}", err.desc());
        _exit(1);
    }

    let program = &stage.argv[0];
    match execvp(program, &stage.argv) {
        Ok(never) => match never {},
        Err(err) => {
            eprintln!("{}: {}", program.to_string_lossy(), err.desc());
            _exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::executor::plan::Binding;
    use crate::shell::executor::process_lock;
    use crate::shell::parser::parse;
    use std::fs;

    #[allow(clippy::unwrap_used)]
    fn run_line(line: &str) -> RunReport {
        let node = parse(line).unwrap().unwrap();
        run(&Plan::build(&node)).unwrap()
    }

    fn exit_code(status: &WaitStatus) -> Option<i32> {
        match status {
            WaitStatus::Exited(_, code) => Some(*code),
            _ => None,
        }
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_single_command_one_process_no_pipe() {
        let _guard = process_lock();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("listing");

        let report = run_line(&format!("ls {} > {}", dir.path().display(), out.display()));
        assert_eq!(report.pipes, 0);
        assert_eq!(report.spawned, 1);
        assert_eq!(report.statuses.len(), 1);
        assert_eq!(exit_code(&report.statuses[0]), Some(0));
        assert_eq!(fs::read_to_string(&out).unwrap(), "listing\n");
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_output_redirect_creates_and_truncates() {
        let _guard = process_lock();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        fs::write(&out, "stale contents that are longer\n").unwrap();

        run_line(&format!("echo hi > {}", out.display()));
        assert_eq!(fs::read_to_string(&out).unwrap(), "hi\n");
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_created_files_are_group_writable() {
        use std::os::unix::fs::PermissionsExt;

        let _guard = process_lock();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("o");
        let err = dir.path().join("e");

        // SAFETY: umask only swaps the process file mode mask.
        let previous = unsafe { libc::umask(0o002) };
        let report = run(&Plan::build(
            &parse(&format!("echo hi > {} 2> {}", out.display(), err.display()))
                .unwrap()
                .unwrap(),
        ));
        unsafe { libc::umask(previous) };

        assert_eq!(report.unwrap().spawned, 1);
        for path in [&out, &err] {
            let mode = fs::metadata(path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o664, "{}", path.display());
        }
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_input_redirect() {
        let _guard = process_lock();
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let out = dir.path().join("out.txt");
        fs::write(&input, "one\ntwo\n").unwrap();

        run_line(&format!("cat < {} > {}", input.display(), out.display()));
        assert_eq!(fs::read_to_string(&out).unwrap(), "one\ntwo\n");
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_error_redirect_targets_error_path() {
        let _guard = process_lock();
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let err = dir.path().join("err.txt");
        fs::write(&input, "keep me\n").unwrap();

        run_line(&format!(
            "sh -c 'echo oops 1>&2' < {} 2> {}",
            input.display(),
            err.display()
        ));
        assert_eq!(fs::read_to_string(&err).unwrap(), "oops\n");
        assert_eq!(fs::read_to_string(&input).unwrap(), "keep me\n");
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_missing_input_file_fails_child_only() {
        let _guard = process_lock();
        let dir = tempfile::tempdir().unwrap();

        let report = run_line(&format!("cat < {}", dir.path().join("nope").display()));
        assert_eq!(report.spawned, 1);
        assert_eq!(exit_code(&report.statuses[0]), Some(1));
    }

    #[test]
    fn test_unknown_program_exits_non_zero() {
        let _guard = process_lock();
        let report = run_line("pipesh-no-such-program-xyz --flag");
        assert_eq!(report.spawned, 1);
        assert_eq!(exit_code(&report.statuses[0]), Some(1));
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_two_stage_pipeline() {
        let _guard = process_lock();
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("f");
        let out = dir.path().join("count");
        fs::write(&input, "a\nb\nc\n").unwrap();

        let report = run_line(&format!(
            "cat {} | wc -l > {}",
            input.display(),
            out.display()
        ));
        assert_eq!(report.pipes, 1);
        assert_eq!(report.spawned, 2);
        assert_eq!(report.statuses.len(), 2);
        assert_eq!(fs::read_to_string(&out).unwrap().trim(), "3");
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_long_pipeline_waits_for_every_stage() {
        let _guard = process_lock();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");

        let report = run_line(&format!(
            "echo hello | cat | tr a-z A-Z | cat > {}",
            out.display()
        ));
        assert_eq!(report.pipes, 3);
        assert_eq!(report.spawned, 4);
        assert_eq!(report.statuses.len(), 4);
        assert!(report.statuses.iter().all(|s| exit_code(s) == Some(0)));
        assert_eq!(fs::read_to_string(&out).unwrap(), "HELLO\n");
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_early_exiting_reader_does_not_hang() {
        let _guard = process_lock();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");

        // `yes` only stops once its reader is gone and SIGPIPE kills it
        let report = run_line(&format!("yes | head -n 2 > {}", out.display()));
        assert_eq!(report.statuses.len(), 2);
        assert_eq!(fs::read_to_string(&out).unwrap(), "y\ny\n");
    }

    #[test]
    fn test_nul_argument_spawns_nothing() {
        let plan = Plan {
            pipes: 0,
            stages: vec![SpawnRequest {
                argv: vec!["echo".to_string(), "a\0b".to_string()],
                stdin: Binding::Inherit,
                stdout: Binding::Inherit,
                stderr: Binding::Inherit,
            }],
        };
        assert!(matches!(run(&plan), Err(ExecError::InvalidArgument(_))));
    }
}
