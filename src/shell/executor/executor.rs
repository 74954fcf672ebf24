use log::{debug, error};

use super::builtin;
use super::error::ExecError;
use super::plan::Plan;
use super::spawn;
use crate::shell::parser::ast::{CommandKind, CommandNode};

/// What the driver should do after a line has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub struct Executor {
    spawned: usize,
}

impl Executor {
    pub fn new() -> Self {
        Self { spawned: 0 }
    }

    /// Runs one parsed line to completion.
    ///
    /// Only a top-level `exit` yields [`Flow::Stop`]. An `Err` means the
    /// interpreter could not create a pipe or process, or close one.
    pub fn execute(&mut self, node: &CommandNode) -> Result<Flow, ExecError> {
        match node {
            CommandNode::Leaf(command) => match command.kind() {
                CommandKind::Builtin(builtin) => {
                    debug!("builtin: {}", shell_words::join(command.tokens()));
                    Ok(builtin::run(builtin, command))
                }
                CommandKind::External => self.run(node),
            },
            // builtins inside a pipeline are exec'd like any other program
            CommandNode::Pipe { .. } => self.run(node),
        }
    }

    fn run(&mut self, node: &CommandNode) -> Result<Flow, ExecError> {
        let plan = Plan::build(node);
        debug!(
            "plan: {} stage(s), {} pipe(s)",
            plan.stages.len(),
            plan.pipes
        );

        match spawn::run(&plan) {
            Ok(report) => {
                self.spawned += report.spawned;
                debug!(
                    "reaped {} of {} process(es) joined by {} pipe(s)",
                    report.statuses.len(),
                    report.spawned,
                    report.pipes
                );
                Ok(Flow::Continue)
            }
            Err(err) if !err.is_fatal() => {
                eprintln!("{}", err);
                Ok(Flow::Continue)
            }
            Err(err) => {
                error!("execution aborted: {}", err);
                Err(err)
            }
        }
    }

    /// Processes started since this executor was created.
    pub fn spawned(&self) -> usize {
        self.spawned
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}
