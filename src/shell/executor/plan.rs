use std::path::PathBuf;

use crate::shell::parser::ast::{CommandNode, SimpleCommand};

/// Where a child's standard stream comes from, decided before any fork.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Inherit,
    PipeRead(usize),
    PipeWrite(usize),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub argv: Vec<String>,
    pub stdin: Binding,
    pub stdout: Binding,
    pub stderr: Binding,
}

/// Every process one command line needs, in pipeline order, and how many
/// pipes connect them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Plan {
    pub pipes: usize,
    pub stages: Vec<SpawnRequest>,
}

impl Plan {
    pub fn build(node: &CommandNode) -> Self {
        let mut plan = Plan::default();
        plan.walk(node, Binding::Inherit);
        plan
    }

    // The left child of a pipe writes into a fresh pipe whose read end
    // becomes the stdin of everything on the right.
    fn walk(&mut self, node: &CommandNode, stdin: Binding) {
        match node {
            CommandNode::Leaf(command) => self.push_stage(command, stdin, Binding::Inherit),
            CommandNode::Pipe { left, right } => {
                let pipe = self.pipes;
                self.pipes += 1;
                self.push_stage(left, stdin, Binding::PipeWrite(pipe));
                self.walk(right, Binding::PipeRead(pipe));
            }
        }
    }

    fn push_stage(&mut self, command: &SimpleCommand, stdin: Binding, stdout: Binding) {
        // file redirections take precedence over pipe ends
        let file = |path: &Option<PathBuf>| path.clone().map(Binding::File);
        self.stages.push(SpawnRequest {
            argv: command.tokens().to_vec(),
            stdin: file(&command.input).unwrap_or(stdin),
            stdout: file(&command.output).unwrap_or(stdout),
            stderr: file(&command.error).unwrap_or(Binding::Inherit),
        });
    }
}
