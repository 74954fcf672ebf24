use std::path::PathBuf;

/// Commands that must run inside the interpreter's own process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Cd,
    Exit,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "cd" => Some(Builtin::Cd),
            "exit" => Some(Builtin::Exit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    External,
    Builtin(Builtin),
}

/// One program invocation with its optional stream redirections.
///
/// `tokens` is never empty: the only constructor refuses an empty list, and
/// the builtin kind is resolved from `tokens[0]` at that moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleCommand {
    tokens: Vec<String>,
    kind: CommandKind,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub error: Option<PathBuf>,
}

impl SimpleCommand {
    pub fn new(tokens: Vec<String>) -> Option<Self> {
        let kind = match Builtin::from_name(tokens.first()?) {
            Some(builtin) => CommandKind::Builtin(builtin),
            None => CommandKind::External,
        };
        Some(Self {
            tokens,
            kind,
            input: None,
            output: None,
            error: None,
        })
    }

    pub fn program(&self) -> &str {
        &self.tokens[0]
    }

    pub fn args(&self) -> &[String] {
        &self.tokens[1..]
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }
}

/// Right-leaning pipeline tree: `a | b | c` is `Pipe(a, Pipe(b, Leaf(c)))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandNode {
    Leaf(SimpleCommand),
    Pipe {
        left: SimpleCommand,
        right: Box<CommandNode>,
    },
}

impl CommandNode {
    /// Chains the stages left to right. Returns `None` for an empty list.
    pub fn from_stages(stages: Vec<SimpleCommand>) -> Option<Self> {
        let mut stages = stages.into_iter().rev();
        let mut node = CommandNode::Leaf(stages.next()?);
        for left in stages {
            node = CommandNode::Pipe {
                left,
                right: Box::new(node),
            };
        }
        Some(node)
    }

    pub fn stage_count(&self) -> usize {
        match self {
            CommandNode::Leaf(_) => 1,
            CommandNode::Pipe { right, .. } => 1 + right.stage_count(),
        }
    }
}
