use std::path::PathBuf;

use thiserror::Error;

use super::ast::{CommandNode, SimpleCommand};
use super::lexer::{Lexer, RedirectOp, Token};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("syntax error: empty command")]
    EmptyCommand,
    #[error("syntax error: expected filename after `{0}`")]
    MissingFilename(RedirectOp),
    #[error("syntax error: unsupported operator `{0}`")]
    Unsupported(String),
    #[error("syntax error: unterminated {0} quote")]
    UnterminatedQuote(char),
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current_token: Token,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token();
        Parser {
            lexer,
            current_token,
        }
    }

    fn next_token(&mut self) {
        self.current_token = self.lexer.next_token();
    }

    /// Parses a whole line. A blank line is `Ok(None)`.
    pub fn parse_line(&mut self) -> Result<Option<CommandNode>, ParseError> {
        if self.current_token == Token::EOF {
            return Ok(None);
        }

        let mut stages = Vec::new();
        loop {
            stages.push(self.parse_simple_command()?);

            match self.current_token {
                Token::Pipe => self.next_token(),
                _ => break,
            }
        }

        Ok(CommandNode::from_stages(stages))
    }

    fn parse_simple_command(&mut self) -> Result<SimpleCommand, ParseError> {
        let mut words = Vec::new();
        let mut input = None;
        let mut output = None;
        let mut error = None;

        loop {
            match &self.current_token {
                Token::EOF | Token::Pipe => break,
                Token::Unsupported(op) => return Err(ParseError::Unsupported(op.clone())),
                Token::UnterminatedQuote(q) => return Err(ParseError::UnterminatedQuote(*q)),
                Token::Redirect(op) => {
                    let op = *op;
                    let path = self.parse_redirection(op)?;
                    // a later redirection of the same stream replaces the earlier one
                    match op {
                        RedirectOp::Input => input = Some(path),
                        RedirectOp::Output => output = Some(path),
                        RedirectOp::Error => error = Some(path),
                    }
                }
                Token::Word(word) => {
                    words.push(word.clone());
                    self.next_token();
                }
            }
        }

        let mut command = SimpleCommand::new(words).ok_or(ParseError::EmptyCommand)?;
        command.input = input;
        command.output = output;
        command.error = error;
        Ok(command)
    }

    fn parse_redirection(&mut self, operator: RedirectOp) -> Result<PathBuf, ParseError> {
        self.next_token(); // skip the operator

        match &self.current_token {
            Token::Word(filename) if !filename.is_empty() => {
                let path = PathBuf::from(filename);
                self.next_token();
                Ok(path)
            }
            _ => Err(ParseError::MissingFilename(operator)),
        }
    }
}

pub fn parse(line: &str) -> Result<Option<CommandNode>, ParseError> {
    Parser::new(line).parse_line()
}
