use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    Word(String),
    Pipe,
    Redirect(RedirectOp),
    /// Operators the interpreter recognizes but does not run: `&`, `;`, `>>`.
    Unsupported(String),
    UnterminatedQuote(char),
    EOF,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RedirectOp {
    Input,  // <
    Output, // >
    Error,  // 2>
}

impl fmt::Display for RedirectOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            RedirectOp::Input => "<",
            RedirectOp::Output => ">",
            RedirectOp::Error => "2>",
        };
        f.write_str(op)
    }
}

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.chars().peekable(),
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        match self.peek_char() {
            None => Token::EOF,
            Some(c) => match c {
                '|' => {
                    self.read_char();
                    Token::Pipe
                }
                ';' | '&' => {
                    self.read_char();
                    Token::Unsupported(c.to_string())
                }
                '<' => {
                    self.read_char();
                    Token::Redirect(RedirectOp::Input)
                }
                '>' => {
                    self.read_char();
                    self.output_redirect(RedirectOp::Output)
                }
                '2' if self.stderr_redirect_ahead() => {
                    self.read_char();
                    self.read_char();
                    self.output_redirect(RedirectOp::Error)
                }
                _ => self.read_word(),
            },
        }
    }

    fn read_char(&mut self) -> Option<char> {
        self.input.next()
    }

    fn peek_char(&mut self) -> Option<char> {
        self.input.peek().copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if !c.is_whitespace() {
                break;
            }
            self.read_char();
        }
    }

    // `2>` only counts as a redirection at the start of a token.
    fn stderr_redirect_ahead(&self) -> bool {
        let mut ahead = self.input.clone();
        ahead.next() == Some('2') && ahead.next() == Some('>')
    }

    fn output_redirect(&mut self, op: RedirectOp) -> Token {
        if self.peek_char() == Some('>') {
            self.read_char();
            return Token::Unsupported(format!("{}>", op));
        }
        Token::Redirect(op)
    }

    fn read_word(&mut self) -> Token {
        let mut word = String::new();

        while let Some(c) = self.peek_char() {
            if c.is_whitespace() || ";<>|&".contains(c) {
                break;
            }
            if c == '"' || c == '\'' {
                match self.read_quoted(c) {
                    Some(quoted) => word.push_str(&quoted),
                    None => return Token::UnterminatedQuote(c),
                }
                continue;
            }
            self.read_char();
            word.push(c);
        }

        Token::Word(word)
    }

    fn read_quoted(&mut self, quote: char) -> Option<String> {
        self.read_char();
        let mut string = String::new();
        let mut escaped = false;

        while let Some(c) = self.read_char() {
            match (escaped, c) {
                (true, _) => {
                    string.push(c);
                    escaped = false;
                }
                (false, '\\') => escaped = true,
                (false, c) if c == quote => return Some(string),
                (false, c) => string.push(c),
            }
        }

        None
    }
}
