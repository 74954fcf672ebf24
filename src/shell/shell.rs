use log::{debug, error, warn};
use std::error::Error;
use std::io::{self, Write};

use crate::shell::executor::{Executor, Flow};
use crate::shell::parser::parse;
use crate::shell::readline::{ReadlineError, ReadlineManager};
use crate::utils::config::Config;
use crate::utils::path;
use crate::utils::theme::{load_theme, Theme};

pub struct Shell<'a> {
    theme: Theme,
    readline: ReadlineManager<'a>,
    executor: Executor,
}

impl<'a> Shell<'a> {
    pub fn new(config: &'a Config) -> Result<Self, ReadlineError> {
        Ok(Self {
            theme: load_theme(&config.theme),
            readline: ReadlineManager::new(config)?,
            executor: Executor::new(),
        })
    }

    pub fn run(&mut self) -> Result<(), Box<dyn Error>> {
        debug!("starting pipesh");
        self.readline.load_history();

        let result = self.run_loop();
        self.readline.save_history();

        debug!(
            "leaving pipesh after {} process(es)",
            self.executor.spawned()
        );
        result
    }

    fn run_loop(&mut self) -> Result<(), Box<dyn Error>> {
        loop {
            io::stdout().flush()?;
            let prompt = self.theme.prompt(&path::current_dir());

            match self.readline.readline(&prompt) {
                Ok(line) => {
                    if self.handle_input(&line)? == Flow::Stop {
                        debug!("exit builtin, leaving the loop");
                        break;
                    }
                }
                Err(ReadlineError::Eof) => {
                    debug!("EOF on input");
                    break;
                }
                Err(ReadlineError::Interrupted) => {
                    warn!("interrupted, discarding line");
                }
                Err(err) => {
                    error!("readline failed: {}", err);
                    eprintln!("{}", self.theme.error(format!("pipesh: {}", err)));
                    return Err(err.into());
                }
            }
        }
        Ok(())
    }

    fn handle_input(&mut self, line: &str) -> Result<Flow, Box<dyn Error>> {
        let line = line.trim_end_matches(['\r', '\n']);

        let node = match parse(line) {
            Ok(Some(node)) => node,
            Ok(None) => return Ok(Flow::Continue),
            Err(err) => {
                warn!("{}: {}", err, line);
                eprintln!("{}", self.theme.error(&err));
                self.readline.add_history(line)?;
                return Ok(Flow::Continue);
            }
        };

        self.readline.add_history(line)?;
        debug!("executing {} stage(s): {}", node.stage_count(), line);

        match self.executor.execute(&node) {
            Ok(flow) => Ok(flow),
            Err(err) => {
                eprintln!("{}", self.theme.error(format!("pipesh: {}", err)));
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn config(dir: &Path) -> Config {
        Config {
            name: String::from("pipesh"),
            theme: String::from("plain"),
            history_file: dir.join("history"),
            editor_mode: String::from("emacs"),
            logger_level: String::from("off"),
            logger_dir: dir.join("logs"),
            logger_stderr: false,
        }
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_exit_stops_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mut shell = Shell::new(&config).unwrap();

        assert_eq!(shell.handle_input("exit\r\n").unwrap(), Flow::Stop);
        assert_eq!(shell.readline.history(), vec!["exit"]);
        assert_eq!(shell.executor.spawned(), 0);
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_parse_error_continues_and_is_remembered() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mut shell = Shell::new(&config).unwrap();

        assert_eq!(shell.handle_input("ls |").unwrap(), Flow::Continue);
        assert_eq!(shell.handle_input("a ; b").unwrap(), Flow::Continue);
        assert_eq!(shell.readline.history(), vec!["ls |", "a ; b"]);
        assert_eq!(shell.executor.spawned(), 0);
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_blank_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let mut shell = Shell::new(&config).unwrap();

        assert_eq!(shell.handle_input("").unwrap(), Flow::Continue);
        assert_eq!(shell.handle_input("   \n").unwrap(), Flow::Continue);
        assert!(shell.readline.history().is_empty());
        assert_eq!(shell.executor.spawned(), 0);
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_history_survives_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let mut shell = Shell::new(&config).unwrap();
        shell.handle_input("cd").unwrap();
        shell.readline.save_history();

        let mut next = Shell::new(&config).unwrap();
        next.readline.load_history();
        assert_eq!(next.readline.history(), vec!["cd"]);
    }
}
