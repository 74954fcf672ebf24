use crate::utils::config::Config;
use log::{debug, error, warn};
pub use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::Config as RLConfig;
use rustyline::Editor;
use std::fs;

pub struct ReadlineManager<'a> {
    config: &'a Config,
    editor: Editor<(), FileHistory>,
}

impl<'a> ReadlineManager<'a> {
    pub fn new(config: &'a Config) -> Result<Self, ReadlineError> {
        let rl_config = RLConfig::builder()
            .history_ignore_space(true)
            .auto_add_history(false)
            .edit_mode(config.get_edit_mode())
            .build();

        let editor = Editor::with_config(rl_config)?;
        Ok(Self { config, editor })
    }

    pub fn load_history(&mut self) {
        if let Err(err) = self.editor.load_history(&self.config.history_file) {
            warn!(
                "could not load history: {} {}",
                self.config.history_file.display(),
                err
            );
        } else {
            debug!("history loaded");
        }
    }

    pub fn readline(&mut self, prompt: &str) -> Result<String, ReadlineError> {
        self.editor.readline(prompt)
    }

    pub fn add_history(&mut self, line: &str) -> Result<bool, ReadlineError> {
        if line.trim().is_empty() {
            return Ok(false);
        }
        self.editor.add_history_entry(line)
    }

    #[cfg(test)]
    pub fn history(&self) -> Vec<String> {
        self.editor.history().iter().cloned().collect()
    }

    pub fn save_history(&mut self) {
        if let Some(parent) = self.config.history_file.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                error!("could not create {}: {}", parent.display(), err);
                return;
            }
        }
        if let Err(err) = self.editor.save_history(&self.config.history_file) {
            error!("failed to save history: {}", err);
        } else {
            debug!("history saved");
        }
    }
}
