use dotenv::dotenv;
use rustyline::EditMode;
use std::env;
use std::path::PathBuf;

use crate::utils::path::expand_home;

pub struct Config {
    pub name: String,
    pub theme: String,
    pub history_file: PathBuf,
    pub editor_mode: String,
    pub logger_level: String,
    pub logger_dir: PathBuf,
    pub logger_stderr: bool,
}

impl Config {
    fn get_config_dir() -> PathBuf {
        if env::var("HOME").is_ok() {
            expand_home("~/.config/pipesh")
        } else {
            PathBuf::from("tmp")
        }
    }

    fn default() -> Self {
        let config_dir = Self::get_config_dir();
        Config {
            name: String::from("pipesh"),
            theme: String::from("default"),
            history_file: config_dir.join(".pipesh_history"),
            editor_mode: String::from("emacs"),
            logger_level: String::from("warn"),
            logger_dir: config_dir.join("logs"),
            logger_stderr: false,
        }
    }

    pub fn new() -> Self {
        // .env files first, the real environment wins
        if cfg!(debug_assertions) {
            dotenv::from_filename(".env.development").ok();
        } else {
            dotenv().ok();
        }

        let mut config = Config::default();

        if let Ok(theme) = env::var("PIPESH_THEME") {
            config.theme = theme;
        }

        if let Ok(editor) = env::var("PIPESH_EDITOR") {
            config.editor_mode = editor;
        }

        if let Ok(history) = env::var("PIPESH_HISTORY") {
            config.history_file = expand_home(&history);
        }

        if let Ok(level) = env::var("PIPESH_LOG_LEVEL") {
            config.logger_level = level;
        }

        if let Ok(dir) = env::var("PIPESH_LOG_DIR") {
            config.logger_dir = expand_home(&dir);
        }

        if let Ok(flag) = env::var("PIPESH_LOG_STDERR") {
            config.logger_stderr = matches!(flag.as_str(), "1" | "true" | "yes");
        }

        config
    }

    pub fn get_edit_mode(&self) -> EditMode {
        match self.editor_mode.to_lowercase().as_str() {
            "vi" => EditMode::Vi,
            _ => EditMode::Emacs,
        }
    }
}
