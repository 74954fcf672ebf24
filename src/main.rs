use log::{debug, error};
use std::process;

use crate::shell::Shell;
use crate::utils::config::Config;
use crate::utils::log::init_logger;

mod shell;
mod utils;

fn main() {
    let config = Config::new();
    if let Err(err) = init_logger(&config) {
        eprintln!(
            "{}: logging disabled ({}): {}",
            config.name,
            config.logger_dir.display(),
            err
        );
    }
    debug!("config loaded, history at {}", config.history_file.display());

    let mut shell = match Shell::new(&config) {
        Ok(shell) => shell,
        Err(err) => {
            error!("cannot initialize line editor: {}", err);
            eprintln!("{}: {}", config.name, err);
            process::exit(1);
        }
    };

    // fatal errors were already reported by the shell
    if let Err(err) = shell.run() {
        error!("shell terminated: {}", err);
        process::exit(1);
    }
}
