use crate::utils::config::Config;
use chrono::Local;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::process;

pub fn parse_level(level: &str) -> LevelFilter {
    match level {
        level if level.eq_ignore_ascii_case("off") => LevelFilter::Off,
        level if level.eq_ignore_ascii_case("error") => LevelFilter::Error,
        level if level.eq_ignore_ascii_case("warn") => LevelFilter::Warn,
        level if level.eq_ignore_ascii_case("info") => LevelFilter::Info,
        level if level.eq_ignore_ascii_case("debug") => LevelFilter::Debug,
        level if level.eq_ignore_ascii_case("trace") => LevelFilter::Trace,
        _ => LevelFilter::Warn,
    }
}

/// Logs go to a dated file, never to stdout: stdout belongs to the
/// commands being run. The PID prefix tells forked children apart.
pub fn init_logger(config: &Config) -> io::Result<()> {
    let level = parse_level(&config.logger_level);

    fs::create_dir_all(&config.logger_dir)?;
    let date = Local::now().format("%Y-%m-%d");
    let log_file = config.logger_dir.join(format!("{}_{}.log", config.name, date));
    let file = OpenOptions::new().create(true).append(true).open(log_file)?;

    let mut writers: Vec<Box<dyn Write + Send + Sync>> = vec![Box::new(file)];
    if config.logger_stderr {
        writers.push(Box::new(io::stderr()));
    }

    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "[PID:{}][{}] {} - {}",
                process::id(),
                record.level(),
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(MultiWriter { writers })))
        .filter(Some(config.name.as_str()), level)
        .filter(None, LevelFilter::Warn)
        .try_init()
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;

    log::debug!("log level set to {}", level);
    Ok(())
}

struct MultiWriter {
    writers: Vec<Box<dyn Write + Send + Sync>>,
}

impl Write for MultiWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        for writer in &mut self.writers {
            writer.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        for writer in &mut self.writers {
            writer.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), LevelFilter::Debug);
        assert_eq!(parse_level("trace"), LevelFilter::Trace);
        assert_eq!(parse_level("off"), LevelFilter::Off);
        assert_eq!(parse_level("loud"), LevelFilter::Warn);
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_multi_writer_fans_out() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.log");
        let b = dir.path().join("b.log");
        let mut writer = MultiWriter {
            writers: vec![
                Box::new(File::create(&a).unwrap()),
                Box::new(File::create(&b).unwrap()),
            ],
        };

        writer.write_all(b"line\n").unwrap();
        writer.flush().unwrap();
        assert_eq!(fs::read_to_string(&a).unwrap(), "line\n");
        assert_eq!(fs::read_to_string(&b).unwrap(), "line\n");
    }
}
