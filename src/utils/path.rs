use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use log::error;

/// `cwd + "/" + relative`, verbatim. No normalization, so `..` and
/// symlinks are left for the kernel to resolve.
pub fn join_relative(cwd: &Path, relative: &str) -> PathBuf {
    let mut joined = OsString::from(cwd.as_os_str());
    joined.push("/");
    joined.push(relative);
    PathBuf::from(joined)
}

/// Expands a leading `~` using `$HOME`.
pub fn expand_home(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

pub fn current_dir() -> String {
    match env::current_dir() {
        Ok(dir) => dir.to_string_lossy().into_owned(),
        Err(e) => {
            error!("pipesh: PROMPT: env current_dir error: {}", e);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_relative() {
        assert_eq!(
            join_relative(Path::new("/home/user"), "src/bin"),
            PathBuf::from("/home/user/src/bin")
        );
        assert_eq!(
            join_relative(Path::new("/home/user"), "../other"),
            PathBuf::from("/home/user/../other")
        );
        assert_eq!(join_relative(Path::new("/"), "tmp"), PathBuf::from("//tmp"));
    }

    #[test]
    fn test_expand_home_leaves_plain_paths() {
        assert_eq!(expand_home("/var/log"), PathBuf::from("/var/log"));
        assert_eq!(expand_home("logs"), PathBuf::from("logs"));
    }
}
