mod builtin;
mod error;
mod executor;
mod plan;
mod redirect;
mod spawn;

pub use executor::{Executor, Flow};

/// Serializes tests that fork or change the working directory.
#[cfg(test)]
pub(crate) fn process_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
