// src/exec/env.rs

//! Access to the process environment shared by every node.
//!
//! Output capture publishes values here for nodes started later, and command
//! lines are expanded against it right before a process starts. Both sides
//! serialize on `ENV_LOCK`.

use std::sync::{LazyLock, Mutex, MutexGuard};

use regex::{Captures, Regex};
use tracing::debug;

static ENV_LOCK: Mutex<()> = Mutex::new(());

static VAR_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*)|([*#$@!?0-9-]))")
        .expect("valid env reference regex")
});

fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// Replace `$NAME` and `${NAME}` with the current value of `NAME`.
///
/// Single-character shell names (`$1`, `$@`, `$?` and the like) are looked up
/// the same way. Unset variables expand to the empty string.
pub fn expand_env(input: &str) -> String {
    let _guard = env_lock();
    VAR_REF
        .replace_all(input, |caps: &Captures<'_>| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .and_then(|m| std::env::var(m.as_str()).ok())
                .unwrap_or_default()
        })
        .into_owned()
}

/// Set `name=value` in this process's environment.
pub fn publish_output(name: &str, value: &str) {
    let _guard = env_lock();
    debug!(name, len = value.len(), "publishing captured output");
    // SAFETY: every read and write of the environment made by this crate holds
    // ENV_LOCK, and child processes receive a copy taken by std under its own
    // environment lock.
    unsafe { std::env::set_var(name, value) };
}
