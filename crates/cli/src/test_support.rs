use std::sync::{Mutex, OnceLock};

/// Environment variables read by `Config::load`.
pub(crate) const ENV_KEYS: &[&str] = &["TERMCHAT_BASE_URL", "TERMCHAT_MODEL", "TERMCHAT_HISTORY"];

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Runs `run` with the given variables set (`Some`) or removed (`None`),
/// holding the process-wide env lock, then restores the previous values.
pub(crate) fn with_env<R>(vars: &[(&str, Option<&str>)], run: impl FnOnce() -> R) -> R {
    // A panicking test poisons the lock; the guarded data is `()`.
    let _guard = env_lock().lock().unwrap_or_else(|e| e.into_inner());

    let saved: Vec<(String, Option<String>)> = vars
        .iter()
        .map(|(key, _)| (key.to_string(), std::env::var(key).ok()))
        .collect();
    for (key, value) in vars {
        apply(key, *value);
    }

    let result = run();

    for (key, value) in &saved {
        apply(key, value.as_deref());
    }
    result
}

fn apply(key: &str, value: Option<&str>) {
    // SAFETY: env mutation is serialized by `env_lock`.
    unsafe {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
}
