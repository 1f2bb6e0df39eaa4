//! Environment isolation utilities for testing
//!
//! Environment variables are process-global, so tests that touch them are
//! serialized through [`ENV_LOCK`].

use std::sync::Mutex;

/// Static mutex to serialize tests that modify environment variables
pub static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with `key` set to `value` (or removed when `None`), restoring
/// the previous value afterwards
///
/// # Examples
///
/// ```no_run
/// use sphinxlab_testkit::with_env_var;
///
/// with_env_var("SPHINXLAB_CACHE_DIR", Some("/tmp/cache"), || {
///     // code under test sees the override
/// });
/// ```
pub fn with_env_var<F, R>(key: &str, value: Option<&str>, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let original = std::env::var_os(key);

    // SAFETY: ENV_LOCK is held, so no other test mutates the environment concurrently.
    unsafe {
        match value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }

    let result = f();

    // SAFETY: ENV_LOCK is still held.
    unsafe {
        match original {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }

    result
}
