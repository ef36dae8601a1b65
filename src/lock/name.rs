use std::env;
use std::io;
use std::path::{Path, PathBuf};

/// Longest name handed to `CreateMutexW`; longer names are cut, not rejected
pub const MAX_MUTEX_NAME_LEN: usize = 201;

const SESSION_NAMESPACE: &str = "Local\\";
const SINGLE_INSTANCE_PREFIX: &str = "mutexforsingleinstanceof";

/// Resolve `path` against the current directory without touching the
/// filesystem (the lock file may not exist yet).
pub fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

/// Derive the session-local mutex name guarding `path` for `app_name`.
///
/// Backslashes in `<app_name><path>` become underscores (the kernel treats
/// them as namespace separators) and the full name is truncated to
/// [`MAX_MUTEX_NAME_LEN`] characters. Two paths sharing a 201-character
/// prefix therefore map to the same mutex.
pub fn mutex_name(app_name: &str, absolute: &Path) -> String {
    let body = format!("{}{}", app_name, absolute.display()).replace('\\', "_");
    truncate_chars(format!("{}{}", SESSION_NAMESPACE, body), MAX_MUTEX_NAME_LEN)
}

/// Mutex name backing the single-instance check for `name`
pub fn single_instance_mutex_name(app_name: &str, name: &str) -> String {
    let raw = format!("{}{}{}", SINGLE_INSTANCE_PREFIX, app_name, name).replace('\\', "_");
    truncate_chars(raw, MAX_MUTEX_NAME_LEN)
}

fn truncate_chars(mut s: String, max: usize) -> String {
    if let Some((idx, _)) = s.char_indices().nth(max) {
        s.truncate(idx);
    }
    s
}
