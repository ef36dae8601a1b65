use crate::error::{LockError, Result};
use directories::BaseDirs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application name used when none is configured
pub const DEFAULT_APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Delay between acquisition attempts while a lock is contended
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Process-wide lock settings.
///
/// `app_name` namespaces every lock this process takes: lock files, mutex
/// names and single-instance checks all derive from it, so two applications
/// using the same logical lock name never contend.
#[derive(Debug, Clone)]
pub struct LockConfig {
    pub app_name: String,
    pub lock_dir: Option<PathBuf>,
    pub poll_interval: Duration,
}

impl LockConfig {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            lock_dir: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Store single-instance lock files here instead of the home directory
    pub fn with_lock_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lock_dir = Some(dir.into());
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Directory holding single-instance lock files.
    ///
    /// Falls back to the user's home directory when no override is set.
    pub fn lock_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.lock_dir {
            return Ok(dir.clone());
        }
        BaseDirs::new()
            .map(|dirs| dirs.home_dir().to_path_buf())
            .ok_or(LockError::HomeDirUnavailable)
    }

    /// `<lock_dir>/.<app>_<name>.lock`
    pub fn single_instance_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.lock_dir()?.join(single_instance_file_name(&self.app_name, name)))
    }

    /// Whether `path` looks like a single-instance lock file of this app
    pub fn owns_lock_file(&self, path: &Path) -> bool {
        let prefix = format!(".{}_", self.app_name);
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(&prefix) && n.ends_with(".lock") && n.len() > prefix.len() + 5)
            .unwrap_or(false)
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self::new(DEFAULT_APP_NAME)
    }
}

fn single_instance_file_name(app_name: &str, name: &str) -> String {
    format!(".{}_{}.lock", app_name, name)
}
