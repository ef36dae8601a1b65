//! Removal of single-instance lock files left behind by crashed processes.
//!
//! A process that exits without running its teardown leaves
//! `.<app>_<name>.lock` in the lock directory. The file is harmless to the
//! lock itself (nobody holds it) but accumulates, so it can be swept here.

use crate::config::LockConfig;
use crate::error::{LockError, Result};
use crate::lock::is_lock_contention;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct CleanConfig {
    pub lock: LockConfig,
    /// Scan here instead of the configured lock directory
    pub dir: Option<PathBuf>,
    pub dry_run: bool,
}

impl CleanConfig {
    pub fn new(lock: LockConfig) -> Self {
        Self {
            lock,
            dir: None,
            dry_run: false,
        }
    }

    fn scan_dir(&self) -> Result<PathBuf> {
        match &self.dir {
            Some(dir) => Ok(dir.clone()),
            None => self.lock.lock_dir(),
        }
    }
}

/// Delete (or on dry run, list) every stale single-instance lock file
pub fn clean_stale_locks(config: &CleanConfig) -> Result<Vec<PathBuf>> {
    let dir = config.scan_dir()?;
    let entries = fs::read_dir(&dir).map_err(|e| LockError::ReadFailed {
        path: dir.clone(),
        source: e,
    })?;

    let mut cleaned = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();

        // Never follow symlinks out of the lock directory
        if !entry.file_type()?.is_file() || !config.lock.owns_lock_file(&path) {
            continue;
        }

        // Held until the file is unlinked, so a racing instance that opened
        // it first finds it gone once it gets the lock
        let _stale = match lock_if_stale(&path) {
            Ok(Some(file)) => file,
            Ok(None) => {
                debug!("Lock file in use, skipping: {}", path.display());
                continue;
            }
            Err(e) => {
                warn!("Error checking lock file {}: {}", path.display(), e);
                continue;
            }
        };

        if config.dry_run {
            debug!("Would remove lock: {}", path.display());
            cleaned.push(path);
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed stale lock: {}", path.display());
                cleaned.push(path);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Lock file already removed: {}", path.display());
            }
            Err(e) => {
                warn!("Failed to remove lock file {}: {}", path.display(), e);
            }
        }
    }

    cleaned.sort();
    Ok(cleaned)
}

/// Nobody holds it: a non-blocking exclusive lock succeeds and is returned
fn lock_if_stale(path: &Path) -> io::Result<Option<File>> {
    let file = OpenOptions::new().write(true).open(path)?;
    match file.try_lock_exclusive() {
        Ok(()) => Ok(Some(file)),
        Err(e) if is_lock_contention(&e) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ignores_foreign_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".other_gui.lock"), "").unwrap();
        fs::write(temp.path().join("notes.txt"), "").unwrap();

        let config = CleanConfig {
            lock: LockConfig::new("calibre").with_lock_dir(temp.path()),
            dir: None,
            dry_run: false,
        };
        assert!(clean_stale_locks(&config).unwrap().is_empty());
        assert!(temp.path().join(".other_gui.lock").exists());
    }

    #[test]
    fn test_missing_dir_is_read_error() {
        let temp = TempDir::new().unwrap();
        let mut config = CleanConfig::new(LockConfig::new("calibre"));
        config.dir = Some(temp.path().join("absent"));

        let err = clean_stale_locks(&config).unwrap_err();
        assert!(matches!(err, LockError::ReadFailed { .. }));
    }
}
