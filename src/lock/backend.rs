use crate::config::LockConfig;
use crate::platform::Platform;
use crate::teardown::TeardownRegistry;
use fs2::FileExt;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// OS resource held alongside the backing file; dropping it releases it
pub type BackendGuard = Box<dyn fmt::Debug + Send>;

/// One family of OS mutual-exclusion primitives.
///
/// The retry loop in [`crate::lock::ExclusiveLock`] is written against this
/// trait; implementations only make single, non-blocking attempts.
pub trait LockBackend: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Key under which acquisitions of `absolute` contend
    fn identity(&self, app_name: &str, absolute: &Path) -> String;

    /// One non-blocking attempt on the opened backing file.
    ///
    /// `Ok(None)` means the lock is held elsewhere.
    fn try_lock(&self, file: &File, identity: &str) -> io::Result<Option<BackendGuard>>;

    /// One attempt at process-lifetime exclusivity for `name`.
    ///
    /// On success the cleanup is registered with `teardown`. Any failure,
    /// including I/O errors, reads as "another instance is running".
    fn try_single_instance(
        &self,
        config: &LockConfig,
        name: &str,
        teardown: &TeardownRegistry,
    ) -> bool;
}

/// Check if an I/O error indicates lock contention (file locked by another process)
pub(crate) fn is_lock_contention(e: &io::Error) -> bool {
    if e.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    // ERROR_LOCK_VIOLATION (33) - file region is locked
    // ERROR_SHARING_VIOLATION (32) - file in use by another process
    #[cfg(windows)]
    if let Some(code) = e.raw_os_error() {
        if code == 33 || code == 32 {
            return true;
        }
    }
    false
}

/// Advisory exclusive lock on the backing file itself.
///
/// The lock lives as long as the file handle, so the guard carries nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct AdvisoryFileBackend;

#[derive(Debug)]
struct AdvisoryLock;

impl LockBackend for AdvisoryFileBackend {
    fn name(&self) -> &'static str {
        "advisory-file"
    }

    fn identity(&self, _app_name: &str, absolute: &Path) -> String {
        absolute.to_string_lossy().into_owned()
    }

    fn try_lock(&self, file: &File, _identity: &str) -> io::Result<Option<BackendGuard>> {
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Box::new(AdvisoryLock) as BackendGuard)),
            Err(e) if is_lock_contention(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn try_single_instance(
        &self,
        config: &LockConfig,
        name: &str,
        teardown: &TeardownRegistry,
    ) -> bool {
        let path = match config.single_instance_path(name) {
            Ok(path) => path,
            Err(e) => {
                debug!("No location for single-instance lock '{}': {}", name, e);
                return false;
            }
        };

        // A sweeper may unlink the file between our open and our lock; the
        // second pass locks whatever file the path names afterwards.
        for _ in 0..2 {
            let file = match OpenOptions::new().write(true).create(true).open(&path) {
                Ok(file) => file,
                Err(e) => {
                    debug!("Cannot open single-instance lock {}: {}", path.display(), e);
                    return false;
                }
            };

            if let Err(e) = file.try_lock_exclusive() {
                debug!("Single-instance lock {} unavailable: {}", path.display(), e);
                return false;
            }

            if !still_linked(&file, &path) {
                debug!("Single-instance lock {} was replaced, reopening", path.display());
                continue;
            }

            debug!("Single-instance lock taken: {}", path.display());
            teardown.register(move || {
                // Unlink while still locked so no waiter ends up on an orphan
                let _ = fs::remove_file(&path);
                drop(file);
            });
            return true;
        }
        false
    }
}

/// Whether `path` still names the open `file`
#[cfg(unix)]
pub fn still_linked(file: &File, path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (file.metadata(), fs::metadata(path)) {
        (Ok(open), Ok(named)) => open.dev() == named.dev() && open.ino() == named.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
pub fn still_linked(_file: &File, path: &Path) -> bool {
    path.exists()
}

/// Backend for `platform`: named mutexes on Windows, advisory file locks elsewhere
pub fn backend_for(platform: Platform) -> Arc<dyn LockBackend> {
    match platform {
        #[cfg(windows)]
        Platform::Windows => Arc::new(super::mutex::NamedMutexBackend),
        _ => Arc::new(AdvisoryFileBackend),
    }
}

/// The backend for the running platform, chosen on first use
pub fn default_backend() -> Arc<dyn LockBackend> {
    static BACKEND: OnceLock<Arc<dyn LockBackend>> = OnceLock::new();
    BACKEND
        .get_or_init(|| {
            let platform = Platform::current();
            let backend = backend_for(platform);
            debug!("Using {} lock backend on {}", backend.name(), platform);
            backend
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_advisory_identity_is_path() {
        let backend = AdvisoryFileBackend;
        let id = backend.identity("calibre", Path::new("/tmp/a.lock"));
        assert_eq!(id, "/tmp/a.lock");
    }

    #[cfg(unix)]
    #[test]
    fn test_unix_uses_advisory_backend() {
        assert_eq!(default_backend().name(), "advisory-file");
    }

    #[test]
    fn test_advisory_try_lock_contends_on_second_handle() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("x.lock");
        let first = File::create(&path).unwrap();
        let second = OpenOptions::new().write(true).open(&path).unwrap();

        let backend = AdvisoryFileBackend;
        let guard = backend.try_lock(&first, "x").unwrap();
        assert!(guard.is_some());
        assert!(backend.try_lock(&second, "x").unwrap().is_none());

        drop(guard);
        drop(first);
        assert!(backend.try_lock(&second, "x").unwrap().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_lock_on_unlinked_file_is_detected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".calibre_gui.lock");
        let early = OpenOptions::new().write(true).create(true).open(&path).unwrap();

        fs::remove_file(&path).unwrap();
        early.try_lock_exclusive().unwrap();
        assert!(!still_linked(&early, &path));

        let fresh = OpenOptions::new().write(true).create(true).open(&path).unwrap();
        assert!(!still_linked(&early, &path));
        assert!(still_linked(&fresh, &path));
    }

    #[test]
    fn test_contention_classification() {
        assert!(is_lock_contention(&io::Error::from(io::ErrorKind::WouldBlock)));
        assert!(!is_lock_contention(&io::Error::from(io::ErrorKind::NotFound)));
    }
}
