use crate::config::LockConfig;
use crate::error::{LockError, Result};
use crate::lock::backend::{default_backend, BackendGuard, LockBackend};
use crate::lock::claim::Claim;
use crate::lock::name::absolute_path;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// How long an acquisition keeps retrying a contended lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockTimeout {
    Forever,
    After(Duration),
}

impl LockTimeout {
    /// Negative values wait forever
    pub fn from_secs(secs: i64) -> Self {
        if secs < 0 {
            LockTimeout::Forever
        } else {
            LockTimeout::After(Duration::from_secs(secs.unsigned_abs()))
        }
    }

    /// A single attempt, no retry
    pub fn immediate() -> Self {
        LockTimeout::After(Duration::ZERO)
    }
}

impl Default for LockTimeout {
    fn default() -> Self {
        LockTimeout::After(Duration::from_secs(10))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unacquired,
    Held,
    Released,
    Failed,
}

#[derive(Debug)]
struct Held {
    guard: BackendGuard,
    file: File,
    claim: Claim,
    identity: String,
}

/// An exclusive lock anchored on a file path.
///
/// The lock is released by [`ExclusiveLock::release`] or when the value is
/// dropped, whichever comes first.
#[derive(Debug)]
pub struct ExclusiveLock {
    path: PathBuf,
    app_name: String,
    timeout: LockTimeout,
    poll_interval: Duration,
    backend: Arc<dyn LockBackend>,
    state: LockState,
    held: Option<Held>,
}

impl ExclusiveLock {
    pub fn new(path: impl Into<PathBuf>, timeout: LockTimeout) -> Self {
        Self::with_config(path, timeout, &LockConfig::default())
    }

    pub fn with_config(path: impl Into<PathBuf>, timeout: LockTimeout, config: &LockConfig) -> Self {
        Self {
            path: path.into(),
            app_name: config.app_name.clone(),
            timeout,
            poll_interval: config.poll_interval,
            backend: default_backend(),
            state: LockState::Unacquired,
            held: None,
        }
    }

    /// Use `backend` instead of the platform default
    pub fn with_backend(mut self, backend: Arc<dyn LockBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Block until the lock is held or the timeout runs out.
    ///
    /// Calling this on a held lock returns the already-open file.
    pub fn acquire(&mut self) -> Result<&File> {
        let held = match self.held.take() {
            Some(held) => held,
            None => match self.lock_with_retry() {
                Ok(held) => held,
                Err(e) => {
                    self.state = LockState::Failed;
                    return Err(e);
                }
            },
        };
        self.state = LockState::Held;
        Ok(&self.held.insert(held).file)
    }

    /// Release the lock. Safe to call any number of times.
    pub fn release(&mut self) {
        let Some(held) = self.held.take() else {
            return;
        };
        let Held {
            guard,
            file,
            claim,
            identity,
        } = held;
        drop(guard);
        drop(file);
        drop(claim);
        self.state = LockState::Released;
        debug!("Lock released: {} ({})", self.path.display(), identity);
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn timeout(&self) -> LockTimeout {
        self.timeout
    }

    /// Backing file, while held
    pub fn file(&self) -> Option<&File> {
        self.held.as_ref().map(|h| &h.file)
    }

    /// Key the lock contends on, while held
    pub fn identity(&self) -> Option<&str> {
        self.held.as_ref().map(|h| h.identity.as_str())
    }

    pub fn is_held(&self) -> bool {
        self.state == LockState::Held
    }

    fn lock_with_retry(&self) -> Result<Held> {
        debug!(
            "Acquiring lock: {} (timeout: {:?}, backend: {})",
            self.path.display(),
            self.timeout,
            self.backend.name()
        );

        let absolute = absolute_path(&self.path).map_err(|e| self.open_error(e))?;
        let identity = self.backend.identity(&self.app_name, &absolute);
        let file = open_backing_file(&self.path).map_err(|e| self.open_error(e))?;

        let start = Instant::now();
        loop {
            match self.try_once(&file, &identity) {
                Ok(Some((guard, claim))) => {
                    debug!("Lock acquired: {}", self.path.display());
                    return Ok(Held {
                        guard,
                        file,
                        claim,
                        identity,
                    });
                }
                Ok(None) => {
                    if let LockTimeout::After(limit) = self.timeout {
                        if start.elapsed() >= limit {
                            debug!("Lock timed out after {:?}: {}", limit, self.path.display());
                            return Err(LockError::timeout(&self.path, limit));
                        }
                    }
                    trace!("Lock busy, retrying in {:?}: {}", self.poll_interval, self.path.display());
                    thread::sleep(self.poll_interval);
                }
                Err(e) => {
                    return Err(LockError::Acquire {
                        path: self.path.clone(),
                        source: e,
                    });
                }
            }
        }
    }

    fn try_once(&self, file: &File, identity: &str) -> io::Result<Option<(BackendGuard, Claim)>> {
        let Some(claim) = Claim::try_new(identity) else {
            return Ok(None);
        };
        Ok(self.backend.try_lock(file, identity)?.map(|guard| (guard, claim)))
    }

    fn open_error(&self, source: io::Error) -> LockError {
        LockError::Open {
            path: self.path.clone(),
            source,
        }
    }
}

impl Drop for ExclusiveLock {
    fn drop(&mut self) {
        self.release();
    }
}

fn open_backing_file(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)
}

/// Acquire an exclusive lock on `path` with the default configuration
pub fn acquire_exclusive(path: impl Into<PathBuf>, timeout: LockTimeout) -> Result<ExclusiveLock> {
    let mut lock = ExclusiveLock::new(path, timeout);
    lock.acquire()?;
    Ok(lock)
}

/// Run `f` while holding an exclusive lock on `path`.
///
/// The lock is released however `f` exits, including by panic.
pub fn with_exclusive<T, F>(path: impl Into<PathBuf>, timeout: LockTimeout, f: F) -> Result<T>
where
    F: FnOnce(&File) -> T,
{
    let mut lock = ExclusiveLock::new(path, timeout);
    let file = lock.acquire()?;
    Ok(f(file))
}

/// Whether some other holder currently has the lock on `path`.
///
/// Takes and immediately releases the lock when it is free. A missing file
/// is free and is not created.
pub fn is_locked(path: &Path, config: &LockConfig) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    let mut attempt = ExclusiveLock::with_config(path, LockTimeout::immediate(), config);
    match attempt.acquire() {
        Ok(_) => Ok(false),
        Err(LockError::Timeout { .. }) => Ok(true),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_timeout_from_secs() {
        assert_eq!(LockTimeout::from_secs(-1), LockTimeout::Forever);
        assert_eq!(LockTimeout::from_secs(-30), LockTimeout::Forever);
        assert_eq!(
            LockTimeout::from_secs(0),
            LockTimeout::After(Duration::ZERO)
        );
        assert_eq!(
            LockTimeout::from_secs(2),
            LockTimeout::After(Duration::from_secs(2))
        );
        assert_eq!(LockTimeout::default(), LockTimeout::from_secs(10));
    }

    #[test]
    fn test_new_lock_is_unacquired() {
        let lock = ExclusiveLock::new("never-opened.lock", LockTimeout::immediate());
        assert_eq!(lock.state(), LockState::Unacquired);
        assert!(lock.file().is_none());
        assert!(lock.identity().is_none());
    }

    #[test]
    fn test_acquire_twice_reuses_file() {
        let temp = TempDir::new().unwrap();
        let mut lock = ExclusiveLock::new(temp.path().join("a.lock"), LockTimeout::immediate());
        lock.acquire().unwrap();
        lock.acquire().unwrap();
        assert_eq!(lock.state(), LockState::Held);
    }

    #[test]
    fn test_open_failure_is_not_timeout() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing-dir").join("a.lock");
        let mut lock = ExclusiveLock::new(&path, LockTimeout::immediate());

        let err = lock.acquire().unwrap_err();
        assert!(matches!(err, LockError::Open { .. }));
        assert_eq!(lock.state(), LockState::Failed);
    }

    #[test]
    fn test_is_locked() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("status.lock");
        let config = LockConfig::default();

        assert!(!is_locked(&path, &config).unwrap());
        assert!(!path.exists());
        let _held = acquire_exclusive(&path, LockTimeout::immediate()).unwrap();
        assert!(is_locked(&path, &config).unwrap());
    }
}
