use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("Failed to acquire lock on {path}: timeout after {timeout:?}")]
    Timeout { path: PathBuf, timeout: Duration },

    #[error("Failed to open lock file {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("Failed to acquire lock on {path}: {source}")]
    Acquire { path: PathBuf, source: io::Error },

    #[error("Another instance of '{0}' is already running")]
    AnotherInstance(String),

    #[error("Failed to determine the home directory for lock files")]
    HomeDirUnavailable,

    #[error("Failed to read from {path}: {source}")]
    ReadFailed { path: PathBuf, source: io::Error },

    #[error("Failed to run {command}: {source}")]
    CommandFailed { command: String, source: io::Error },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

impl LockError {
    pub fn exit_code(&self) -> i32 {
        match self {
            LockError::Timeout { .. } | LockError::AnotherInstance(_) => 2,
            _ => 1,
        }
    }

    pub fn timeout(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        LockError::Timeout {
            path: path.into(),
            timeout,
        }
    }
}

pub type Result<T> = std::result::Result<T, LockError>;
