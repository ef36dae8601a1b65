//! Cross-platform exclusive locks and single-instance checks

pub mod config;
pub mod error;
pub mod housekeep;
pub mod lock;
pub mod platform;
pub mod teardown;

pub use config::LockConfig;
pub use error::{LockError, Result};
pub use lock::{
    acquire_exclusive, check_single_instance, with_exclusive, ExclusiveLock, LockState,
    LockTimeout,
};
pub use platform::Platform;
pub use teardown::TeardownRegistry;
