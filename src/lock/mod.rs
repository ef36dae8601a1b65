mod acquisition;
mod backend;
mod claim;
#[cfg(windows)]
mod mutex;
mod name;
mod single_instance;

pub use acquisition::{
    acquire_exclusive, is_locked, with_exclusive, ExclusiveLock, LockState, LockTimeout,
};
pub use backend::{
    backend_for, default_backend, still_linked, AdvisoryFileBackend, BackendGuard, LockBackend,
};
pub(crate) use backend::is_lock_contention;
#[cfg(windows)]
pub use mutex::{NamedMutex, NamedMutexBackend};
pub use name::{absolute_path, mutex_name, single_instance_mutex_name, MAX_MUTEX_NAME_LEN};
pub use single_instance::{check_single_instance, check_single_instance_with};
