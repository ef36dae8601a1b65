use crate::config::LockConfig;
use crate::lock::backend::{default_backend, LockBackend};
use crate::teardown::TeardownRegistry;

/// Return true if no other instance of the application identified by
/// `name` is running.
///
/// Makes one non-blocking attempt. When it succeeds, the exclusivity lasts
/// until `teardown` runs; the cleanup it registers closes the lock and, on
/// file-based platforms, deletes the lock file. Any failure to set up the
/// lock (unwritable directory, no home directory) counts as another
/// instance being present.
pub fn check_single_instance(config: &LockConfig, name: &str, teardown: &TeardownRegistry) -> bool {
    check_single_instance_with(default_backend().as_ref(), config, name, teardown)
}

pub fn check_single_instance_with(
    backend: &dyn LockBackend,
    config: &LockConfig,
    name: &str,
    teardown: &TeardownRegistry,
) -> bool {
    backend.try_single_instance(config, name, teardown)
}
