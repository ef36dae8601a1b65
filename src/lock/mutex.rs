//! Named kernel mutex backend for Windows.
//!
//! A lock is "held" by whichever process created the named mutex; a create
//! that reports `ERROR_ALREADY_EXISTS` is contention. The mutex disappears once
//! its last handle closes, so releasing means closing our handle.

use crate::config::LockConfig;
use crate::lock::backend::{BackendGuard, LockBackend};
use crate::lock::name;
use crate::teardown::TeardownRegistry;
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::debug;
use windows_sys::Win32::Foundation::{CloseHandle, GetLastError, ERROR_ALREADY_EXISTS, HANDLE};
use windows_sys::Win32::System::Threading::CreateMutexW;

#[derive(Debug)]
pub struct NamedMutex {
    handle: HANDLE,
    name: String,
}

// The handle is a process-wide kernel reference, usable from any thread.
unsafe impl Send for NamedMutex {}

impl NamedMutex {
    /// Create the mutex, or `None` if it already exists.
    pub fn create(name: &str) -> io::Result<Option<Self>> {
        let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
        // GetLastError must be read before any other API call.
        let (handle, existed) = unsafe {
            let handle = CreateMutexW(std::ptr::null(), 0, wide.as_ptr());
            (handle, GetLastError() == ERROR_ALREADY_EXISTS)
        };
        if handle.is_null() {
            return Err(io::Error::last_os_error());
        }

        let mutex = NamedMutex {
            handle,
            name: name.to_string(),
        };
        if existed {
            // Our surplus handle must not keep the other holder's mutex alive.
            drop(mutex);
            return Ok(None);
        }
        Ok(Some(mutex))
    }
}

impl Drop for NamedMutex {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.handle);
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NamedMutexBackend;

impl LockBackend for NamedMutexBackend {
    fn name(&self) -> &'static str {
        "named-mutex"
    }

    fn identity(&self, app_name: &str, absolute: &Path) -> String {
        name::mutex_name(app_name, absolute)
    }

    fn try_lock(&self, _file: &File, identity: &str) -> io::Result<Option<BackendGuard>> {
        Ok(NamedMutex::create(identity)?.map(|m| Box::new(m) as BackendGuard))
    }

    fn try_single_instance(
        &self,
        config: &LockConfig,
        name: &str,
        teardown: &TeardownRegistry,
    ) -> bool {
        let mutex_name = name::single_instance_mutex_name(&config.app_name, name);
        match NamedMutex::create(&mutex_name) {
            Ok(Some(mutex)) => {
                debug!("Single-instance mutex created: {}", mutex.name);
                teardown.register(move || drop(mutex));
                true
            }
            Ok(None) => {
                debug!("Single-instance mutex already exists: {}", mutex_name);
                false
            }
            Err(e) => {
                debug!("Cannot create single-instance mutex {}: {}", mutex_name, e);
                false
            }
        }
    }
}
