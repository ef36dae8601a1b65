//! Ordered shutdown callbacks owned by the program's entry point.
//!
//! Components that need to clean up at process exit (closing a single-instance
//! lock, deleting its file) register a callback here instead of binding to a
//! global exit hook. The owner calls [`TeardownRegistry::run`] during shutdown;
//! anything still pending when the registry is dropped runs then.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};
use tracing::trace;

type Callback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
pub struct TeardownRegistry {
    pending: Mutex<Vec<Callback>>,
}

impl TeardownRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a callback. It runs at most once, after every callback
    /// registered before it.
    pub fn register<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(callback));
    }

    /// Number of callbacks waiting to run.
    pub fn len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run all pending callbacks in registration order.
    ///
    /// A panicking callback is swallowed and the rest still run.
    pub fn run(&self) {
        let callbacks = std::mem::take(
            &mut *self
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let count = callbacks.len();
        for callback in callbacks {
            let _ = panic::catch_unwind(AssertUnwindSafe(callback));
        }
        if count > 0 {
            trace!("Ran {} teardown callback(s)", count);
        }
    }
}

impl Drop for TeardownRegistry {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for TeardownRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeardownRegistry")
            .field("pending", &self.len())
            .finish()
    }
}
