//! In-process claim table.
//!
//! OS lock primitives do not reliably exclude threads of the same process
//! (POSIX record locks are per process, a named mutex opened twice in one
//! process is just two handles). Every acquisition therefore claims its lock
//! identity here first; a claim held by another thread reads as contention.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

static CLAIMS: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();

fn claims() -> MutexGuard<'static, HashSet<String>> {
    CLAIMS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Exclusive in-process ownership of a lock identity, dropped on release
#[derive(Debug)]
pub(crate) struct Claim {
    identity: String,
}

impl Claim {
    /// `None` when another holder in this process already owns `identity`
    pub(crate) fn try_new(identity: &str) -> Option<Self> {
        if claims().insert(identity.to_string()) {
            Some(Claim {
                identity: identity.to_string(),
            })
        } else {
            None
        }
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        claims().remove(&self.identity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_is_exclusive_until_dropped() {
        let first = Claim::try_new("claim-test-identity").unwrap();
        assert!(Claim::try_new("claim-test-identity").is_none());
        drop(first);
        assert!(Claim::try_new("claim-test-identity").is_some());
    }

    #[test]
    fn test_distinct_identities_do_not_contend() {
        let _a = Claim::try_new("claim-test-a").unwrap();
        assert!(Claim::try_new("claim-test-b").is_some());
    }
}
