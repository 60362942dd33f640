//! Serialized access to the backend.
//!
//! Every gated operation on one handle runs under a single mutex, so at most
//! one of them talks to the backend at a time. Enumeration deliberately
//! bypasses the gate (see [`Keychain::all_keys`](crate::Keychain::all_keys)).
//!
//! ```ignore
//! gate.with_lock(|| {
//!     // Delete and add happen back to back with no other gated
//!     // operation in between.
//!     keychain.delete_unlocked(key)?;
//!     backend.add(&query)
//! })?;
//! ```

use std::sync::Mutex;

use crate::error::{KeychainError, KeychainResult};

/// Mutual-exclusion gate owned by one handle.
#[derive(Debug, Default)]
pub struct AccessGate {
    lock: Mutex<()>,
}

impl AccessGate {
    /// Creates an unlocked gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Executes `f` while holding the gate.
    ///
    /// The gate is released when `f` returns, whether it succeeds or fails.
    ///
    /// # Errors
    ///
    /// Returns [`KeychainError::Lock`] if a previous holder panicked, or the
    /// error returned by `f`.
    pub fn with_lock<R, F>(&self, f: F) -> KeychainResult<R>
    where
        F: FnOnce() -> KeychainResult<R>,
    {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| KeychainError::lock(format!("mutex poisoned: {e}")))?;
        f()
    }
}
