//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use keychainkit_core::{Keychain, KeychainConfig, MemoryBackend, RecordingObserver};
use uuid::Uuid;

/// Creates an empty shared store.
pub fn shared_backend() -> Arc<MemoryBackend> {
    Arc::new(MemoryBackend::new())
}

/// Creates a handle with `prefix` over `backend`.
pub fn prefixed(backend: &Arc<MemoryBackend>, prefix: &str) -> Keychain {
    Keychain::with_config(
        KeychainConfig::new().with_key_prefix(prefix),
        Arc::clone(backend),
    )
}

/// Creates a handle over `backend` that records its queries.
pub fn observed(
    backend: &Arc<MemoryBackend>,
    config: KeychainConfig,
) -> (Keychain, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::new());
    let keychain = Keychain::with_observer(config, Arc::clone(backend), Arc::clone(&observer));
    (keychain, observer)
}

/// Returns a key that no other test uses.
pub fn unique_key(label: &str) -> String {
    format!("{label}-{}", Uuid::new_v4())
}
