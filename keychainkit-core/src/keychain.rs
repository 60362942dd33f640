//! The keychain handle.

use std::sync::Arc;

use secrecy::SecretString;

use crate::access::AccessibilityPolicy;
use crate::backend::{MatchResult, SecureBackend};
use crate::config::KeychainConfig;
use crate::error::{KeychainError, KeychainResult};
use crate::gate::AccessGate;
use crate::observer::{NoopObserver, QueryObserver};
use crate::query::{AttributeKey, AttributeValue, Query, QueryBuilder};
use crate::status::Status;

/// A configured view over a secure backend.
///
/// Stores text, bytes and booleans under caller keys. The configuration
/// (key prefix, access group, synchronizable flag) is fixed at construction.
///
/// # Thread Safety
///
/// A handle can be shared between threads. `set`, `get`, `delete` and
/// `clear` are serialized through the handle's gate, so their backend calls
/// never interleave. [`Self::all_keys`] does not take the gate and may
/// observe the store in the middle of other operations. Distinct handles do
/// not share a gate even when they address the same items.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use keychainkit_core::{Keychain, KeychainConfig, MemoryBackend};
///
/// let backend = Arc::new(MemoryBackend::new());
/// let prefixed = Keychain::with_config(KeychainConfig::new().with_key_prefix("test_"), backend.clone());
/// let plain = Keychain::new(backend);
///
/// prefixed.set("a", "1").unwrap();
/// plain.set("a", "2").unwrap();
///
/// assert_eq!(prefixed.get("a").unwrap().as_deref(), Some("1"));
/// assert_eq!(plain.get("a").unwrap().as_deref(), Some("2"));
/// ```
pub struct Keychain {
    config: KeychainConfig,
    backend: Arc<dyn SecureBackend>,
    observer: Arc<dyn QueryObserver>,
    gate: AccessGate,
}

impl Keychain {
    /// Creates an unscoped handle over `backend`.
    #[must_use]
    pub fn new<B: SecureBackend + 'static>(backend: Arc<B>) -> Self {
        Self::with_config(KeychainConfig::default(), backend)
    }

    /// Creates a handle over `backend` scoped by `config`.
    #[must_use]
    pub fn with_config<B: SecureBackend + 'static>(config: KeychainConfig, backend: Arc<B>) -> Self {
        Self::with_observer(config, backend, Arc::new(NoopObserver))
    }

    /// Creates a handle that reports every submitted query to `observer`.
    #[must_use]
    pub fn with_observer<B, O>(config: KeychainConfig, backend: Arc<B>, observer: Arc<O>) -> Self
    where
        B: SecureBackend + 'static,
        O: QueryObserver + 'static,
    {
        Self {
            config,
            backend,
            observer,
            gate: AccessGate::new(),
        }
    }

    /// Creates a handle over the system keychain.
    #[cfg(any(target_os = "macos", target_os = "ios"))]
    #[must_use]
    pub fn system(config: KeychainConfig) -> Self {
        Self::with_config(config, Arc::new(crate::backend::AppleKeychain::new()))
    }

    /// Returns the handle's configuration.
    #[must_use]
    pub const fn config(&self) -> &KeychainConfig {
        &self.config
    }

    /// Returns the prefix added before every key.
    #[must_use]
    pub fn key_prefix(&self) -> &str {
        self.config.key_prefix()
    }

    /// Returns the access group, if one is configured.
    #[must_use]
    pub fn access_group(&self) -> Option<&str> {
        self.config.access_group()
    }

    /// Returns `true` if items are written as synchronizable and reads match
    /// synchronized items too.
    #[must_use]
    pub const fn synchronizable(&self) -> bool {
        self.config.synchronizable()
    }

    /// Returns the account name `key` is stored under.
    #[must_use]
    pub fn namespaced(&self, key: &str) -> String {
        self.queries().namespaced(key)
    }

    // Writes

    /// Stores `value` as UTF-8 text under `key` with the default
    /// accessibility.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    pub fn set(&self, key: &str, value: &str) -> KeychainResult<()> {
        self.set_data_with_access(key, value.as_bytes(), None)
    }

    /// Stores `value` as UTF-8 text under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    pub fn set_with_access(
        &self,
        key: &str,
        value: &str,
        access: Option<AccessibilityPolicy>,
    ) -> KeychainResult<()> {
        self.set_data_with_access(key, value.as_bytes(), access)
    }

    /// Stores `value` under `key` with the default accessibility.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    pub fn set_data(&self, key: &str, value: &[u8]) -> KeychainResult<()> {
        self.set_data_with_access(key, value, None)
    }

    /// Stores `value` as a single byte under `key` with the default
    /// accessibility.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    pub fn set_bool(&self, key: &str, value: bool) -> KeychainResult<()> {
        self.set_bool_with_access(key, value, None)
    }

    /// Stores `value` as a single byte under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    pub fn set_bool_with_access(
        &self,
        key: &str,
        value: bool,
        access: Option<AccessibilityPolicy>,
    ) -> KeychainResult<()> {
        self.set_data_with_access(key, &[u8::from(value)], access)
    }

    /// Stores `value` under `key`, replacing any existing item.
    ///
    /// The existing item is deleted and the new one added under a single
    /// acquisition of the gate. `access` defaults to
    /// [`AccessibilityPolicy::WhenUnlocked`].
    ///
    /// The backend sees two separate calls: if the process dies, or another
    /// handle or process writes the same account between them, the key can
    /// end up absent.
    ///
    /// # Errors
    ///
    /// Returns an error if deleting the existing item fails for any reason
    /// other than it being absent (nothing is added in that case), or if the
    /// backend rejects the add.
    pub fn set_data_with_access(
        &self,
        key: &str,
        value: &[u8],
        access: Option<AccessibilityPolicy>,
    ) -> KeychainResult<()> {
        self.gate.with_lock(|| {
            self.delete_unlocked(key)?;

            let query = self.queries().write(key, value, access);
            log::debug!(
                "keychain set: account={:?} len={} access={}",
                query.account().unwrap_or_default(),
                value.len(),
                AccessibilityPolicy::or_default(access)
            );
            self.submit(&query);
            self.check(self.backend.add(&query))
        })
    }

    // Reads

    /// Returns the text stored under `key`, or `None` if there is no item.
    ///
    /// # Errors
    ///
    /// Returns [`KeychainError::Encoding`] if the stored bytes are not UTF-8,
    /// or a backend error.
    pub fn get(&self, key: &str) -> KeychainResult<Option<String>> {
        self.get_data(key)?
            .map(|data| String::from_utf8(data).map_err(|_| KeychainError::Encoding))
            .transpose()
    }

    /// Same as [`Self::get`], wrapped so the text is not printed by `Debug`
    /// and is wiped on drop.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get`].
    pub fn get_secret(&self, key: &str) -> KeychainResult<Option<SecretString>> {
        Ok(self.get(key)?.map(SecretString::from))
    }

    /// Returns the bytes stored under `key`, or `None` if there is no item.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails for any reason other than the
    /// item being absent.
    pub fn get_data(&self, key: &str) -> KeychainResult<Option<Vec<u8>>> {
        self.copy_one(key, false)
    }

    /// Returns a reference to the item stored under `key` instead of its
    /// payload, as required by APIs that take persistent item references.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_data`].
    pub fn get_data_as_reference(&self, key: &str) -> KeychainResult<Option<Vec<u8>>> {
        self.copy_one(key, true)
    }

    /// Returns the boolean stored under `key`.
    ///
    /// A first byte of `1` reads as `true` and any other first byte as
    /// `false`. A missing item or an empty payload reads as `None`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_data`].
    pub fn get_bool(&self, key: &str) -> KeychainResult<Option<bool>> {
        Ok(self
            .get_data(key)?
            .and_then(|data| data.first().map(|first| *first == 1)))
    }

    fn copy_one(&self, key: &str, as_reference: bool) -> KeychainResult<Option<Vec<u8>>> {
        self.gate.with_lock(|| {
            let query = self.queries().read(key, as_reference);
            log::debug!(
                "keychain get: account={:?} reference={as_reference}",
                query.account().unwrap_or_default()
            );
            self.submit(&query);

            match self.backend.copy_matching(&query) {
                Ok(MatchResult::Single(payload)) => Ok(payload),
                Ok(MatchResult::Many(_)) => Err(KeychainError::UnexpectedResult(
                    "item list returned for a single-item lookup".to_string(),
                )),
                Err(status) if status.is_not_found() => Ok(None),
                Err(status) => Err(self.failure(status)),
            }
        })
    }

    // Deletes

    /// Deletes the item stored under `key`.
    ///
    /// Returns `true` if an item was removed and `false` if there was none.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails for any reason other than the
    /// item being absent.
    pub fn delete(&self, key: &str) -> KeychainResult<bool> {
        self.gate.with_lock(|| self.delete_unlocked(key))
    }

    /// Same as [`Self::delete`] without taking the gate. Only call it while
    /// already holding the gate.
    fn delete_unlocked(&self, key: &str) -> KeychainResult<bool> {
        let query = self.queries().delete(key);
        log::debug!(
            "keychain delete: account={:?}",
            query.account().unwrap_or_default()
        );
        self.submit(&query);

        let status = self.backend.delete_matching(&query);
        if status.is_not_found() {
            return Ok(false);
        }
        self.check(status)?;
        Ok(true)
    }

    /// Deletes every generic password in this handle's scope.
    ///
    /// The key prefix is ignored: items written by handles with other
    /// prefixes are deleted too, as long as they share the access group and
    /// synchronizable scope. Clearing an empty store succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails for any reason other than there
    /// being nothing to delete.
    pub fn clear(&self) -> KeychainResult<()> {
        self.gate.with_lock(|| {
            let query = self.queries().clear();
            log::debug!("keychain clear: access_group={:?}", self.access_group());
            self.submit(&query);

            let status = self.backend.delete_matching(&query);
            if status.is_not_found() {
                return Ok(());
            }
            self.check(status)
        })
    }

    // Enumeration

    /// Returns the account names of every generic password in scope.
    ///
    /// Names include their prefix, and items written by handles with other
    /// prefixes are listed too. The order is unspecified.
    ///
    /// This call does not take the gate. Running it while other threads
    /// write through the same handle gives an eventually consistent view,
    /// not a snapshot ordered with those writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails for any reason other than there
    /// being no items.
    pub fn all_keys(&self) -> KeychainResult<Vec<String>> {
        let query = self.queries().list();
        log::debug!("keychain list: access_group={:?}", self.access_group());
        self.submit(&query);

        match self.backend.copy_matching(&query) {
            Ok(MatchResult::Many(items)) => Ok(items
                .iter()
                .filter_map(|attributes| {
                    attributes
                        .get(&AttributeKey::Account)
                        .and_then(AttributeValue::as_str)
                        .map(str::to_owned)
                })
                .collect()),
            Ok(MatchResult::Single(_)) => Err(KeychainError::UnexpectedResult(
                "single item returned for an enumeration".to_string(),
            )),
            Err(status) if status.is_not_found() => Ok(Vec::new()),
            Err(status) => Err(self.failure(status)),
        }
    }

    // Helpers

    const fn queries(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(&self.config)
    }

    fn submit(&self, query: &Query) {
        self.observer.observe(query);
    }

    fn check(&self, status: Status) -> KeychainResult<()> {
        if status.is_success() {
            Ok(())
        } else {
            Err(self.failure(status))
        }
    }

    fn failure(&self, status: Status) -> KeychainError {
        let error = KeychainError::backend(status, self.backend.error_message(status));
        log::warn!("keychain backend failure: {error}");
        error
    }
}

impl std::fmt::Debug for Keychain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keychain")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
