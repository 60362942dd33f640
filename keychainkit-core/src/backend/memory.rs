//! In-memory secure backend.
//!
//! Emulates the matching rules of the platform keychain closely enough for
//! the handle's behavior to be tested without one. Payloads are wiped when
//! items are removed, but nothing is encrypted: this backend offers no
//! protection beyond process memory.
//!
//! # Matching rules
//!
//! - `class` must be present and name generic passwords.
//! - `acct` and `agrp` must match exactly when present.
//! - Without `sync` only local items match; `sync = true` matches only
//!   synchronized items; the wildcard matches both.
//! - Items added without `agrp` land in the backend's default access group.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};

use zeroize::Zeroizing;

use super::{MatchResult, SecureBackend};
use crate::access::AccessibilityPolicy;
use crate::query::{AttributeKey, AttributeMap, AttributeValue, ItemClass, MatchLimit, Query};
use crate::status::Status;

/// Access group assigned to items added without one.
pub const DEFAULT_ACCESS_GROUP: &str = "keychainkit.default";

/// Backend primitives, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// [`SecureBackend::add`].
    Add,
    /// [`SecureBackend::copy_matching`].
    CopyMatching,
    /// [`SecureBackend::delete_matching`].
    DeleteMatching,
}

struct StoredItem {
    account: String,
    data: Zeroizing<Vec<u8>>,
    accessible: AccessibilityPolicy,
    access_group: String,
    synchronizable: bool,
}

impl StoredItem {
    fn matches(&self, query: &Query) -> bool {
        if let Some(account) = query.account() {
            if account != self.account {
                return false;
            }
        }
        if let Some(group) = query.access_group() {
            if group != self.access_group {
                return false;
            }
        }
        match query.get(AttributeKey::Synchronizable) {
            None => !self.synchronizable,
            Some(AttributeValue::SynchronizableAny) => true,
            Some(AttributeValue::Bool(flag)) => *flag == self.synchronizable,
            Some(_) => false,
        }
    }

    fn reference(&self) -> Vec<u8> {
        format!("memref:{}:{}:{}", self.access_group, self.synchronizable, self.account).into_bytes()
    }

    fn attributes(&self, with_data: bool) -> AttributeMap {
        let mut attributes = AttributeMap::new();
        attributes.insert(
            AttributeKey::Class,
            AttributeValue::Class(ItemClass::GenericPassword),
        );
        attributes.insert(
            AttributeKey::Account,
            AttributeValue::String(self.account.clone()),
        );
        attributes.insert(
            AttributeKey::AccessGroup,
            AttributeValue::String(self.access_group.clone()),
        );
        attributes.insert(
            AttributeKey::Synchronizable,
            AttributeValue::Bool(self.synchronizable),
        );
        attributes.insert(
            AttributeKey::Accessible,
            AttributeValue::Accessible(self.accessible),
        );
        if with_data {
            attributes.insert(AttributeKey::ValueData, AttributeValue::Data(self.data.clone()));
        }
        attributes
    }
}

/// Thread-safe in-memory implementation of [`SecureBackend`].
///
/// Several [`Keychain`](crate::Keychain) handles may share one backend
/// through an `Arc`, the way applications share the system keychain.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use keychainkit_core::{Keychain, MemoryBackend};
///
/// let backend = Arc::new(MemoryBackend::new());
/// let keychain = Keychain::new(backend.clone());
///
/// keychain.set("token", "s3cr3t").unwrap();
/// assert_eq!(backend.len(), 1);
/// ```
pub struct MemoryBackend {
    items: RwLock<Vec<StoredItem>>,
    default_access_group: String,
    faults: Mutex<HashMap<Primitive, Status>>,
}

impl MemoryBackend {
    /// Creates an empty backend using [`DEFAULT_ACCESS_GROUP`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_default_access_group(DEFAULT_ACCESS_GROUP)
    }

    /// Creates an empty backend that files group-less items under `group`.
    #[must_use]
    pub fn with_default_access_group(group: impl Into<String>) -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            default_access_group: group.into(),
            faults: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the number of stored items across all scopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the account names of all stored items across all scopes.
    #[must_use]
    pub fn accounts(&self) -> Vec<String> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|item| item.account.clone())
            .collect()
    }

    /// Makes the next call to `primitive` fail with `status`.
    pub fn fail_next(&self, primitive: Primitive, status: Status) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(primitive, status);
    }

    /// Removes every item regardless of scope.
    pub fn reset(&self) {
        self.items.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.faults.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn injected(&self, primitive: Primitive) -> Option<Status> {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&primitive)
    }

    fn validate(query: &Query) -> Result<(), Status> {
        match query.get(AttributeKey::Class) {
            Some(AttributeValue::Class(ItemClass::GenericPassword)) => Ok(()),
            _ => Err(Status::PARAM),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("items", &self.len())
            .field("default_access_group", &self.default_access_group)
            .finish_non_exhaustive()
    }
}

impl SecureBackend for MemoryBackend {
    fn add(&self, query: &Query) -> Status {
        if let Some(status) = self.injected(Primitive::Add) {
            return status;
        }
        if let Err(status) = Self::validate(query) {
            return status;
        }

        let synchronizable = match query.get(AttributeKey::Synchronizable) {
            None => false,
            Some(AttributeValue::Bool(flag)) => *flag,
            Some(_) => return Status::PARAM,
        };
        let accessible = match query.get(AttributeKey::Accessible) {
            None => AccessibilityPolicy::default(),
            Some(AttributeValue::Accessible(policy)) => *policy,
            Some(_) => return Status::PARAM,
        };
        let item = StoredItem {
            account: query.account().unwrap_or_default().to_owned(),
            data: Zeroizing::new(
                query
                    .get(AttributeKey::ValueData)
                    .and_then(AttributeValue::as_data)
                    .unwrap_or_default()
                    .to_vec(),
            ),
            accessible,
            access_group: query
                .access_group()
                .unwrap_or(&self.default_access_group)
                .to_owned(),
            synchronizable,
        };

        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let duplicate = items.iter().any(|existing| {
            existing.account == item.account
                && existing.access_group == item.access_group
                && existing.synchronizable == item.synchronizable
        });
        if duplicate {
            return Status::DUPLICATE_ITEM;
        }
        items.push(item);
        Status::SUCCESS
    }

    fn copy_matching(&self, query: &Query) -> Result<MatchResult, Status> {
        if let Some(status) = self.injected(Primitive::CopyMatching) {
            return Err(status);
        }
        Self::validate(query)?;

        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        let mut matched = items.iter().filter(|item| item.matches(query)).peekable();
        if matched.peek().is_none() {
            return Err(Status::ITEM_NOT_FOUND);
        }

        match query.match_limit() {
            MatchLimit::One => {
                let Some(item) = matched.next() else {
                    return Err(Status::ITEM_NOT_FOUND);
                };
                let payload = if query.flag(AttributeKey::ReturnData) {
                    Some(item.data.to_vec())
                } else if query.flag(AttributeKey::ReturnReference) {
                    Some(item.reference())
                } else {
                    None
                };
                Ok(MatchResult::Single(payload))
            }
            MatchLimit::All => {
                let with_data = query.flag(AttributeKey::ReturnData);
                Ok(MatchResult::Many(
                    matched.map(|item| item.attributes(with_data)).collect(),
                ))
            }
        }
    }

    fn delete_matching(&self, query: &Query) -> Status {
        if let Some(status) = self.injected(Primitive::DeleteMatching) {
            return status;
        }
        if let Err(status) = Self::validate(query) {
            return status;
        }

        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let before = items.len();
        items.retain(|item| !item.matches(query));
        if items.len() == before {
            Status::ITEM_NOT_FOUND
        } else {
            Status::SUCCESS
        }
    }

    fn error_message(&self, status: Status) -> Option<String> {
        let message = match status {
            Status::SUCCESS => "No error.",
            Status::PARAM => "One or more parameters passed to a function were not valid.",
            Status::AUTH_FAILED => "The user name or passphrase you entered is not correct.",
            Status::DUPLICATE_ITEM => "The specified item already exists in the keychain.",
            Status::ITEM_NOT_FOUND => "The specified item could not be found in the keychain.",
            Status::INTERACTION_NOT_ALLOWED => "User interaction is not allowed.",
            Status::MISSING_ENTITLEMENT => "A required entitlement isn't present.",
            Status::INVALID_ENCODING => "The encoding is not valid.",
            _ => return None,
        };
        Some(message.to_owned())
    }
}
