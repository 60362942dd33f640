//! Secure storage backends.
//!
//! A backend is the opaque key/value service behind a [`Keychain`] handle.
//! The handle owns locking, query construction and error translation; the
//! backend only executes the attribute sets it is given.
//!
//! # Implementations
//!
//! - [`MemoryBackend`]: in-process emulation of keychain matching rules, for
//!   tests and for platforms without a native store.
//! - `AppleKeychain` (macOS and iOS only): Keychain Services through
//!   `SecItemAdd`, `SecItemCopyMatching` and `SecItemDelete`.
//!
//! [`Keychain`]: crate::Keychain

pub mod memory;

#[cfg(any(target_os = "macos", target_os = "ios"))]
mod apple;

#[cfg(any(target_os = "macos", target_os = "ios"))]
pub use apple::AppleKeychain;
pub use memory::MemoryBackend;

use crate::query::{AttributeMap, Query};
use crate::status::Status;

/// Result of a successful [`SecureBackend::copy_matching`] call.
///
/// The variant follows the query's match limit: [`MatchLimit::One`] yields
/// `Single`, [`MatchLimit::All`] yields `Many`.
///
/// [`MatchLimit::One`]: crate::query::MatchLimit::One
/// [`MatchLimit::All`]: crate::query::MatchLimit::All
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// The payload of the single matched item, if the backend returned data.
    Single(Option<Vec<u8>>),
    /// Attributes of every matched item.
    Many(Vec<AttributeMap>),
}

/// Primitive operations of a secure key/value store.
///
/// Callers serialize access; implementations need not order concurrent
/// calls themselves, but must be safe to share between threads.
///
/// # Status codes
///
/// Implementations report native status codes. [`Status::SUCCESS`] and
/// [`Status::ITEM_NOT_FOUND`] carry fixed meaning; every other code is a
/// failure surfaced to the caller together with [`Self::error_message`].
pub trait SecureBackend: Send + Sync {
    /// Adds a new item described by `query`.
    ///
    /// Returns [`Status::DUPLICATE_ITEM`] if an item with the same account
    /// already exists in the same scope.
    fn add(&self, query: &Query) -> Status;

    /// Looks up items matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`Status::ITEM_NOT_FOUND`] when nothing matches, or any other
    /// failure status.
    fn copy_matching(&self, query: &Query) -> Result<MatchResult, Status>;

    /// Deletes every item matching `query`.
    ///
    /// Returns [`Status::ITEM_NOT_FOUND`] when nothing matched.
    fn delete_matching(&self, query: &Query) -> Status;

    /// Returns a human-readable description of `status`, if the backend has
    /// one.
    fn error_message(&self, status: Status) -> Option<String>;
}
