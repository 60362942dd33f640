#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

//! Thread-safe key/value access to the platform's secure credential store.
//!
//! A [`Keychain`] handle stores text, bytes and booleans as generic password
//! items. Each handle carries a fixed [`KeychainConfig`]:
//!
//! - a **key prefix** prepended to every caller key,
//! - an optional **access group** shared between applications,
//! - a **synchronizable** flag that replicates items across the user's devices.
//!
//! The handle serializes its backend calls, builds the exact attribute set
//! for every operation (see [`query`]), and turns backend status codes into
//! [`KeychainError`]s. A missing item is reported as `None`, `false` or an
//! empty list, never as an error.
//!
//! ```
//! use std::sync::Arc;
//! use keychainkit_core::{AccessibilityPolicy, Keychain, MemoryBackend};
//!
//! let keychain = Keychain::new(Arc::new(MemoryBackend::new()));
//!
//! keychain.set("greeting", "héllo wörld").unwrap();
//! keychain
//!     .set_bool_with_access("onboarded", true, Some(AccessibilityPolicy::AfterFirstUnlock))
//!     .unwrap();
//!
//! assert_eq!(keychain.get("greeting").unwrap().as_deref(), Some("héllo wörld"));
//! assert_eq!(keychain.get_bool("onboarded").unwrap(), Some(true));
//! assert!(keychain.delete("greeting").unwrap());
//! assert!(!keychain.delete("greeting").unwrap());
//! ```
//!
//! On macOS and iOS, `Keychain::system` uses Keychain Services. Elsewhere,
//! plug any [`SecureBackend`] in.

mod access;
pub use access::AccessibilityPolicy;

pub mod backend;
pub use backend::{MatchResult, MemoryBackend, SecureBackend};

#[cfg(any(target_os = "macos", target_os = "ios"))]
pub use backend::AppleKeychain;

mod config;
pub use config::KeychainConfig;

mod error;
pub use error::{KeychainError, KeychainResult};

mod gate;

mod keychain;
pub use keychain::Keychain;

pub mod logger;

pub mod observer;
pub use observer::{NoopObserver, QueryObserver, RecordingObserver};

pub mod query;
pub use query::{namespaced, Query};

mod status;
pub use status::Status;
