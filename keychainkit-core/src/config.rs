//! Handle configuration.

use serde::{Deserialize, Serialize};

/// Scoping parameters for a [`Keychain`](crate::Keychain) handle.
///
/// The configuration is fixed once the handle is created. It can be built
/// in code or deserialized from a host's configuration file:
///
/// ```
/// use keychainkit_core::KeychainConfig;
///
/// let config = KeychainConfig::new()
///     .with_key_prefix("app_")
///     .with_access_group("ABCDE12345.com.example.shared")
///     .with_synchronizable(true);
///
/// assert_eq!(config.key_prefix(), "app_");
/// assert_eq!(config.access_group(), Some("ABCDE12345.com.example.shared"));
/// assert!(config.synchronizable());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeychainConfig {
    /// Prepended to every caller key. `clear` ignores it.
    key_prefix: String,
    /// Access group shared between applications. When unset, reads and
    /// deletes match every group the application can access.
    access_group: Option<String>,
    /// Whether written items replicate to the user's other devices, and
    /// whether reads and deletes also match replicated items.
    synchronizable: bool,
}

impl KeychainConfig {
    /// Creates an unscoped configuration: no prefix, no access group, local
    /// items only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the key prefix.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Sets the access group.
    #[must_use]
    pub fn with_access_group(mut self, group: impl Into<String>) -> Self {
        self.access_group = Some(group.into());
        self
    }

    /// Sets the synchronizable flag.
    #[must_use]
    pub const fn with_synchronizable(mut self, synchronizable: bool) -> Self {
        self.synchronizable = synchronizable;
        self
    }

    /// Returns the key prefix.
    #[must_use]
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Returns the access group. An empty group counts as unset.
    #[must_use]
    pub fn access_group(&self) -> Option<&str> {
        self.access_group.as_deref().filter(|group| !group.is_empty())
    }

    /// Returns the synchronizable flag.
    #[must_use]
    pub const fn synchronizable(&self) -> bool {
        self.synchronizable
    }
}
