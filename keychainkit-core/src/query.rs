//! Query construction.
//!
//! Every backend call receives a [`Query`]: a map from [`AttributeKey`] to
//! [`AttributeValue`] built from the handle's [`KeychainConfig`] and the
//! operation's parameters. Building is pure; the same inputs always produce
//! the same attribute set, including which optional attributes are present.
//!
//! | attribute         | write | read | delete | clear | list |
//! |-------------------|-------|------|--------|-------|------|
//! | class             | yes   | yes  | yes    | yes   | yes  |
//! | account           | yes   | yes  | yes    |       |      |
//! | payload           | yes   |      |        |       |      |
//! | accessibility     | yes   |      |        |       |      |
//! | match limit       |       | one  |        |       | all  |
//! | return flags      |       | yes  |        |       | yes  |
//! | access group      | if configured on every operation          |
//! | synchronizable    | `true` on write, wildcard everywhere else |

use std::collections::BTreeMap;
use std::fmt;

use strum::{Display, IntoStaticStr};
use zeroize::Zeroizing;

use crate::access::AccessibilityPolicy;
use crate::config::KeychainConfig;

/// Attribute names understood by the backend.
///
/// The string form of each key is the backend's raw attribute name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, IntoStaticStr)]
pub enum AttributeKey {
    /// Item class; always generic password.
    #[strum(serialize = "class")]
    Class,
    /// Account name; the namespaced key.
    #[strum(serialize = "acct")]
    Account,
    /// Payload bytes.
    #[strum(serialize = "v_Data")]
    ValueData,
    /// Accessibility policy.
    #[strum(serialize = "pdmn")]
    Accessible,
    /// Number of items to match.
    #[strum(serialize = "m_Limit")]
    MatchLimit,
    /// Request the payload bytes.
    #[strum(serialize = "r_Data")]
    ReturnData,
    /// Request the item attributes.
    #[strum(serialize = "r_Attributes")]
    ReturnAttributes,
    /// Request a persistent item reference, returned as bytes.
    #[strum(serialize = "r_PersistentRef")]
    ReturnReference,
    /// Access group the item belongs to.
    #[strum(serialize = "agrp")]
    AccessGroup,
    /// Cross-device synchronization.
    #[strum(serialize = "sync")]
    Synchronizable,
}

impl AttributeKey {
    /// Returns the backend's raw attribute name.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Item classes. Only generic passwords are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum ItemClass {
    /// A generic password item.
    #[strum(serialize = "genp")]
    GenericPassword,
}

/// How many items a read may match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum MatchLimit {
    /// At most one item; the backend returns a single payload.
    #[strum(serialize = "m_LimitOne")]
    One,
    /// Every matching item; the backend returns a list of attribute maps.
    #[strum(serialize = "m_LimitAll")]
    All,
}

/// A single attribute value.
#[derive(Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// Item class.
    Class(ItemClass),
    /// Text, used for the account and access group.
    String(String),
    /// Payload bytes, wiped on drop.
    Data(Zeroizing<Vec<u8>>),
    /// Boolean flag.
    Bool(bool),
    /// Accessibility policy.
    Accessible(AccessibilityPolicy),
    /// Match limit.
    MatchLimit(MatchLimit),
    /// Synchronizable wildcard: matches synchronized and local items.
    SynchronizableAny,
}

impl AttributeValue {
    /// Returns the text value, if this is a string attribute.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the boolean value, if this is a boolean attribute.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the payload bytes, if this is a data attribute.
    #[must_use]
    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            Self::Data(value) => Some(value.as_slice()),
            _ => None,
        }
    }
}

impl fmt::Debug for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(class) => write!(f, "{class}"),
            Self::String(value) => write!(f, "{value:?}"),
            Self::Data(value) => write!(f, "<{} bytes redacted>", value.len()),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Accessible(policy) => write!(f, "{policy}"),
            Self::MatchLimit(limit) => write!(f, "{limit}"),
            Self::SynchronizableAny => f.write_str("syna"),
        }
    }
}

/// An ordered attribute map. Also used for the per-item maps returned by
/// enumeration.
pub type AttributeMap = BTreeMap<AttributeKey, AttributeValue>;

/// The attribute set submitted to the backend for one operation.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Query {
    attributes: AttributeMap,
}

impl Query {
    fn generic_password() -> Self {
        let mut query = Self::default();
        query.insert(
            AttributeKey::Class,
            AttributeValue::Class(ItemClass::GenericPassword),
        );
        query
    }

    fn insert(&mut self, key: AttributeKey, value: AttributeValue) {
        self.attributes.insert(key, value);
    }

    /// Returns the value of `key`, if present.
    #[must_use]
    pub fn get(&self, key: AttributeKey) -> Option<&AttributeValue> {
        self.attributes.get(&key)
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains(&self, key: AttributeKey) -> bool {
        self.attributes.contains_key(&key)
    }

    /// Returns the number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns `true` if the query carries no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Iterates over the attributes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (AttributeKey, &AttributeValue)> {
        self.attributes.iter().map(|(key, value)| (*key, value))
    }

    /// Returns the account attribute.
    #[must_use]
    pub fn account(&self) -> Option<&str> {
        self.get(AttributeKey::Account).and_then(AttributeValue::as_str)
    }

    /// Returns the access group attribute.
    #[must_use]
    pub fn access_group(&self) -> Option<&str> {
        self.get(AttributeKey::AccessGroup).and_then(AttributeValue::as_str)
    }

    /// Returns the match limit, defaulting to [`MatchLimit::One`] like the
    /// backend does.
    #[must_use]
    pub fn match_limit(&self) -> MatchLimit {
        match self.get(AttributeKey::MatchLimit) {
            Some(AttributeValue::MatchLimit(limit)) => *limit,
            _ => MatchLimit::One,
        }
    }

    /// Returns `true` if the boolean flag `key` is set.
    #[must_use]
    pub fn flag(&self, key: AttributeKey) -> bool {
        self.get(key)
            .and_then(AttributeValue::as_bool)
            .unwrap_or(false)
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.attributes.iter().map(|(key, value)| (key.name(), value)))
            .finish()
    }
}

/// Whether a query adds items or looks them up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Purpose {
    Adding,
    Matching,
}

/// Builds queries for one handle's configuration.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    config: &'a KeychainConfig,
}

impl<'a> QueryBuilder<'a> {
    /// Creates a builder over `config`.
    #[must_use]
    pub const fn new(config: &'a KeychainConfig) -> Self {
        Self { config }
    }

    /// Returns the account name for `key`: the prefix followed by the key.
    ///
    /// There is no separator, so prefix `"ab"` with key `"c"` and prefix
    /// `"a"` with key `"bc"` address the same item.
    #[must_use]
    pub fn namespaced(&self, key: &str) -> String {
        namespaced(self.config.key_prefix(), key)
    }

    /// Query that adds `payload` under `key`.
    #[must_use]
    pub fn write(
        &self,
        key: &str,
        payload: &[u8],
        accessibility: Option<AccessibilityPolicy>,
    ) -> Query {
        let mut query = self.for_account(key);
        query.insert(
            AttributeKey::ValueData,
            AttributeValue::Data(Zeroizing::new(payload.to_vec())),
        );
        query.insert(
            AttributeKey::Accessible,
            AttributeValue::Accessible(AccessibilityPolicy::or_default(accessibility)),
        );
        self.scoped(query, Purpose::Adding)
    }

    /// Query that reads the payload stored under `key`.
    ///
    /// With `as_reference` the backend is asked for an item reference
    /// instead of the payload.
    #[must_use]
    pub fn read(&self, key: &str, as_reference: bool) -> Query {
        let mut query = self.for_account(key);
        query.insert(
            AttributeKey::MatchLimit,
            AttributeValue::MatchLimit(MatchLimit::One),
        );
        let returned = if as_reference {
            AttributeKey::ReturnReference
        } else {
            AttributeKey::ReturnData
        };
        query.insert(returned, AttributeValue::Bool(true));
        self.scoped(query, Purpose::Matching)
    }

    /// Query that deletes the item stored under `key`.
    #[must_use]
    pub fn delete(&self, key: &str) -> Query {
        self.scoped(self.for_account(key), Purpose::Matching)
    }

    /// Query that deletes every generic password in scope.
    ///
    /// The key prefix is not applied: items written by handles with other
    /// prefixes are removed too.
    #[must_use]
    pub fn clear(&self) -> Query {
        self.scoped(Query::generic_password(), Purpose::Matching)
    }

    /// Query that enumerates every generic password in scope.
    #[must_use]
    pub fn list(&self) -> Query {
        let mut query = Query::generic_password();
        query.insert(AttributeKey::ReturnAttributes, AttributeValue::Bool(true));
        query.insert(AttributeKey::ReturnReference, AttributeValue::Bool(true));
        query.insert(
            AttributeKey::MatchLimit,
            AttributeValue::MatchLimit(MatchLimit::All),
        );
        self.scoped(query, Purpose::Matching)
    }

    fn for_account(&self, key: &str) -> Query {
        let mut query = Query::generic_password();
        query.insert(
            AttributeKey::Account,
            AttributeValue::String(self.namespaced(key)),
        );
        query
    }

    fn scoped(&self, mut query: Query, purpose: Purpose) -> Query {
        if let Some(group) = self.config.access_group() {
            query.insert(
                AttributeKey::AccessGroup,
                AttributeValue::String(group.to_owned()),
            );
        }
        if self.config.synchronizable() {
            let value = match purpose {
                Purpose::Adding => AttributeValue::Bool(true),
                Purpose::Matching => AttributeValue::SynchronizableAny,
            };
            query.insert(AttributeKey::Synchronizable, value);
        }
        query
    }
}

/// Concatenates `prefix` and `key`.
#[must_use]
pub fn namespaced(prefix: &str, key: &str) -> String {
    let mut account = String::with_capacity(prefix.len() + key.len());
    account.push_str(prefix);
    account.push_str(key);
    account
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(prefix: &str, group: Option<&str>, sync: bool) -> KeychainConfig {
        let mut config = KeychainConfig::new()
            .with_key_prefix(prefix)
            .with_synchronizable(sync);
        if let Some(group) = group {
            config = config.with_access_group(group);
        }
        config
    }

    #[test]
    fn test_namespaced_is_concatenation() {
        assert_eq!(namespaced("test_prefix_", "key"), "test_prefix_key");
        assert_eq!(namespaced("", "key"), "key");
        assert_eq!(namespaced("p", ""), "p");
        assert_eq!(namespaced("ab", "c"), namespaced("a", "bc"));
    }

    #[test]
    fn test_write_query_defaults() {
        let config = KeychainConfig::default();
        let query = QueryBuilder::new(&config).write("key 1", b"hello", None);

        assert_eq!(query.len(), 4);
        assert_eq!(
            query.get(AttributeKey::Class),
            Some(&AttributeValue::Class(ItemClass::GenericPassword))
        );
        assert_eq!(query.account(), Some("key 1"));
        assert_eq!(
            query.get(AttributeKey::ValueData).and_then(AttributeValue::as_data),
            Some(&b"hello"[..])
        );
        assert_eq!(
            query.get(AttributeKey::Accessible),
            Some(&AttributeValue::Accessible(AccessibilityPolicy::WhenUnlocked))
        );
        assert!(!query.contains(AttributeKey::AccessGroup));
        assert!(!query.contains(AttributeKey::Synchronizable));
    }

    #[test]
    fn test_write_query_with_access_option() {
        let config = KeychainConfig::default();
        let query = QueryBuilder::new(&config).write(
            "key 1",
            b"hello",
            Some(AccessibilityPolicy::AfterFirstUnlock),
        );
        assert_eq!(
            query.get(AttributeKey::Accessible),
            Some(&AttributeValue::Accessible(AccessibilityPolicy::AfterFirstUnlock))
        );
    }

    #[test]
    fn test_read_query() {
        let config = config("pre_", None, false);
        let builder = QueryBuilder::new(&config);

        let query = builder.read("key", false);
        assert_eq!(query.account(), Some("pre_key"));
        assert_eq!(query.match_limit(), MatchLimit::One);
        assert!(query.flag(AttributeKey::ReturnData));
        assert!(!query.contains(AttributeKey::ReturnReference));

        let query = builder.read("key", true);
        assert!(query.flag(AttributeKey::ReturnReference));
        assert!(!query.contains(AttributeKey::ReturnData));
    }

    #[test]
    fn test_clear_ignores_prefix() {
        let config = config("pre_", Some("group"), true);
        let query = QueryBuilder::new(&config).clear();

        assert_eq!(query.len(), 3);
        assert_eq!(query.account(), None);
        assert_eq!(query.access_group(), Some("group"));
        assert_eq!(
            query.get(AttributeKey::Synchronizable),
            Some(&AttributeValue::SynchronizableAny)
        );
    }

    #[test]
    fn test_list_query() {
        let config = config("pre_", None, false);
        let query = QueryBuilder::new(&config).list();

        assert_eq!(query.account(), None);
        assert_eq!(query.match_limit(), MatchLimit::All);
        assert!(query.flag(AttributeKey::ReturnAttributes));
        assert!(query.flag(AttributeKey::ReturnReference));
        assert!(!query.contains(AttributeKey::ReturnData));
    }

    #[test]
    fn test_access_group_on_every_operation() {
        let config = config("", Some("123.my.test.group"), false);
        let builder = QueryBuilder::new(&config);

        for query in [
            builder.write("key 1", b"v", None),
            builder.read("key 1", false),
            builder.delete("key 1"),
            builder.clear(),
            builder.list(),
        ] {
            assert_eq!(query.access_group(), Some("123.my.test.group"));
        }
    }

    #[test]
    fn test_synchronizable_asymmetry() {
        let config = config("", None, true);
        let builder = QueryBuilder::new(&config);

        assert_eq!(
            builder.write("key 1", b"v", None).get(AttributeKey::Synchronizable),
            Some(&AttributeValue::Bool(true))
        );
        for query in [
            builder.read("key 1", false),
            builder.delete("key 1"),
            builder.clear(),
            builder.list(),
        ] {
            assert_eq!(
                query.get(AttributeKey::Synchronizable),
                Some(&AttributeValue::SynchronizableAny)
            );
        }
    }

    #[test]
    fn test_unscoped_handle_has_no_scope_attributes() {
        let config = KeychainConfig::default();
        let builder = QueryBuilder::new(&config);

        for query in [
            builder.write("key 1", b"v", None),
            builder.read("key 1", false),
            builder.delete("key 1"),
            builder.clear(),
            builder.list(),
        ] {
            assert!(!query.contains(AttributeKey::Synchronizable));
            assert!(!query.contains(AttributeKey::AccessGroup));
        }
    }

    #[test]
    fn test_building_is_deterministic() {
        let config = config("p", Some("g"), true);
        let builder = QueryBuilder::new(&config);
        assert_eq!(builder.write("k", b"v", None), builder.write("k", b"v", None));
        assert_eq!(builder.read("k", false), builder.read("k", false));
        assert_eq!(builder.clear(), builder.clear());
    }

    #[test]
    fn test_debug_redacts_payload() {
        let config = KeychainConfig::default();
        let query = QueryBuilder::new(&config).write("key", b"secret", None);
        let rendered = format!("{query:?}");
        assert!(rendered.contains("<6 bytes redacted>"));
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("\"acct\""));
    }
}
