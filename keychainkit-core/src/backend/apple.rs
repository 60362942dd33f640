//! Keychain Services backend for macOS and iOS.
//!
//! Queries are converted to Core Foundation dictionaries keyed by the raw
//! attribute names (`class`, `acct`, `agrp`, ...), which are the string
//! values of the `kSec*` constants, and passed to the `SecItem*` functions.
//!
//! # Caveats
//!
//! - On macOS, access groups and synchronizable items require the data
//!   protection keychain, which needs a signed binary with the matching
//!   entitlements. Unsigned processes get `errSecMissingEntitlement`.
//! - The login keychain on macOS is shared by every application of the
//!   user: enumeration and `clear` may see items this process did not write.

use core_foundation::array::CFArray;
use core_foundation::base::{CFType, CFTypeRef, TCFType};
use core_foundation::boolean::CFBoolean;
use core_foundation::data::CFData;
use core_foundation::dictionary::CFDictionary;
use core_foundation::string::CFString;
use security_framework_sys::keychain_item::{SecItemAdd, SecItemCopyMatching, SecItemDelete};

use super::{MatchResult, SecureBackend};
use crate::query::{AttributeKey, AttributeMap, AttributeValue, MatchLimit, Query};
use crate::status::Status;

/// Raw value of `kSecAttrSynchronizableAny`.
const SYNCHRONIZABLE_ANY: &str = "syna";

/// [`SecureBackend`] over the system keychain.
///
/// Stateless: every handle may use its own instance. Keychain Services
/// synchronizes concurrent calls internally.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppleKeychain;

impl AppleKeychain {
    /// Creates a backend over the system keychain.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn to_cf(value: &AttributeValue) -> CFType {
    match value {
        AttributeValue::Class(class) => {
            CFString::from_static_string((*class).into()).into_CFType()
        }
        AttributeValue::String(text) => CFString::new(text).into_CFType(),
        AttributeValue::Data(bytes) => CFData::from_buffer(bytes).into_CFType(),
        AttributeValue::Bool(flag) => CFBoolean::from(*flag).into_CFType(),
        AttributeValue::Accessible(policy) => {
            CFString::from_static_string(policy.value()).into_CFType()
        }
        AttributeValue::MatchLimit(limit) => {
            CFString::from_static_string((*limit).into()).into_CFType()
        }
        AttributeValue::SynchronizableAny => {
            CFString::from_static_string(SYNCHRONIZABLE_ANY).into_CFType()
        }
    }
}

fn to_dictionary(query: &Query) -> CFDictionary<CFString, CFType> {
    let pairs: Vec<(CFString, CFType)> = query
        .iter()
        .map(|(key, value)| (CFString::from_static_string(key.name()), to_cf(value)))
        .collect();
    CFDictionary::from_CFType_pairs(&pairs)
}

fn lookup(item: &CFDictionary, key: AttributeKey) -> Option<CFType> {
    let name = CFString::from_static_string(key.name());
    item.find(name.as_CFTypeRef())
        // SAFETY: values of a CF dictionary are CF objects owned by the
        // dictionary; the get rule retains them for the returned wrapper.
        .map(|value| unsafe { CFType::wrap_under_get_rule(*value) })
}

fn item_attributes(item: &CFDictionary) -> AttributeMap {
    let mut attributes = AttributeMap::new();
    for key in [AttributeKey::Account, AttributeKey::AccessGroup] {
        if let Some(text) = lookup(item, key).and_then(|value| value.downcast::<CFString>()) {
            attributes.insert(key, AttributeValue::String(text.to_string()));
        }
    }
    if let Some(flag) = lookup(item, AttributeKey::Synchronizable)
        .and_then(|value| value.downcast::<CFBoolean>())
    {
        attributes.insert(AttributeKey::Synchronizable, AttributeValue::Bool(flag.into()));
    }
    attributes
}

fn parse_many(result: &CFType) -> Vec<AttributeMap> {
    let Some(items) = result.downcast::<CFArray>() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|raw| {
            // SAFETY: array elements are CF objects owned by the array.
            let item = unsafe { CFType::wrap_under_get_rule(*raw) };
            item.downcast::<CFDictionary>()
        })
        .map(|item| item_attributes(&item))
        .collect()
}

impl SecureBackend for AppleKeychain {
    fn add(&self, query: &Query) -> Status {
        let dictionary = to_dictionary(query);
        // SAFETY: the dictionary outlives the call and no result is requested.
        let status = unsafe { SecItemAdd(dictionary.as_concrete_TypeRef(), std::ptr::null_mut()) };
        Status::from_code(status)
    }

    fn copy_matching(&self, query: &Query) -> Result<MatchResult, Status> {
        let dictionary = to_dictionary(query);
        let mut result: CFTypeRef = std::ptr::null();
        // SAFETY: `result` is a valid out pointer; on success it receives an
        // owned reference (create rule) or stays null.
        let status = Status::from_code(unsafe {
            SecItemCopyMatching(dictionary.as_concrete_TypeRef(), &mut result)
        });
        if !status.is_success() {
            return Err(status);
        }

        let limit = query.match_limit();
        if result.is_null() {
            return Ok(match limit {
                MatchLimit::One => MatchResult::Single(None),
                MatchLimit::All => MatchResult::Many(Vec::new()),
            });
        }

        // SAFETY: non-null results of SecItemCopyMatching follow the create rule.
        let result = unsafe { CFType::wrap_under_create_rule(result) };
        Ok(match limit {
            MatchLimit::One => MatchResult::Single(
                result.downcast::<CFData>().map(|data| data.bytes().to_vec()),
            ),
            MatchLimit::All => MatchResult::Many(parse_many(&result)),
        })
    }

    fn delete_matching(&self, query: &Query) -> Status {
        let dictionary = to_dictionary(query);
        // SAFETY: the dictionary outlives the call.
        Status::from_code(unsafe { SecItemDelete(dictionary.as_concrete_TypeRef()) })
    }

    fn error_message(&self, status: Status) -> Option<String> {
        security_framework::base::Error::from_code(status.code()).message()
    }
}
