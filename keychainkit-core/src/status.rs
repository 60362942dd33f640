//! Native status codes reported by secure storage backends.

use std::fmt;

use crate::error::{KeychainError, KeychainResult};

/// A native result code (`OSStatus` on Apple platforms).
///
/// Zero means success and [`Status::ITEM_NOT_FOUND`] means no item matched the
/// query. Every other value is a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(i32);

impl Status {
    /// The operation completed successfully (`errSecSuccess`).
    pub const SUCCESS: Self = Self(0);
    /// A required parameter was invalid (`errSecParam`).
    pub const PARAM: Self = Self(-50);
    /// The caller is not allowed to access the item (`errSecAuthFailed`).
    pub const AUTH_FAILED: Self = Self(-25293);
    /// An item with the same primary attributes exists (`errSecDuplicateItem`).
    pub const DUPLICATE_ITEM: Self = Self(-25299);
    /// No item matched the query (`errSecItemNotFound`).
    pub const ITEM_NOT_FOUND: Self = Self(-25300);
    /// User interaction is required but not allowed, e.g. while the device is
    /// locked (`errSecInteractionNotAllowed`).
    pub const INTERACTION_NOT_ALLOWED: Self = Self(-25308);
    /// The process lacks the keychain entitlement (`errSecMissingEntitlement`).
    pub const MISSING_ENTITLEMENT: Self = Self(-34018);
    /// Data could not be encoded or decoded (`errSecInvalidEncoding`).
    pub const INVALID_ENCODING: Self = Self(-67853);

    /// Wraps a raw status code.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        Self(code)
    }

    /// Returns the raw status code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }

    /// Returns `true` for the success sentinel.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == Self::SUCCESS.0
    }

    /// Returns `true` for the not-found sentinel.
    #[must_use]
    pub const fn is_not_found(self) -> bool {
        self.0 == Self::ITEM_NOT_FOUND.0
    }

    /// Converts the status into a result, using `describe` to obtain the
    /// backend's message for failures.
    ///
    /// # Errors
    ///
    /// Returns [`KeychainError::Backend`] for any status other than success.
    pub fn check<F>(self, describe: F) -> KeychainResult<()>
    where
        F: FnOnce(Self) -> Option<String>,
    {
        if self.is_success() {
            Ok(())
        } else {
            Err(KeychainError::backend(self, describe(self)))
        }
    }
}

impl From<i32> for Status {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        assert!(Status::SUCCESS.is_success());
        assert!(!Status::SUCCESS.is_not_found());
        assert!(Status::ITEM_NOT_FOUND.is_not_found());
        assert!(!Status::ITEM_NOT_FOUND.is_success());
        assert_eq!(Status::from(-25300), Status::ITEM_NOT_FOUND);
    }

    #[test]
    fn test_check() {
        assert!(Status::SUCCESS.check(|_| None).is_ok());

        let err = Status::AUTH_FAILED
            .check(|status| Some(format!("denied {}", status.code())))
            .unwrap_err();
        assert_eq!(err.status(), Some(Status::AUTH_FAILED));
        assert!(format!("{err}").starts_with("denied -25293"));
    }
}
