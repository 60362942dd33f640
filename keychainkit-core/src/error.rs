//! Error types for keychain operations.

use thiserror::Error;

use crate::status::Status;

/// Result type for keychain operations.
pub type KeychainResult<T> = Result<T, KeychainError>;

/// Errors raised by [`Keychain`](crate::Keychain) operations.
///
/// A missing item is never an error: reads return `Ok(None)`, deletes return
/// `Ok(false)` and enumeration returns an empty list.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeychainError {
    /// A stored payload could not be decoded as UTF-8 text.
    #[error("stored value is not valid UTF-8")]
    Encoding,

    /// The backend reported a failure status.
    #[error("{message} ({status})")]
    Backend {
        /// Native status code returned by the backend.
        status: Status,
        /// Backend-supplied description, or a generic fallback naming the code.
        message: String,
    },

    /// The backend returned a result that does not fit the query, such as a
    /// list for a single-item lookup.
    #[error("unexpected backend result: {0}")]
    UnexpectedResult(String),

    /// The access gate could not be acquired.
    #[error("keychain lock error: {0}")]
    Lock(String),
}

impl KeychainError {
    /// Creates a backend error, falling back to a generic message when the
    /// backend has no description for `status`.
    #[must_use]
    pub fn backend(status: Status, message: Option<String>) -> Self {
        Self::Backend {
            status,
            message: message.unwrap_or_else(|| format!("KeychainError {}", status.code())),
        }
    }

    /// Creates a lock error.
    #[must_use]
    pub fn lock<S: Into<String>>(message: S) -> Self {
        Self::Lock(message.into())
    }

    /// Returns the native status code, if the error came from the backend.
    #[must_use]
    pub const fn status(&self) -> Option<Status> {
        match self {
            Self::Backend { status, .. } => Some(*status),
            Self::Encoding | Self::UnexpectedResult(_) | Self::Lock(_) => None,
        }
    }

    /// Returns `true` if a stored payload failed UTF-8 decoding.
    #[must_use]
    pub const fn is_encoding(&self) -> bool {
        matches!(self, Self::Encoding)
    }
}
