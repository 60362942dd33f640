//! Observation of built queries.
//!
//! A [`Keychain`](crate::Keychain) reports every query it submits to its
//! observer just before the backend call. Production handles use
//! [`NoopObserver`]; tests install a [`RecordingObserver`] to inspect the
//! exact attribute set of the last operation.

use std::sync::{Mutex, PoisonError};

use crate::query::Query;

/// Receives each query a handle submits to its backend.
pub trait QueryObserver: Send + Sync {
    /// Called with the query about to be submitted.
    fn observe(&self, query: &Query);
}

/// Observer that ignores every query.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl QueryObserver for NoopObserver {
    fn observe(&self, _query: &Query) {}
}

/// Observer that keeps the most recent query.
///
/// Queries may carry payload bytes; they are wiped when replaced or dropped.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    last: Mutex<Option<Query>>,
}

impl RecordingObserver {
    /// Creates an observer with nothing recorded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the most recent query.
    #[must_use]
    pub fn last_query(&self) -> Option<Query> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes and returns the most recent query.
    pub fn take(&self) -> Option<Query> {
        self.last.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

impl QueryObserver for RecordingObserver {
    fn observe(&self, query: &Query) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(query.clone());
    }
}
