use core_library::LibraryError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a remote adapter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Repository-level failure.
///
/// `Clone` so that every caller coalesced onto one fetch receives the same
/// outcome.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Adapter call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Record {id} not found")]
    NotFound { id: i64 },

    #[error("Record {id} has no secondary id for ratings lookup")]
    MissingSecondaryId { id: i64 },

    #[error("Store error: {0}")]
    Store(Arc<LibraryError>),
}

impl FetchError {
    /// Adapter-side failures leave the cache untouched and are safe to retry.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            FetchError::Network(_) | FetchError::Timeout(_) | FetchError::Malformed(_)
        )
    }

    /// Translates an adapter error. `id` is the record the call was about,
    /// if any; a `NotFound` without one is reported as a network failure.
    pub fn from_adapter(err: AdapterError, id: Option<i64>, deadline: Duration) -> Self {
        match (err, id) {
            (AdapterError::Network(msg), _) => FetchError::Network(msg),
            (AdapterError::Timeout(_), _) => FetchError::Timeout(deadline),
            (AdapterError::Malformed(msg), _) => FetchError::Malformed(msg),
            (AdapterError::NotFound(_), Some(id)) => FetchError::NotFound { id },
            (AdapterError::NotFound(msg), None) => {
                FetchError::Network(format!("Resource not found: {msg}"))
            }
        }
    }
}

impl From<LibraryError> for FetchError {
    fn from(err: LibraryError) -> Self {
        FetchError::Store(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
