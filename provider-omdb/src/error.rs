//! Error types for the OMDb provider

use bridge_traits::error::BridgeError;
use core_metadata::AdapterError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OmdbError {
    #[error("OMDb API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// `Response: "False"` for the requested id
    #[error("OMDb has no entry for {imdb_id}: {message}")]
    NotFound { imdb_id: String, message: String },

    #[error("Failed to parse OMDb response: {0}")]
    ParseError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("OMDb request timed out: {0}")]
    Timeout(String),
}

pub type Result<T> = std::result::Result<T, OmdbError>;

impl From<BridgeError> for OmdbError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Timeout(msg) => OmdbError::Timeout(msg),
            other => OmdbError::NetworkError(other.to_string()),
        }
    }
}

impl From<OmdbError> for AdapterError {
    fn from(error: OmdbError) -> Self {
        match error {
            OmdbError::NotFound { imdb_id, .. } => AdapterError::NotFound(imdb_id),
            OmdbError::ParseError(msg) => AdapterError::Malformed(msg),
            OmdbError::Timeout(msg) => AdapterError::Timeout(msg),
            OmdbError::NetworkError(msg) => AdapterError::Network(msg),
            api @ OmdbError::ApiError { .. } => AdapterError::Network(api.to_string()),
        }
    }
}
