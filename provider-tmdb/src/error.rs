//! Error types for the TMDB provider

use bridge_traits::error::BridgeError;
use core_metadata::AdapterError;
use thiserror::Error;

/// TMDB provider errors
#[derive(Error, Debug)]
pub enum TmdbError {
    /// API request returned a non-success status
    #[error("TMDB API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Requested movie, show or list does not exist
    #[error("TMDB resource not found: {resource}")]
    NotFound { resource: String },

    /// Failed to parse API response
    #[error("Failed to parse TMDB response: {0}")]
    ParseError(String),

    /// Transport failure before a response arrived
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("TMDB request timed out: {0}")]
    Timeout(String),
}

/// Result type for TMDB operations
pub type Result<T> = std::result::Result<T, TmdbError>;

impl From<BridgeError> for TmdbError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Timeout(msg) => TmdbError::Timeout(msg),
            other => TmdbError::NetworkError(other.to_string()),
        }
    }
}

impl From<TmdbError> for AdapterError {
    fn from(error: TmdbError) -> Self {
        match error {
            TmdbError::NotFound { resource } => AdapterError::NotFound(resource),
            TmdbError::ParseError(msg) => AdapterError::Malformed(msg),
            TmdbError::Timeout(msg) => AdapterError::Timeout(msg),
            TmdbError::NetworkError(msg) => AdapterError::Network(msg),
            api @ TmdbError::ApiError { .. } => AdapterError::Network(api.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_error_mapping() {
        let not_found: AdapterError = TmdbError::NotFound {
            resource: "movie/1".to_string(),
        }
        .into();
        assert_eq!(not_found, AdapterError::NotFound("movie/1".to_string()));

        let api: AdapterError = TmdbError::ApiError {
            status_code: 503,
            message: "Service unavailable".to_string(),
        }
        .into();
        assert!(matches!(api, AdapterError::Network(msg) if msg.contains("503")));

        let parse: AdapterError = TmdbError::ParseError("eof".to_string()).into();
        assert!(matches!(parse, AdapterError::Malformed(_)));
    }

    #[test]
    fn test_bridge_timeout_is_kept() {
        let error: TmdbError = BridgeError::Timeout("30s".to_string()).into();
        assert!(matches!(error, TmdbError::Timeout(_)));

        let error: TmdbError = BridgeError::OperationFailed("reset".to_string()).into();
        assert!(matches!(error, TmdbError::NetworkError(_)));
    }
}
