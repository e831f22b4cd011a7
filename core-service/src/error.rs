use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Catalog initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] core_metadata::FetchError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
