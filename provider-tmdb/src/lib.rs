//! # TMDB Provider
//!
//! Catalog and detail adapters for The Movie Database API v3.
//!
//! ## Overview
//!
//! This module provides:
//! - Ordered catalog pages (trending, popular, top rated, ...) as `CatalogSummary`
//! - Full movie and show details in one call via `append_to_response`
//! - Status and transport error mapping onto `AdapterError`
//!
//! All traffic goes through the host's `HttpClient`, so the connector is
//! tested against a mocked client.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{TmdbConnector, DEFAULT_BASE_URL, DEFAULT_IMAGE_BASE_URL};
pub use error::{Result, TmdbError};
