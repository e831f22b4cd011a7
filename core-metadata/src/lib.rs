//! # Catalog Metadata
//!
//! Everything between the remote providers and the UI-facing model.
//!
//! ## Overview
//!
//! This crate provides:
//! - The domain model (`Movie`, `TvShow`, `DomainRecord`)
//! - The pure record/domain mapper
//! - Remote adapter traits for catalog, detail and ratings services
//! - Fetch coalescing for concurrent cache misses
//! - `CatalogRepository`, the cache-aside orchestrator over a `MediaStore`

pub mod domain;
pub mod error;
pub mod inflight;
pub mod mapper;
pub mod remote;
pub mod repository;

pub use domain::{DomainRecord, Movie, Rating, Ratings, TvShow};
pub use error::{AdapterError, FetchError, Result};
pub use remote::{
    CatalogAdapter, CatalogRequest, CatalogSummary, DetailAdapter, ExternalRatings, MediaDetail,
    RatingsAdapter,
};
pub use repository::{Adapters, CatalogRepository};
