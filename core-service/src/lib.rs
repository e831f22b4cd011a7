//! Catalog service façade and bootstrap helpers.
//!
//! This crate wires the configuration, the SQLite pool, one entity store per
//! media kind and the remote adapters into a pair of repositories that share
//! one write lock and one event bus. Desktop hosts typically enable the
//! `desktop-shims` feature, which adds [`bootstrap_desktop`] on top of the
//! reqwest client and the TMDB and OMDb connectors.

pub mod error;
mod service;

pub use error::{Result, ServiceError};
pub use service::{CatalogService, RefreshReport, RowFailure};

#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub use service::{bootstrap_desktop, ProviderCredentials};
