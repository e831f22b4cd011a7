//! Workspace placeholder crate.
//!
//! This crate exposes feature flags that map to the individual workspace
//! crates. Host applications can depend on `strmr-workspace` and enable the
//! documented features without wiring each crate individually:
//!
//! - `desktop-shims` (default): `core-service` with the reqwest client and
//!   the TMDB/OMDb connectors
//! - `headless`: `core-service` without any concrete adapters
//! - `store-only`: the entity store and repository crates only

#[cfg(any(feature = "desktop-shims", feature = "headless"))]
pub use core_service;

#[cfg(feature = "store-only")]
pub use core_library;

#[cfg(feature = "store-only")]
pub use core_metadata;
