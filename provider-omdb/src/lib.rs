//! # OMDb Provider
//!
//! Ratings adapter for the Open Movie Database, keyed by IMDb id.
//!
//! Supplies the IMDb, Rotten Tomatoes and Metacritic slots of a record's
//! ratings. Descriptive fields in the OMDb payload are ignored; TMDB is the
//! source for those.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{OmdbConnector, DEFAULT_BASE_URL};
pub use error::{OmdbError, Result};
