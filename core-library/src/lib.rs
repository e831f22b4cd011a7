//! # Catalog Entity Store
//!
//! Owns the local SQLite cache of movie and TV show records.
//!
//! ## Overview
//!
//! This crate manages:
//! - The SQLite schema (one table per media kind) and its migrations
//! - Composite column converters for lists, image sets and maps
//! - The field-group merge applied before every partial write
//! - The `MediaStore` repository with ordered scans, title search,
//!   genre and year filters, transactions and obsolete-data eviction

pub mod converters;
pub mod db;
pub mod error;
pub mod merge;
pub mod models;
pub mod repositories;

pub use error::{LibraryError, Result};
pub use merge::merge_into;
pub use models::{
    CastMember, CollectionRef, CrewMember, ImageSet, MediaRecord, OrderingRanks, RatingScore,
    RatingSlots, SimilarItem,
};
pub use repositories::{
    new_write_lock, MediaStore, MediaTransaction, Page, PageRequest, SqliteMediaStore, WriteLock,
};
