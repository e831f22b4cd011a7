//! # Repository Implementation
//!
//! `MediaStore` is the data-access interface the catalog repositories
//! depend on; `SqliteMediaStore` is its sqlx implementation. One store serves
//! one media kind (one table). All operations return `Result<T>`, and
//! ordered scans can be paged via `Page<T>`.

pub mod media;
pub mod pagination;

pub use media::{
    new_write_lock, MediaStore, MediaTransaction, SqliteMediaStore, SqliteMediaTransaction,
    WriteLock,
};
pub use pagination::{Page, PageRequest};
