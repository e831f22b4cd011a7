//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the catalog cache:
//! - Logging and tracing infrastructure
//! - Configuration with row definitions
//! - Event bus for cache change notifications
//! - The closed media and ordering vocabularies
//!
//! Every other catalog crate depends on this one; it depends on nothing in
//! the workspace.

pub mod config;
pub mod error;
pub mod events;
pub mod kinds;
pub mod logging;

pub use config::{CatalogConfig, RowDefinition};
pub use error::{Error, Result};
pub use events::{CatalogEvent, EventBus, EventStream};
pub use kinds::{MediaKind, OrderingKind};
