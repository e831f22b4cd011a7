//! # Host Bridge Traits
//!
//! Capability traits the catalog core needs from its host but does not
//! implement itself.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP used by the provider adapters
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! Desktop hosts get a ready-made `HttpClient` from `bridge-desktop`. Tests
//! mock it with `mockall`.

pub mod error;
pub mod http;
pub mod time;

pub use error::BridgeError;
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use time::{Clock, ManualClock, SystemClock};
