//! # Catalog Configuration Module
//!
//! Builder-constructed settings for the catalog cache.
//!
//! ## Overview
//!
//! [`CatalogConfig`] carries the handful of knobs the cache needs: where the
//! database lives, how long adapter calls may take, how long unlisted records
//! are retained, and the row definitions that tie each ordering kind to a
//! catalog endpoint. The builder validates everything up front so a bad row
//! table is rejected at startup instead of on the first refresh.
//!
//! Row definitions come from the host. They derive `Deserialize` so a host can
//! load them from whatever format it likes; this crate never reads a file.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CatalogConfig, RowDefinition};
//! use std::time::Duration;
//!
//! let config = CatalogConfig::builder()
//!     .database_path("/var/lib/strmr/catalog.db")
//!     .adapter_timeout(Duration::from_secs(15))
//!     .rows(RowDefinition::movie_defaults())
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::kinds::{MediaKind, OrderingKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RETENTION_HORIZON: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_RATINGS_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// One catalog row: which endpoint feeds which ordering kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowDefinition {
    pub id: String,
    pub title: String,
    pub media_kind: MediaKind,
    pub ordering: OrderingKind,
    /// Provider endpoint path, e.g. `trending/movie/day`
    pub endpoint: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Key hosts use to persist row-local UI state
    pub cache_key: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_enabled() -> bool {
    true
}

impl RowDefinition {
    pub fn new(
        id: impl Into<String>,
        media_kind: MediaKind,
        ordering: OrderingKind,
        endpoint: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            cache_key: format!("{}_{}", media_kind.as_str(), ordering.as_str()),
            id,
            media_kind,
            ordering,
            endpoint: endpoint.into(),
            page_size: DEFAULT_PAGE_SIZE,
            enabled: true,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_cache_key(mut self, cache_key: impl Into<String>) -> Self {
        self.cache_key = cache_key.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Stock movie rows.
    pub fn movie_defaults() -> Vec<RowDefinition> {
        vec![
            RowDefinition::new("trending_movies", MediaKind::Movie, OrderingKind::Trending, "trending/movie/day")
                .with_title("Trending Movies"),
            RowDefinition::new("popular_movies", MediaKind::Movie, OrderingKind::Popular, "movie/popular")
                .with_title("Popular Movies"),
            RowDefinition::new("top_rated_movies", MediaKind::Movie, OrderingKind::TopRated, "movie/top_rated")
                .with_title("Top Rated Movies"),
            RowDefinition::new("now_playing_movies", MediaKind::Movie, OrderingKind::NowPlaying, "movie/now_playing")
                .with_title("Now Playing"),
            RowDefinition::new("upcoming_movies", MediaKind::Movie, OrderingKind::Upcoming, "movie/upcoming")
                .with_title("Upcoming"),
        ]
    }

    /// Stock TV rows.
    pub fn tv_defaults() -> Vec<RowDefinition> {
        vec![
            RowDefinition::new("trending_tv", MediaKind::TvShow, OrderingKind::Trending, "trending/tv/day")
                .with_title("Trending Shows"),
            RowDefinition::new("popular_tv", MediaKind::TvShow, OrderingKind::Popular, "tv/popular")
                .with_title("Popular Shows"),
            RowDefinition::new("top_rated_tv", MediaKind::TvShow, OrderingKind::TopRated, "tv/top_rated")
                .with_title("Top Rated Shows"),
            RowDefinition::new("airing_today_tv", MediaKind::TvShow, OrderingKind::AiringToday, "tv/airing_today")
                .with_title("Airing Today"),
            RowDefinition::new("on_the_air_tv", MediaKind::TvShow, OrderingKind::OnTheAir, "tv/on_the_air")
                .with_title("On The Air"),
        ]
    }
}

/// Validated catalog settings. Use [`CatalogConfig::builder`].
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// SQLite file; `None` keeps the cache in memory
    pub database_path: Option<PathBuf>,
    /// Upper bound on every adapter call
    pub adapter_timeout: Duration,
    /// Age after which unlisted records may be evicted
    pub retention_horizon: Duration,
    /// How long merged ratings are served without asking the ratings service
    pub ratings_ttl: Duration,
    pub event_buffer_size: usize,
    /// Page size used for orderings without a row definition
    pub default_page_size: u32,
    pub rows: Vec<RowDefinition>,
}

impl CatalogConfig {
    pub fn builder() -> CatalogConfigBuilder {
        CatalogConfigBuilder::default()
    }

    /// Looks up the enabled row backing `(media_kind, ordering)`.
    pub fn row_for(&self, media_kind: MediaKind, ordering: OrderingKind) -> Option<&RowDefinition> {
        self.rows
            .iter()
            .find(|row| row.enabled && row.media_kind == media_kind && row.ordering == ordering)
    }

    /// Enabled rows for one media kind, in declaration order.
    pub fn rows_for(&self, media_kind: MediaKind) -> impl Iterator<Item = &RowDefinition> {
        self.rows
            .iter()
            .filter(move |row| row.enabled && row.media_kind == media_kind)
    }

    /// Checks timeouts, page sizes and row uniqueness.
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.database_path {
            if path.as_os_str().is_empty() {
                return Err(Error::Config("Database path cannot be empty".to_string()));
            }
        }

        if self.adapter_timeout.is_zero() {
            return Err(Error::Config(
                "Adapter timeout must be greater than zero".to_string(),
            ));
        }

        if self.retention_horizon.is_zero() {
            return Err(Error::Config(
                "Retention horizon must be greater than zero".to_string(),
            ));
        }

        if self.ratings_ttl.is_zero() {
            return Err(Error::Config(
                "Ratings TTL must be greater than zero".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than zero".to_string(),
            ));
        }

        if self.default_page_size == 0 {
            return Err(Error::Config(
                "Default page size must be greater than zero".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        let mut slots = HashSet::new();
        for row in &self.rows {
            if row.id.trim().is_empty() {
                return Err(Error::Config("Row id cannot be empty".to_string()));
            }
            if row.page_size == 0 {
                return Err(Error::Config(format!(
                    "Row '{}' must have a page size greater than zero",
                    row.id
                )));
            }
            if row.endpoint.trim().is_empty() {
                return Err(Error::Config(format!("Row '{}' has no endpoint", row.id)));
            }
            if !ids.insert(row.id.as_str()) {
                return Err(Error::Config(format!("Duplicate row id '{}'", row.id)));
            }
            if row.enabled && !slots.insert((row.media_kind, row.ordering)) {
                return Err(Error::Config(format!(
                    "Row '{}' maps {} {} which another row already backs",
                    row.id, row.media_kind, row.ordering
                )));
            }
        }

        Ok(())
    }
}

/// Builder for [`CatalogConfig`].
#[derive(Debug, Default)]
pub struct CatalogConfigBuilder {
    database_path: Option<PathBuf>,
    adapter_timeout: Option<Duration>,
    retention_horizon: Option<Duration>,
    ratings_ttl: Option<Duration>,
    event_buffer_size: Option<usize>,
    default_page_size: Option<u32>,
    rows: Vec<RowDefinition>,
}

impl CatalogConfigBuilder {
    pub fn database_path(mut self, path: impl AsRef<Path>) -> Self {
        self.database_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn adapter_timeout(mut self, timeout: Duration) -> Self {
        self.adapter_timeout = Some(timeout);
        self
    }

    pub fn retention_horizon(mut self, horizon: Duration) -> Self {
        self.retention_horizon = Some(horizon);
        self
    }

    pub fn ratings_ttl(mut self, ttl: Duration) -> Self {
        self.ratings_ttl = Some(ttl);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn default_page_size(mut self, page_size: u32) -> Self {
        self.default_page_size = Some(page_size);
        self
    }

    pub fn row(mut self, row: RowDefinition) -> Self {
        self.rows.push(row);
        self
    }

    pub fn rows(mut self, rows: impl IntoIterator<Item = RowDefinition>) -> Self {
        self.rows.extend(rows);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` describing the first invalid setting.
    pub fn build(self) -> Result<CatalogConfig> {
        let config = CatalogConfig {
            database_path: self.database_path,
            adapter_timeout: self.adapter_timeout.unwrap_or(DEFAULT_ADAPTER_TIMEOUT),
            retention_horizon: self.retention_horizon.unwrap_or(DEFAULT_RETENTION_HORIZON),
            ratings_ttl: self.ratings_ttl.unwrap_or(DEFAULT_RATINGS_TTL),
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
            default_page_size: self.default_page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            rows: self.rows,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = CatalogConfig::builder().build().unwrap();

        assert!(config.database_path.is_none());
        assert_eq!(config.adapter_timeout, DEFAULT_ADAPTER_TIMEOUT);
        assert_eq!(config.retention_horizon, DEFAULT_RETENTION_HORIZON);
        assert_eq!(config.ratings_ttl, DEFAULT_RATINGS_TTL);
        assert_eq!(config.event_buffer_size, crate::events::DEFAULT_EVENT_BUFFER_SIZE);
        assert_eq!(config.default_page_size, 20);
        assert!(config.rows.is_empty());
    }

    #[test]
    fn test_stock_rows_validate() {
        let config = CatalogConfig::builder()
            .database_path("/tmp/catalog.db")
            .rows(RowDefinition::movie_defaults())
            .rows(RowDefinition::tv_defaults())
            .build()
            .unwrap();

        assert_eq!(config.rows.len(), 10);
        let trending = config
            .row_for(MediaKind::TvShow, OrderingKind::Trending)
            .unwrap();
        assert_eq!(trending.endpoint, "trending/tv/day");
        assert_eq!(trending.cache_key, "tv_trending");
        assert_eq!(config.rows_for(MediaKind::Movie).count(), 5);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = CatalogConfig::builder()
            .adapter_timeout(Duration::ZERO)
            .build();

        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("timeout")));
    }

    #[test]
    fn test_zero_ratings_ttl_rejected() {
        let result = CatalogConfig::builder()
            .ratings_ttl(Duration::ZERO)
            .build();

        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("Ratings TTL")));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let result = CatalogConfig::builder()
            .row(
                RowDefinition::new("trending", MediaKind::Movie, OrderingKind::Trending, "trending/movie/day")
                    .with_page_size(0),
            )
            .build();

        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("page size")));
    }

    #[test]
    fn test_duplicate_row_id_rejected() {
        let result = CatalogConfig::builder()
            .row(RowDefinition::new("row", MediaKind::Movie, OrderingKind::Trending, "a"))
            .row(RowDefinition::new("row", MediaKind::Movie, OrderingKind::Popular, "b"))
            .build();

        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("Duplicate row id")));
    }

    #[test]
    fn test_duplicate_ordering_slot_rejected() {
        let result = CatalogConfig::builder()
            .row(RowDefinition::new("one", MediaKind::Movie, OrderingKind::Trending, "a"))
            .row(RowDefinition::new("two", MediaKind::Movie, OrderingKind::Trending, "b"))
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_disabled_row_does_not_claim_slot() {
        let config = CatalogConfig::builder()
            .row(RowDefinition::new("old", MediaKind::Movie, OrderingKind::Trending, "a").disabled())
            .row(RowDefinition::new("new", MediaKind::Movie, OrderingKind::Trending, "b"))
            .build()
            .unwrap();

        let row = config.row_for(MediaKind::Movie, OrderingKind::Trending).unwrap();
        assert_eq!(row.id, "new");
    }

    #[test]
    fn test_row_definition_deserializes_with_defaults() {
        let json = r#"{
            "id": "trending_movies",
            "title": "Trending",
            "media_kind": "movie",
            "ordering": "trending",
            "endpoint": "trending/movie/day",
            "cache_key": "trending_movies"
        }"#;

        let row: RowDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(row.page_size, DEFAULT_PAGE_SIZE);
        assert!(row.enabled);
        assert_eq!(row.ordering, OrderingKind::Trending);
    }
}
