//! Remote adapter interfaces
//!
//! The repository consumes three upstream services through these traits:
//! catalog pages (ordered summaries), item details, and auxiliary ratings.
//! Payloads are partial by nature; `into_record` builds a [`MediaRecord`]
//! holding only what the payload carries, ready for
//! [`merge_into`](core_library::merge_into).

use crate::error::AdapterError;
use async_trait::async_trait;
use core_library::models::{CastMember, CollectionRef, CrewMember, ImageSet, MediaRecord};
use core_library::models::{RatingScore, RatingSlots, SimilarItem};
use core_runtime::kinds::{MediaKind, OrderingKind};
use std::collections::BTreeMap;

pub type AdapterResult<T> = std::result::Result<T, AdapterError>;

/// One page request against a catalog endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRequest {
    pub media_kind: MediaKind,
    pub ordering: OrderingKind,
    /// Provider path, e.g. `trending/movie/day`
    pub endpoint: String,
    /// 1-based
    pub page: u32,
    pub page_size: u32,
}

/// Lightweight list entry returned by a catalog endpoint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSummary {
    pub id: i64,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub genres: Vec<String>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
}

impl CatalogSummary {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Partial record with only the summary fields set. No ordering is set.
    pub fn into_record(self, media_kind: MediaKind, now_millis: i64) -> MediaRecord {
        let mut record = MediaRecord::new(self.id, media_kind).with_last_updated(now_millis);
        record.title = self.title;
        record.overview = self.overview;
        if let Some(date) = self.release_date {
            record = record.with_release_date(date);
        }
        record.images.poster = self.poster_url;
        record.images.backdrop = self.backdrop_url;
        record.genres = self.genres;
        record.ratings.tmdb = self
            .vote_average
            .map(|score| RatingScore::new(score, self.vote_count));
        record
    }
}

/// Full detail payload for one item
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaDetail {
    pub id: i64,
    /// IMDb id
    pub secondary_id: Option<String>,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub last_air_date: Option<String>,
    pub runtime: Option<i32>,
    pub language: Option<String>,
    pub status: Option<String>,
    pub genres: Vec<String>,
    pub cast: Vec<CastMember>,
    pub crew: Vec<CrewMember>,
    pub images: ImageSet,
    pub collection: Option<CollectionRef>,
    pub similar: Vec<SimilarItem>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
}

impl MediaDetail {
    /// Partial record stamped as detail-complete at `now_millis`.
    pub fn into_record(self, media_kind: MediaKind, now_millis: i64) -> MediaRecord {
        let mut record = MediaRecord::new(self.id, media_kind).with_last_updated(now_millis);
        record.secondary_id = self.secondary_id;
        record.title = self.title;
        record.overview = self.overview;
        if let Some(date) = self.release_date {
            record = record.with_release_date(date);
        }
        record.last_air_date = self.last_air_date;
        record.runtime = self.runtime;
        record.language = self.language;
        record.status = self.status;
        record.genres = self.genres;
        record.cast = self.cast;
        record.crew = self.crew;
        record.images = self.images;
        record.collection = self.collection;
        record.similar = self.similar;
        record.ratings.tmdb = self
            .vote_average
            .map(|score| RatingScore::new(score, self.vote_count));
        record.details_updated_at = Some(now_millis);
        record
    }
}

/// Scores from the auxiliary ratings service
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalRatings {
    pub imdb: Option<RatingScore>,
    /// Percent, 0-100
    pub rotten_tomatoes: Option<RatingScore>,
    /// 0-100
    pub metacritic: Option<RatingScore>,
    /// 0-10. The OMDb connector never sets it; host adapters and edits do.
    pub trakt: Option<RatingScore>,
    pub distribution: BTreeMap<String, Option<i64>>,
}

impl ExternalRatings {
    pub fn is_empty(&self) -> bool {
        self.to_slots().is_empty() && self.distribution.is_empty()
    }

    /// Rating slots carried by this payload; TMDB is never set here.
    pub fn to_slots(&self) -> RatingSlots {
        RatingSlots {
            tmdb: None,
            trakt: self.trakt,
            imdb: self.imdb,
            rotten_tomatoes: self.rotten_tomatoes,
            metacritic: self.metacritic,
        }
    }
}

/// Ordered catalog pages (trending, popular, ...)
#[async_trait]
pub trait CatalogAdapter: Send + Sync {
    /// Summaries in rank order
    async fn fetch_catalog_page(
        &self,
        request: &CatalogRequest,
    ) -> AdapterResult<Vec<CatalogSummary>>;
}

/// Per-item detail payloads
#[async_trait]
pub trait DetailAdapter: Send + Sync {
    async fn fetch_details(&self, media_kind: MediaKind, id: i64) -> AdapterResult<MediaDetail>;
}

/// Ratings keyed by the cross-provider secondary id
#[async_trait]
pub trait RatingsAdapter: Send + Sync {
    async fn fetch_ratings(&self, secondary_id: &str) -> AdapterResult<ExternalRatings>;
}
