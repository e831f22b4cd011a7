//! Persisted catalog models
//!
//! [`MediaRecord`] is the cache-side shape of one movie or show: nullable
//! scalar columns, composite values that the store encodes through
//! [`converters`](crate::converters), one rating slot per source and one rank
//! per ordering kind.

use core_runtime::kinds::{MediaKind, OrderingKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Composite values
// =============================================================================

/// Billed cast member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastMember {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

/// Crew member credited with a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewMember {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_path: Option<String>,
}

/// Artwork URLs. Each slot is independent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSet {
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub backdrop: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

impl ImageSet {
    pub fn is_empty(&self) -> bool {
        self.poster.is_none() && self.backdrop.is_none() && self.logo.is_none()
    }
}

/// "Belongs to" collection (a franchise).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRef {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
}

/// Entry of a "more like this" list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarItem {
    pub id: i64,
    pub title: String,
    pub media_kind: MediaKind,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub backdrop_url: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub year: Option<i32>,
}

// =============================================================================
// Ratings
// =============================================================================

/// Score reported by one rating source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingScore {
    pub score: f64,
    pub votes: Option<i64>,
}

impl RatingScore {
    pub fn new(score: f64, votes: Option<i64>) -> Self {
        Self { score, votes }
    }
}

/// One slot per rating source. TMDB, Trakt and IMDb use a 0-10 scale;
/// Rotten Tomatoes and Metacritic use 0-100.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingSlots {
    pub tmdb: Option<RatingScore>,
    pub trakt: Option<RatingScore>,
    pub imdb: Option<RatingScore>,
    pub rotten_tomatoes: Option<RatingScore>,
    pub metacritic: Option<RatingScore>,
}

impl RatingSlots {
    pub fn is_empty(&self) -> bool {
        self.tmdb.is_none()
            && self.trakt.is_none()
            && self.imdb.is_none()
            && self.rotten_tomatoes.is_none()
            && self.metacritic.is_none()
    }
}

// =============================================================================
// Orderings
// =============================================================================

/// Rank held in each ordering kind. Absent means "not a member".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderingRanks {
    ranks: BTreeMap<OrderingKind, i64>,
}

impl OrderingRanks {
    pub fn get(&self, kind: OrderingKind) -> Option<i64> {
        self.ranks.get(&kind).copied()
    }

    pub fn set(&mut self, kind: OrderingKind, rank: Option<i64>) {
        match rank {
            Some(rank) => {
                self.ranks.insert(kind, rank);
            }
            None => {
                self.ranks.remove(&kind);
            }
        }
    }

    pub fn is_member(&self, kind: OrderingKind) -> bool {
        self.ranks.contains_key(&kind)
    }

    /// True when the record appears in no list at all.
    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (OrderingKind, i64)> + '_ {
        self.ranks.iter().map(|(kind, rank)| (*kind, *rank))
    }
}

// =============================================================================
// Media record
// =============================================================================

/// Cached movie or TV show.
///
/// Dates keep the provider's `YYYY-MM-DD` text; parsing happens in the
/// domain mapper. `year` is denormalized from the release date so range
/// filters can run in SQL.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRecord {
    pub id: i64,
    pub media_kind: MediaKind,
    /// Cross-provider reference (IMDb id)
    pub secondary_id: Option<String>,

    pub title: Option<String>,
    pub overview: Option<String>,
    /// Release date for movies, first air date for shows
    pub release_date: Option<String>,
    pub last_air_date: Option<String>,
    pub year: Option<i32>,
    /// Minutes
    pub runtime: Option<i32>,
    pub language: Option<String>,
    pub status: Option<String>,

    pub genres: Vec<String>,
    pub cast: Vec<CastMember>,
    pub crew: Vec<CrewMember>,
    pub images: ImageSet,
    pub collection: Option<CollectionRef>,
    pub similar: Vec<SimilarItem>,

    pub ratings: RatingSlots,
    /// Vote count per score bucket ("1" through "10")
    pub rating_distribution: BTreeMap<String, Option<i64>>,

    pub orderings: OrderingRanks,

    pub details_updated_at: Option<i64>,
    pub ratings_updated_at: Option<i64>,
    /// Epoch millis of the most recent write
    pub last_updated: i64,
}

impl MediaRecord {
    /// Empty record for `id`. Every optional field is unset.
    pub fn new(id: i64, media_kind: MediaKind) -> Self {
        Self {
            id,
            media_kind,
            secondary_id: None,
            title: None,
            overview: None,
            release_date: None,
            last_air_date: None,
            year: None,
            runtime: None,
            language: None,
            status: None,
            genres: Vec::new(),
            cast: Vec::new(),
            crew: Vec::new(),
            images: ImageSet::default(),
            collection: None,
            similar: Vec::new(),
            ratings: RatingSlots::default(),
            rating_distribution: BTreeMap::new(),
            orderings: OrderingRanks::default(),
            details_updated_at: None,
            ratings_updated_at: None,
            last_updated: 0,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the release date and the year derived from it.
    pub fn with_release_date(mut self, date: impl Into<String>) -> Self {
        let date = date.into();
        self.year = year_from_date(&date);
        self.release_date = Some(date);
        self
    }

    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres = genres.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rank(mut self, kind: OrderingKind, rank: i64) -> Self {
        self.orderings.set(kind, Some(rank));
        self
    }

    pub fn with_last_updated(mut self, millis: i64) -> Self {
        self.last_updated = millis;
        self
    }

    /// True once a detail payload has been merged into the record.
    pub fn is_detail_complete(&self) -> bool {
        self.details_updated_at.is_some()
    }

    /// Validate record data
    pub fn validate(&self) -> Result<(), String> {
        if self.id <= 0 {
            return Err(format!("Record id must be positive, got {}", self.id));
        }

        if let Some((kind, rank)) = self.orderings.iter().find(|(_, rank)| *rank < 1) {
            return Err(format!("Rank for {} must be at least 1, got {}", kind, rank));
        }

        if let Some(runtime) = self.runtime {
            if runtime < 0 {
                return Err("Runtime cannot be negative".to_string());
            }
        }

        Ok(())
    }
}

/// Year from the first four characters of a `YYYY-MM-DD` date.
pub fn year_from_date(date: &str) -> Option<i32> {
    date.get(0..4)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_has_no_memberships() {
        let record = MediaRecord::new(10, MediaKind::Movie);
        assert!(record.orderings.is_empty());
        assert!(!record.is_detail_complete());
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_positive_id() {
        assert!(MediaRecord::new(0, MediaKind::Movie).validate().is_err());
        assert!(MediaRecord::new(-3, MediaKind::TvShow).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_rank() {
        let record = MediaRecord::new(1, MediaKind::Movie).with_rank(OrderingKind::Trending, 0);
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_ordering_ranks_set_and_clear() {
        let mut ranks = OrderingRanks::default();
        ranks.set(OrderingKind::Popular, Some(4));
        assert_eq!(ranks.get(OrderingKind::Popular), Some(4));
        assert!(ranks.is_member(OrderingKind::Popular));

        ranks.set(OrderingKind::Popular, None);
        assert!(ranks.is_empty());
    }

    #[test]
    fn test_year_from_date() {
        assert_eq!(year_from_date("2008-07-16"), Some(2008));
        assert_eq!(year_from_date("1999"), Some(1999));
        assert_eq!(year_from_date("99"), None);
        assert_eq!(year_from_date("unknown"), None);
    }

    #[test]
    fn test_with_release_date_sets_year() {
        let record = MediaRecord::new(1, MediaKind::Movie).with_release_date("2005-06-15");
        assert_eq!(record.year, Some(2005));
        assert_eq!(record.release_date.as_deref(), Some("2005-06-15"));
    }
}
