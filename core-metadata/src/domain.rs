//! UI-facing domain model
//!
//! Clean counterparts of the cached records: dates are parsed, ratings carry a
//! resolved primary score, and nothing about list membership leaks through.

use chrono::NaiveDate;
use core_library::models::{CastMember, CollectionRef, CrewMember, ImageSet, SimilarItem};
use core_runtime::kinds::MediaKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Score with an optional vote count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub score: f64,
    pub votes: Option<i64>,
}

/// Per-source ratings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ratings {
    pub tmdb: Option<Rating>,
    pub trakt: Option<Rating>,
    pub imdb: Option<Rating>,
    /// 0-100
    pub rotten_tomatoes: Option<Rating>,
    /// 0-100
    pub metacritic: Option<Rating>,
}

impl Ratings {
    /// Single 0-10 score for display.
    ///
    /// Trakt first, then TMDB, IMDb, Metacritic and Rotten Tomatoes (the last
    /// two rescaled from 0-100).
    pub fn primary(&self) -> Option<f64> {
        self.trakt
            .or(self.tmdb)
            .or(self.imdb)
            .map(|rating| rating.score)
            .or_else(|| self.metacritic.map(|rating| rating.score / 10.0))
            .or_else(|| self.rotten_tomatoes.map(|rating| rating.score / 10.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub imdb_id: Option<String>,
    pub title: String,
    pub overview: Option<String>,
    pub release_date: Option<NaiveDate>,
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
    pub ratings: Ratings,
    pub primary_rating: Option<f64>,
    pub rating_distribution: BTreeMap<String, Option<i64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TvShow {
    pub id: i64,
    pub imdb_id: Option<String>,
    pub title: String,
    pub overview: Option<String>,
    pub first_air_date: Option<NaiveDate>,
    pub last_air_date: Option<NaiveDate>,
    pub year: Option<i32>,
    /// Typical episode length in minutes
    pub episode_runtime: Option<i32>,
    pub language: Option<String>,
    pub status: Option<String>,
    pub genres: Vec<String>,
    pub cast: Vec<CastMember>,
    pub crew: Vec<CrewMember>,
    pub images: ImageSet,
    pub similar: Vec<SimilarItem>,
    pub ratings: Ratings,
    pub primary_rating: Option<f64>,
    pub rating_distribution: BTreeMap<String, Option<i64>>,
}

/// Either domain shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainRecord {
    Movie(Movie),
    TvShow(TvShow),
}

impl DomainRecord {
    pub fn id(&self) -> i64 {
        match self {
            DomainRecord::Movie(movie) => movie.id,
            DomainRecord::TvShow(show) => show.id,
        }
    }

    pub fn media_kind(&self) -> MediaKind {
        match self {
            DomainRecord::Movie(_) => MediaKind::Movie,
            DomainRecord::TvShow(_) => MediaKind::TvShow,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            DomainRecord::Movie(movie) => &movie.title,
            DomainRecord::TvShow(show) => &show.title,
        }
    }

    pub fn primary_rating(&self) -> Option<f64> {
        match self {
            DomainRecord::Movie(movie) => movie.primary_rating,
            DomainRecord::TvShow(show) => show.primary_rating,
        }
    }

    pub fn images(&self) -> &ImageSet {
        match self {
            DomainRecord::Movie(movie) => &movie.images,
            DomainRecord::TvShow(show) => &show.images,
        }
    }

    pub fn cast(&self) -> &[CastMember] {
        match self {
            DomainRecord::Movie(movie) => &movie.cast,
            DomainRecord::TvShow(show) => &show.cast,
        }
    }

    pub fn as_movie(&self) -> Option<&Movie> {
        match self {
            DomainRecord::Movie(movie) => Some(movie),
            DomainRecord::TvShow(_) => None,
        }
    }

    pub fn as_tv_show(&self) -> Option<&TvShow> {
        match self {
            DomainRecord::TvShow(show) => Some(show),
            DomainRecord::Movie(_) => None,
        }
    }
}
