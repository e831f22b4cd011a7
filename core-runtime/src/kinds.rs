//! Closed vocabularies shared by every catalog crate.
//!
//! The set of media kinds and ordering kinds is fixed at compile time; each
//! ordering kind owns one rank column in the persisted schema.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two record families the catalog caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    TvShow,
}

impl MediaKind {
    pub const ALL: [MediaKind; 2] = [MediaKind::Movie, MediaKind::TvShow];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::TvShow => "tv",
        }
    }

    /// Table holding records of this kind.
    pub fn table_name(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movies",
            MediaKind::TvShow => "tv_shows",
        }
    }

    /// Orderings the stock rows use for this kind.
    pub fn default_orderings(&self) -> &'static [OrderingKind] {
        match self {
            MediaKind::Movie => &[
                OrderingKind::Trending,
                OrderingKind::Popular,
                OrderingKind::TopRated,
                OrderingKind::NowPlaying,
                OrderingKind::Upcoming,
            ],
            MediaKind::TvShow => &[
                OrderingKind::Trending,
                OrderingKind::Popular,
                OrderingKind::TopRated,
                OrderingKind::AiringToday,
                OrderingKind::OnTheAir,
            ],
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "movie" | "movies" => Ok(MediaKind::Movie),
            "tv" | "tv_show" | "show" | "shows" => Ok(MediaKind::TvShow),
            other => Err(Error::Config(format!("Unknown media kind: {}", other))),
        }
    }
}

/// A named, independently ranked list view over the record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingKind {
    Trending,
    Popular,
    TopRated,
    NowPlaying,
    Upcoming,
    AiringToday,
    OnTheAir,
}

impl OrderingKind {
    pub const ALL: [OrderingKind; 7] = [
        OrderingKind::Trending,
        OrderingKind::Popular,
        OrderingKind::TopRated,
        OrderingKind::NowPlaying,
        OrderingKind::Upcoming,
        OrderingKind::AiringToday,
        OrderingKind::OnTheAir,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderingKind::Trending => "trending",
            OrderingKind::Popular => "popular",
            OrderingKind::TopRated => "top_rated",
            OrderingKind::NowPlaying => "now_playing",
            OrderingKind::Upcoming => "upcoming",
            OrderingKind::AiringToday => "airing_today",
            OrderingKind::OnTheAir => "on_the_air",
        }
    }

    /// Rank column backing this ordering.
    ///
    /// Returned names are static and safe to splice into SQL.
    pub fn column(&self) -> &'static str {
        match self {
            OrderingKind::Trending => "trending_rank",
            OrderingKind::Popular => "popular_rank",
            OrderingKind::TopRated => "top_rated_rank",
            OrderingKind::NowPlaying => "now_playing_rank",
            OrderingKind::Upcoming => "upcoming_rank",
            OrderingKind::AiringToday => "airing_today_rank",
            OrderingKind::OnTheAir => "on_the_air_rank",
        }
    }
}

impl fmt::Display for OrderingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderingKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        OrderingKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::Config(format!("Unknown ordering kind: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ordering_columns_are_unique() {
        let columns: HashSet<_> = OrderingKind::ALL.iter().map(|k| k.column()).collect();
        assert_eq!(columns.len(), OrderingKind::ALL.len());
    }

    #[test]
    fn test_ordering_kind_parse_round_trip() {
        for kind in OrderingKind::ALL {
            assert_eq!(kind.as_str().parse::<OrderingKind>().unwrap(), kind);
        }
        assert!("weekly".parse::<OrderingKind>().is_err());
    }

    #[test]
    fn test_media_kind_parse() {
        assert_eq!("movie".parse::<MediaKind>().unwrap(), MediaKind::Movie);
        assert_eq!("tv".parse::<MediaKind>().unwrap(), MediaKind::TvShow);
        assert!("podcast".parse::<MediaKind>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&OrderingKind::TopRated).unwrap();
        assert_eq!(json, "\"top_rated\"");
        let kind: MediaKind = serde_json::from_str("\"tv_show\"").unwrap();
        assert_eq!(kind, MediaKind::TvShow);
    }
}
