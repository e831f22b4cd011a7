//! TMDB API response types
//!
//! Movie and TV payloads share one struct each for lists and details; the
//! fields that differ by kind (`title`/`name`, `release_date`/`first_air_date`)
//! are both optional and resolved by the accessors.
//!
//! See: https://developer.themoviedb.org/reference/intro/getting-started

use serde::Deserialize;

/// One page of a list endpoint (`trending/movie/day`, `movie/popular`, ...)
#[derive(Debug, Deserialize)]
pub struct PagedResponse {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<ListItem>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u64,
}

/// List entry; also used for `similar.results`
#[derive(Debug, Clone, Deserialize)]
pub struct ListItem {
    pub id: i64,
    pub title: Option<String>,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
}

impl ListItem {
    pub fn display_title(&self) -> Option<String> {
        non_empty(self.title.as_ref().or(self.name.as_ref()))
    }

    pub fn date(&self) -> Option<String> {
        non_empty(self.release_date.as_ref().or(self.first_air_date.as_ref()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CastCredit {
    pub id: i64,
    pub name: String,
    pub character: Option<String>,
    pub profile_path: Option<String>,
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrewCredit {
    pub id: i64,
    pub name: String,
    pub job: Option<String>,
    pub department: Option<String>,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastCredit>,
    #[serde(default)]
    pub crew: Vec<CrewCredit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimilarPage {
    #[serde(default)]
    pub results: Vec<ListItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalIds {
    pub imdb_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageFile {
    pub file_path: String,
    pub iso_639_1: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Images {
    #[serde(default)]
    pub logos: Vec<ImageFile>,
}

impl Images {
    /// English logo if there is one, otherwise the first
    pub fn preferred_logo(&self) -> Option<&str> {
        self.logos
            .iter()
            .find(|logo| logo.iso_639_1.as_deref() == Some("en"))
            .or_else(|| self.logos.first())
            .map(|logo| logo.file_path.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
}

/// `movie/{id}` or `tv/{id}` with `credits,similar,external_ids,images` appended
#[derive(Debug, Deserialize)]
pub struct DetailResponse {
    pub id: i64,
    pub imdb_id: Option<String>,
    pub title: Option<String>,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    pub last_air_date: Option<String>,
    pub runtime: Option<i32>,
    #[serde(default)]
    pub episode_run_time: Vec<i32>,
    pub original_language: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub belongs_to_collection: Option<Collection>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    #[serde(default)]
    pub credits: Credits,
    #[serde(default)]
    pub similar: SimilarPage,
    #[serde(default)]
    pub external_ids: ExternalIds,
    #[serde(default)]
    pub images: Images,
}

impl DetailResponse {
    pub fn display_title(&self) -> Option<String> {
        non_empty(self.title.as_ref().or(self.name.as_ref()))
    }

    pub fn date(&self) -> Option<String> {
        non_empty(self.release_date.as_ref().or(self.first_air_date.as_ref()))
    }

    /// Movie runtime, or the first listed episode runtime for shows
    pub fn effective_runtime(&self) -> Option<i32> {
        self.runtime
            .filter(|minutes| *minutes > 0)
            .or_else(|| self.episode_run_time.first().copied())
    }

    /// Movies carry `imdb_id` at the top level, shows only in `external_ids`
    pub fn imdb_id(&self) -> Option<String> {
        non_empty(self.imdb_id.as_ref().or(self.external_ids.imdb_id.as_ref()))
    }
}

/// Error body, e.g. `{"status_code": 34, "status_message": "..."}`
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub status_code: Option<i64>,
    pub status_message: Option<String>,
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Genre names for the ids used in list payloads
pub fn genre_name(id: i64) -> Option<&'static str> {
    let name = match id {
        28 => "Action",
        12 => "Adventure",
        16 => "Animation",
        35 => "Comedy",
        80 => "Crime",
        99 => "Documentary",
        18 => "Drama",
        10751 => "Family",
        14 => "Fantasy",
        36 => "History",
        27 => "Horror",
        10402 => "Music",
        9648 => "Mystery",
        10749 => "Romance",
        878 => "Science Fiction",
        10770 => "TV Movie",
        53 => "Thriller",
        10752 => "War",
        37 => "Western",
        10759 => "Action & Adventure",
        10762 => "Kids",
        10763 => "News",
        10764 => "Reality",
        10765 => "Sci-Fi & Fantasy",
        10766 => "Soap",
        10767 => "Talk",
        10768 => "War & Politics",
        _ => return None,
    };
    Some(name)
}
