//! Record / domain mapping
//!
//! Pure conversions between [`MediaRecord`] and [`DomainRecord`]. Field parse
//! failures degrade to `None`; nothing here returns an error.

use crate::domain::{DomainRecord, Movie, Rating, Ratings, TvShow};
use chrono::NaiveDate;
use core_library::models::{MediaRecord, RatingScore, RatingSlots};
use core_runtime::kinds::MediaKind;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn parse_date(text: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text?, DATE_FORMAT).ok()
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|date| date.format(DATE_FORMAT).to_string())
}

fn to_rating(slot: Option<RatingScore>) -> Option<Rating> {
    slot.map(|slot| Rating {
        score: slot.score,
        votes: slot.votes,
    })
}

fn to_slot(rating: Option<Rating>) -> Option<RatingScore> {
    rating.map(|rating| RatingScore::new(rating.score, rating.votes))
}

fn ratings_from_slots(slots: &RatingSlots) -> Ratings {
    Ratings {
        tmdb: to_rating(slots.tmdb),
        trakt: to_rating(slots.trakt),
        imdb: to_rating(slots.imdb),
        rotten_tomatoes: to_rating(slots.rotten_tomatoes),
        metacritic: to_rating(slots.metacritic),
    }
}

fn slots_from_ratings(ratings: &Ratings) -> RatingSlots {
    RatingSlots {
        tmdb: to_slot(ratings.tmdb),
        trakt: to_slot(ratings.trakt),
        imdb: to_slot(ratings.imdb),
        rotten_tomatoes: to_slot(ratings.rotten_tomatoes),
        metacritic: to_slot(ratings.metacritic),
    }
}

fn title_to_entity(title: &str) -> Option<String> {
    (!title.is_empty()).then(|| title.to_string())
}

/// Maps a cached record to its domain shape.
pub fn to_domain(record: &MediaRecord) -> DomainRecord {
    let ratings = ratings_from_slots(&record.ratings);
    let primary_rating = ratings.primary();
    let title = record.title.clone().unwrap_or_default();

    match record.media_kind {
        MediaKind::Movie => DomainRecord::Movie(Movie {
            id: record.id,
            imdb_id: record.secondary_id.clone(),
            title,
            overview: record.overview.clone(),
            release_date: parse_date(record.release_date.as_deref()),
            year: record.year,
            runtime: record.runtime,
            language: record.language.clone(),
            status: record.status.clone(),
            genres: record.genres.clone(),
            cast: record.cast.clone(),
            crew: record.crew.clone(),
            images: record.images.clone(),
            collection: record.collection.clone(),
            similar: record.similar.clone(),
            ratings,
            primary_rating,
            rating_distribution: record.rating_distribution.clone(),
        }),
        MediaKind::TvShow => DomainRecord::TvShow(TvShow {
            id: record.id,
            imdb_id: record.secondary_id.clone(),
            title,
            overview: record.overview.clone(),
            first_air_date: parse_date(record.release_date.as_deref()),
            last_air_date: parse_date(record.last_air_date.as_deref()),
            year: record.year,
            episode_runtime: record.runtime,
            language: record.language.clone(),
            status: record.status.clone(),
            genres: record.genres.clone(),
            cast: record.cast.clone(),
            crew: record.crew.clone(),
            images: record.images.clone(),
            similar: record.similar.clone(),
            ratings,
            primary_rating,
            rating_distribution: record.rating_distribution.clone(),
        }),
    }
}

/// Maps a domain edit back to a record.
///
/// Orderings are left empty and `last_updated` at 0; the repository restores
/// the stored orderings and stamps the write time.
pub fn to_entity(domain: &DomainRecord) -> MediaRecord {
    match domain {
        DomainRecord::Movie(movie) => {
            let mut record = MediaRecord::new(movie.id, MediaKind::Movie);
            record.secondary_id = movie.imdb_id.clone();
            record.title = title_to_entity(&movie.title);
            record.overview = movie.overview.clone();
            record.release_date = format_date(movie.release_date);
            record.year = movie.year;
            record.runtime = movie.runtime;
            record.language = movie.language.clone();
            record.status = movie.status.clone();
            record.genres = movie.genres.clone();
            record.cast = movie.cast.clone();
            record.crew = movie.crew.clone();
            record.images = movie.images.clone();
            record.collection = movie.collection.clone();
            record.similar = movie.similar.clone();
            record.ratings = slots_from_ratings(&movie.ratings);
            record.rating_distribution = movie.rating_distribution.clone();
            record
        }
        DomainRecord::TvShow(show) => {
            let mut record = MediaRecord::new(show.id, MediaKind::TvShow);
            record.secondary_id = show.imdb_id.clone();
            record.title = title_to_entity(&show.title);
            record.overview = show.overview.clone();
            record.release_date = format_date(show.first_air_date);
            record.last_air_date = format_date(show.last_air_date);
            record.year = show.year;
            record.runtime = show.episode_runtime;
            record.language = show.language.clone();
            record.status = show.status.clone();
            record.genres = show.genres.clone();
            record.cast = show.cast.clone();
            record.crew = show.crew.clone();
            record.images = show.images.clone();
            record.similar = show.similar.clone();
            record.ratings = slots_from_ratings(&show.ratings);
            record.rating_distribution = show.rating_distribution.clone();
            record
        }
    }
}
