//! Field-group merge
//!
//! Providers deliver partial payloads: a catalog page carries a title and a
//! poster, a detail payload carries cast and collection, a ratings payload
//! carries scores. [`merge_into`] folds an incoming partial record onto the
//! stored one so that a group is only replaced when the incoming payload
//! actually supplies it.

use crate::models::MediaRecord;

fn take_some<T>(slot: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *slot = incoming;
    }
}

fn take_non_empty<T>(slot: &mut Vec<T>, incoming: Vec<T>) {
    if !incoming.is_empty() {
        *slot = incoming;
    }
}

/// Merges `incoming` onto `stored` and returns the result.
///
/// - scalar fields and the secondary id: replaced when the incoming value is set
/// - genres, cast, crew, similar: replaced when the incoming list is non-empty
/// - images and ratings: merged per slot
/// - collection: replaced when set
/// - rating distribution: replaced when non-empty
/// - orderings: always the stored ranks; callers assign ranks explicitly
/// - timestamps: the later of the two
pub fn merge_into(mut stored: MediaRecord, incoming: MediaRecord) -> MediaRecord {
    debug_assert_eq!(stored.id, incoming.id);

    take_some(&mut stored.secondary_id, incoming.secondary_id);
    take_some(&mut stored.title, incoming.title);
    take_some(&mut stored.overview, incoming.overview);
    take_some(&mut stored.release_date, incoming.release_date);
    take_some(&mut stored.last_air_date, incoming.last_air_date);
    take_some(&mut stored.year, incoming.year);
    take_some(&mut stored.runtime, incoming.runtime);
    take_some(&mut stored.language, incoming.language);
    take_some(&mut stored.status, incoming.status);

    take_non_empty(&mut stored.genres, incoming.genres);
    take_non_empty(&mut stored.cast, incoming.cast);
    take_non_empty(&mut stored.crew, incoming.crew);
    take_non_empty(&mut stored.similar, incoming.similar);

    take_some(&mut stored.images.poster, incoming.images.poster);
    take_some(&mut stored.images.backdrop, incoming.images.backdrop);
    take_some(&mut stored.images.logo, incoming.images.logo);

    take_some(&mut stored.collection, incoming.collection);

    take_some(&mut stored.ratings.tmdb, incoming.ratings.tmdb);
    take_some(&mut stored.ratings.trakt, incoming.ratings.trakt);
    take_some(&mut stored.ratings.imdb, incoming.ratings.imdb);
    take_some(
        &mut stored.ratings.rotten_tomatoes,
        incoming.ratings.rotten_tomatoes,
    );
    take_some(&mut stored.ratings.metacritic, incoming.ratings.metacritic);

    if !incoming.rating_distribution.is_empty() {
        stored.rating_distribution = incoming.rating_distribution;
    }

    stored.details_updated_at = stored.details_updated_at.max(incoming.details_updated_at);
    stored.ratings_updated_at = stored.ratings_updated_at.max(incoming.ratings_updated_at);
    stored.last_updated = stored.last_updated.max(incoming.last_updated);

    stored
}
