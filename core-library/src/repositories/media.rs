//! Media record store trait and SQLite implementation
//!
//! One store instance serves one media kind (one table). Stores that share a
//! pool should also share a [`WriteLock`] so that every write transaction in
//! the database is serialized.

use crate::converters;
use crate::error::{LibraryError, Result};
use crate::models::{MediaRecord, OrderingRanks, RatingScore, RatingSlots};
use crate::repositories::{Page, PageRequest};
use async_trait::async_trait;
use core_runtime::kinds::{MediaKind, OrderingKind};
use futures::future::BoxFuture;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, instrument, warn};

/// Global write-transaction lock shared by every store on one pool.
pub type WriteLock = Arc<Mutex<()>>;

pub fn new_write_lock() -> WriteLock {
    Arc::new(Mutex::new(()))
}

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Media store interface for cached catalog records
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Kind of record this store holds
    fn media_kind(&self) -> MediaKind;

    /// Insert or replace a record in its own transaction
    ///
    /// # Errors
    /// Returns `InvalidInput` if the record fails validation.
    async fn upsert(&self, record: &MediaRecord) -> Result<()>;

    /// Insert or replace several records atomically
    async fn upsert_all(&self, records: &[MediaRecord]) -> Result<()>;

    async fn get_by_id(&self, id: i64) -> Result<Option<MediaRecord>>;

    /// Members of `kind` in ascending rank. Non-members are never returned.
    async fn get_all_ordered_by(&self, kind: OrderingKind) -> Result<Vec<MediaRecord>>;

    /// One page of the ordered scan for `kind`
    async fn get_ordered_page(
        &self,
        kind: OrderingKind,
        page_request: PageRequest,
    ) -> Result<Page<MediaRecord>>;

    /// Case-insensitive title substring match, in id order
    async fn search(&self, query: &str) -> Result<Vec<MediaRecord>>;

    /// Records whose genre list contains `genre` (case-insensitive)
    async fn filter_by_genre(&self, genre: &str) -> Result<Vec<MediaRecord>>;

    /// Records with `lo <= year <= hi`
    async fn filter_by_year_range(&self, lo: i32, hi: i32) -> Result<Vec<MediaRecord>>;

    /// Delete a record
    ///
    /// # Returns
    /// - `Ok(true)` if the record was deleted
    /// - `Ok(false)` if it was not stored
    async fn delete(&self, record: &MediaRecord) -> Result<bool>;

    async fn count(&self) -> Result<i64>;

    /// Delete records last written before `cutoff_millis` that belong to no
    /// ordering. Returns the number removed.
    async fn delete_obsolete(&self, cutoff_millis: i64) -> Result<u64>;

    /// Open a write transaction, waiting for the global write lock
    async fn begin(&self) -> Result<Box<dyn MediaTransaction>>;
}

/// Write transaction over one media table.
///
/// Dropping the handle without calling [`commit`](Self::commit) rolls every
/// write back.
#[async_trait]
pub trait MediaTransaction: Send {
    async fn get_by_id(&mut self, id: i64) -> Result<Option<MediaRecord>>;

    async fn upsert(&mut self, record: &MediaRecord) -> Result<()>;

    /// Current members of `kind` in ascending rank
    async fn members_of(&mut self, kind: OrderingKind) -> Result<Vec<MediaRecord>>;

    /// Null the `kind` rank of every record ranked above `rank`.
    /// `rank = 0` clears the whole ordering.
    async fn clear_ordering_above(&mut self, kind: OrderingKind, rank: i64) -> Result<u64>;

    async fn delete(&mut self, id: i64) -> Result<bool>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

impl dyn MediaStore {
    /// Run `block` inside one transaction.
    ///
    /// Commits when `block` returns `Ok`; otherwise rolls back and returns the
    /// block's error, so nothing written inside it stays visible.
    ///
    /// ```ignore
    /// store
    ///     .run_in_transaction(|tx| {
    ///         Box::pin(async move {
    ///             tx.upsert(&first).await?;
    ///             tx.upsert(&second).await?;
    ///             Ok::<_, LibraryError>(())
    ///         })
    ///     })
    ///     .await?;
    /// ```
    pub async fn run_in_transaction<T, E, F>(&self, block: F) -> std::result::Result<T, E>
    where
        T: Send,
        E: From<LibraryError> + Send,
        F: for<'t> FnOnce(&'t mut dyn MediaTransaction) -> BoxFuture<'t, std::result::Result<T, E>>
            + Send,
    {
        let mut tx = self.begin().await?;
        match block(tx.as_mut()).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback after failed transaction block failed");
                }
                Err(err)
            }
        }
    }
}

// =============================================================================
// SQL
// =============================================================================

/// Columns written by an upsert, in bind order. Rank columns follow in
/// `OrderingKind::ALL` order, then the three timestamps.
const RECORD_COLUMNS: &[&str] = &[
    "id",
    "secondary_id",
    "title",
    "normalized_title",
    "overview",
    "release_date",
    "last_air_date",
    "year",
    "runtime",
    "language",
    "status",
    "genres",
    "cast_list",
    "crew_list",
    "images",
    "collection",
    "similar",
    "tmdb_rating",
    "tmdb_votes",
    "trakt_rating",
    "trakt_votes",
    "imdb_rating",
    "imdb_votes",
    "rotten_tomatoes_rating",
    "rotten_tomatoes_votes",
    "metacritic_rating",
    "metacritic_votes",
    "rating_distribution",
];

const TIMESTAMP_COLUMNS: &[&str] = &["details_updated_at", "ratings_updated_at", "last_updated"];

fn all_write_columns() -> Vec<&'static str> {
    RECORD_COLUMNS
        .iter()
        .copied()
        .chain(OrderingKind::ALL.iter().map(|kind| kind.column()))
        .chain(TIMESTAMP_COLUMNS.iter().copied())
        .collect()
}

fn upsert_sql(table: &str) -> String {
    let columns = all_write_columns();
    let placeholders = vec!["?"; columns.len()].join(", ");
    let updates = columns
        .iter()
        .filter(|column| **column != "id")
        .map(|column| format!("{column} = excluded.{column}"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders}) ON CONFLICT(id) DO UPDATE SET {updates}",
        columns.join(", ")
    )
}

fn no_memberships_clause() -> String {
    OrderingKind::ALL
        .iter()
        .map(|kind| format!("{} IS NULL", kind.column()))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Escape LIKE metacharacters; pairs with `ESCAPE '\'`.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for ch in query.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn bind_record<'q>(query: SqliteQuery<'q>, record: &MediaRecord) -> Result<SqliteQuery<'q>> {
    let genres = converters::encode_string_list(&record.genres)?;
    let cast = converters::encode_person_list(&record.cast)?;
    let crew = converters::encode_person_list(&record.crew)?;
    let images = converters::encode_image_set(&record.images)?;
    let collection = record
        .collection
        .as_ref()
        .map(converters::encode_collection)
        .transpose()?;
    let similar = converters::encode_similar_list(&record.similar)?;
    let distribution = converters::encode_int_map(&record.rating_distribution)?;

    let score = |slot: Option<RatingScore>| slot.map(|r| r.score);
    let votes = |slot: Option<RatingScore>| slot.and_then(|r| r.votes);
    let ratings = &record.ratings;

    let mut query = query
        .bind(record.id)
        .bind(record.secondary_id.clone())
        .bind(record.title.clone())
        .bind(record.title.as_ref().map(|title| title.to_lowercase()))
        .bind(record.overview.clone())
        .bind(record.release_date.clone())
        .bind(record.last_air_date.clone())
        .bind(record.year)
        .bind(record.runtime)
        .bind(record.language.clone())
        .bind(record.status.clone())
        .bind(genres)
        .bind(cast)
        .bind(crew)
        .bind(images)
        .bind(collection)
        .bind(similar)
        .bind(score(ratings.tmdb))
        .bind(votes(ratings.tmdb))
        .bind(score(ratings.trakt))
        .bind(votes(ratings.trakt))
        .bind(score(ratings.imdb))
        .bind(votes(ratings.imdb))
        .bind(score(ratings.rotten_tomatoes))
        .bind(votes(ratings.rotten_tomatoes))
        .bind(score(ratings.metacritic))
        .bind(votes(ratings.metacritic))
        .bind(distribution);

    for kind in OrderingKind::ALL {
        query = query.bind(record.orderings.get(kind));
    }

    Ok(query
        .bind(record.details_updated_at)
        .bind(record.ratings_updated_at)
        .bind(record.last_updated))
}

fn rating_from_row(row: &SqliteRow, score_column: &str, votes_column: &str) -> Result<Option<RatingScore>> {
    let score: Option<f64> = row.try_get(score_column)?;
    let votes: Option<i64> = row.try_get(votes_column)?;
    Ok(score.map(|score| RatingScore { score, votes }))
}

fn record_from_row(row: &SqliteRow, media_kind: MediaKind) -> Result<MediaRecord> {
    let text = |column: &str| -> Result<Option<String>> { Ok(row.try_get(column)?) };

    let mut orderings = OrderingRanks::default();
    for kind in OrderingKind::ALL {
        orderings.set(kind, row.try_get::<Option<i64>, _>(kind.column())?);
    }

    Ok(MediaRecord {
        id: row.try_get("id")?,
        media_kind,
        secondary_id: text("secondary_id")?,
        title: text("title")?,
        overview: text("overview")?,
        release_date: text("release_date")?,
        last_air_date: text("last_air_date")?,
        year: row.try_get("year")?,
        runtime: row.try_get("runtime")?,
        language: text("language")?,
        status: text("status")?,
        genres: converters::decode_string_list(text("genres")?.as_deref()).unwrap_or_default(),
        cast: converters::decode_person_list(text("cast_list")?.as_deref()).unwrap_or_default(),
        crew: converters::decode_person_list(text("crew_list")?.as_deref()).unwrap_or_default(),
        images: converters::decode_image_set(text("images")?.as_deref()).unwrap_or_default(),
        collection: converters::decode_collection(text("collection")?.as_deref()),
        similar: converters::decode_similar_list(text("similar")?.as_deref()).unwrap_or_default(),
        ratings: RatingSlots {
            tmdb: rating_from_row(row, "tmdb_rating", "tmdb_votes")?,
            trakt: rating_from_row(row, "trakt_rating", "trakt_votes")?,
            imdb: rating_from_row(row, "imdb_rating", "imdb_votes")?,
            rotten_tomatoes: rating_from_row(row, "rotten_tomatoes_rating", "rotten_tomatoes_votes")?,
            metacritic: rating_from_row(row, "metacritic_rating", "metacritic_votes")?,
        },
        rating_distribution: converters::decode_int_map(text("rating_distribution")?.as_deref())
            .unwrap_or_default(),
        orderings,
        details_updated_at: row.try_get("details_updated_at")?,
        ratings_updated_at: row.try_get("ratings_updated_at")?,
        last_updated: row.try_get("last_updated")?,
    })
}

fn records_from_rows(rows: &[SqliteRow], media_kind: MediaKind) -> Result<Vec<MediaRecord>> {
    rows.iter()
        .map(|row| record_from_row(row, media_kind))
        .collect()
}

fn validate_record(record: &MediaRecord, media_kind: MediaKind) -> Result<()> {
    record.validate().map_err(|msg| LibraryError::InvalidInput {
        field: "media_record".to_string(),
        message: msg,
    })?;

    if record.media_kind != media_kind {
        return Err(LibraryError::InvalidInput {
            field: "media_kind".to_string(),
            message: format!(
                "{} record {} written to the {} store",
                record.media_kind, record.id, media_kind
            ),
        });
    }

    Ok(())
}

async fn write_record(
    conn: &mut SqliteConnection,
    media_kind: MediaKind,
    record: &MediaRecord,
) -> Result<()> {
    validate_record(record, media_kind)?;

    let sql = upsert_sql(media_kind.table_name());
    bind_record(sqlx::query(&sql), record)?
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// =============================================================================
// SQLite store
// =============================================================================

/// SQLite implementation of [`MediaStore`]
pub struct SqliteMediaStore {
    pool: SqlitePool,
    media_kind: MediaKind,
    write_lock: WriteLock,
}

impl SqliteMediaStore {
    /// Create a store with its own write lock
    pub fn new(pool: SqlitePool, media_kind: MediaKind) -> Self {
        Self::with_write_lock(pool, media_kind, new_write_lock())
    }

    /// Create a store that serializes writes with other stores on `write_lock`
    pub fn with_write_lock(pool: SqlitePool, media_kind: MediaKind, write_lock: WriteLock) -> Self {
        Self {
            pool,
            media_kind,
            write_lock,
        }
    }

    fn table(&self) -> &'static str {
        self.media_kind.table_name()
    }

    async fn fetch_records(&self, query: SqliteQuery<'_>) -> Result<Vec<MediaRecord>> {
        let rows = query.fetch_all(&self.pool).await?;
        records_from_rows(&rows, self.media_kind)
    }

    async fn begin_sqlite(&self) -> Result<SqliteMediaTransaction> {
        let write_guard = Arc::clone(&self.write_lock).lock_owned().await;
        let tx = self.pool.begin().await?;
        Ok(SqliteMediaTransaction {
            tx,
            media_kind: self.media_kind,
            write_guard,
        })
    }
}

#[async_trait]
impl MediaStore for SqliteMediaStore {
    fn media_kind(&self) -> MediaKind {
        self.media_kind
    }

    #[instrument(skip(self, record), fields(kind = %self.media_kind, id = record.id))]
    async fn upsert(&self, record: &MediaRecord) -> Result<()> {
        let mut tx = self.begin_sqlite().await?;
        write_record(&mut tx.tx, self.media_kind, record).await?;
        tx.tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, records), fields(kind = %self.media_kind, count = records.len()))]
    async fn upsert_all(&self, records: &[MediaRecord]) -> Result<()> {
        let mut tx = self.begin_sqlite().await?;
        for record in records {
            write_record(&mut tx.tx, self.media_kind, record).await?;
        }
        tx.tx.commit().await?;
        debug!("Upserted records");
        Ok(())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<MediaRecord>> {
        let sql = format!("SELECT * FROM {} WHERE id = ?", self.table());
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| record_from_row(&row, self.media_kind))
            .transpose()
    }

    async fn get_all_ordered_by(&self, kind: OrderingKind) -> Result<Vec<MediaRecord>> {
        let column = kind.column();
        let sql = format!(
            "SELECT * FROM {} WHERE {column} IS NOT NULL ORDER BY {column} ASC, id ASC",
            self.table()
        );
        self.fetch_records(sqlx::query(&sql)).await
    }

    async fn get_ordered_page(
        &self,
        kind: OrderingKind,
        page_request: PageRequest,
    ) -> Result<Page<MediaRecord>> {
        let column = kind.column();
        let sql = format!(
            "SELECT * FROM {} WHERE {column} IS NOT NULL ORDER BY {column} ASC, id ASC LIMIT ? OFFSET ?",
            self.table()
        );
        let items = self
            .fetch_records(
                sqlx::query(&sql)
                    .bind(page_request.limit() as i64)
                    .bind(page_request.offset() as i64),
            )
            .await?;

        let count_sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {column} IS NOT NULL",
            self.table()
        );
        let total: i64 = sqlx::query_scalar(&count_sql).fetch_one(&self.pool).await?;

        Ok(Page::new(items, total as u64, page_request))
    }

    #[instrument(skip(self), fields(kind = %self.media_kind))]
    async fn search(&self, query: &str) -> Result<Vec<MediaRecord>> {
        let sql = format!(
            "SELECT * FROM {} WHERE normalized_title LIKE ? ESCAPE '\\' ORDER BY id ASC",
            self.table()
        );
        self.fetch_records(sqlx::query(&sql).bind(like_pattern(query)))
            .await
    }

    async fn filter_by_genre(&self, genre: &str) -> Result<Vec<MediaRecord>> {
        let table = self.table();
        let sql = format!(
            "SELECT * FROM {table} WHERE CASE WHEN json_valid({table}.genres) THEN EXISTS (\
                 SELECT 1 FROM json_each({table}.genres) WHERE lower(json_each.value) = lower(?)\
             ) ELSE 0 END ORDER BY id ASC"
        );
        self.fetch_records(sqlx::query(&sql).bind(genre.trim()))
            .await
    }

    async fn filter_by_year_range(&self, lo: i32, hi: i32) -> Result<Vec<MediaRecord>> {
        let sql = format!(
            "SELECT * FROM {} WHERE year BETWEEN ? AND ? ORDER BY id ASC",
            self.table()
        );
        self.fetch_records(sqlx::query(&sql).bind(lo).bind(hi))
            .await
    }

    async fn delete(&self, record: &MediaRecord) -> Result<bool> {
        let mut tx = self.begin_sqlite().await?;
        let deleted = tx.delete(record.id).await?;
        tx.tx.commit().await?;
        Ok(deleted)
    }

    async fn count(&self) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table());
        Ok(sqlx::query_scalar(&sql).fetch_one(&self.pool).await?)
    }

    #[instrument(skip(self), fields(kind = %self.media_kind))]
    async fn delete_obsolete(&self, cutoff_millis: i64) -> Result<u64> {
        let sql = format!(
            "DELETE FROM {} WHERE last_updated < ? AND {}",
            self.table(),
            no_memberships_clause()
        );

        let mut tx = self.begin_sqlite().await?;
        let removed = sqlx::query(&sql)
            .bind(cutoff_millis)
            .execute(&mut *tx.tx)
            .await?
            .rows_affected();
        tx.tx.commit().await?;

        debug!(removed, "Deleted obsolete records");
        Ok(removed)
    }

    async fn begin(&self) -> Result<Box<dyn MediaTransaction>> {
        Ok(Box::new(self.begin_sqlite().await?))
    }
}

/// SQLite write transaction holding the global write lock until it ends.
pub struct SqliteMediaTransaction {
    // Declared before the guard so the transaction is rolled back before the
    // lock is released.
    tx: Transaction<'static, Sqlite>,
    media_kind: MediaKind,
    write_guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl MediaTransaction for SqliteMediaTransaction {
    async fn get_by_id(&mut self, id: i64) -> Result<Option<MediaRecord>> {
        let sql = format!("SELECT * FROM {} WHERE id = ?", self.media_kind.table_name());
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(|row| record_from_row(&row, self.media_kind))
            .transpose()
    }

    async fn upsert(&mut self, record: &MediaRecord) -> Result<()> {
        write_record(&mut self.tx, self.media_kind, record).await
    }

    async fn members_of(&mut self, kind: OrderingKind) -> Result<Vec<MediaRecord>> {
        let column = kind.column();
        let sql = format!(
            "SELECT * FROM {} WHERE {column} IS NOT NULL ORDER BY {column} ASC, id ASC",
            self.media_kind.table_name()
        );
        let rows = sqlx::query(&sql).fetch_all(&mut *self.tx).await?;
        records_from_rows(&rows, self.media_kind)
    }

    async fn clear_ordering_above(&mut self, kind: OrderingKind, rank: i64) -> Result<u64> {
        let column = kind.column();
        let sql = format!(
            "UPDATE {} SET {column} = NULL WHERE {column} > ?",
            self.media_kind.table_name()
        );
        let cleared = sqlx::query(&sql)
            .bind(rank)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();
        Ok(cleared)
    }

    async fn delete(&mut self, id: i64) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?", self.media_kind.table_name());
        let result = sqlx::query(&sql).bind(id).execute(&mut *self.tx).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let SqliteMediaTransaction {
            tx, write_guard, ..
        } = *self;
        tx.commit().await?;
        drop(write_guard);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let SqliteMediaTransaction {
            tx, write_guard, ..
        } = *self;
        tx.rollback().await?;
        drop(write_guard);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::{CastMember, CollectionRef};
    use std::time::Duration;

    async fn movie_store() -> SqliteMediaStore {
        let pool = create_test_pool().await.unwrap();
        SqliteMediaStore::new(pool, MediaKind::Movie)
    }

    fn create_test_record(id: i64, title: &str) -> MediaRecord {
        MediaRecord::new(id, MediaKind::Movie)
            .with_title(title)
            .with_last_updated(1_000)
    }

    #[tokio::test]
    async fn test_upsert_and_get_full_record() {
        let store = movie_store().await;

        let mut record = create_test_record(155, "The Dark Knight")
            .with_release_date("2008-07-16")
            .with_genres(["Action", "Crime"])
            .with_rank(OrderingKind::TopRated, 2);
        record.secondary_id = Some("tt0468569".to_string());
        record.runtime = Some(152);
        record.cast = vec![CastMember {
            id: 3894,
            name: "Christian Bale".to_string(),
            character: Some("Bruce Wayne".to_string()),
            profile_path: None,
            order: Some(0),
        }];
        record.images.poster = Some("/poster.jpg".to_string());
        record.collection = Some(CollectionRef {
            id: 263,
            name: "The Dark Knight Collection".to_string(),
            poster_path: None,
            backdrop_path: None,
        });
        record.ratings.imdb = Some(RatingScore::new(9.0, Some(2_800_000)));
        record.ratings.rotten_tomatoes = Some(RatingScore::new(94.0, None));
        record.rating_distribution.insert("10".to_string(), Some(42));
        record.details_updated_at = Some(900);

        store.upsert(&record).await.unwrap();

        let loaded = store.get_by_id(155).await.unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_row() {
        let store = movie_store().await;
        store.upsert(&create_test_record(1, "Draft")).await.unwrap();
        store.upsert(&create_test_record(1, "Final")).await.unwrap();

        let loaded = store.get_by_id(1).await.unwrap().unwrap();
        assert_eq!(loaded.title.as_deref(), Some("Final"));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_rejects_invalid_record() {
        let store = movie_store().await;
        let result = store.upsert(&create_test_record(0, "Nobody")).await;

        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upsert_rejects_wrong_media_kind() {
        let store = movie_store().await;
        let show = MediaRecord::new(5, MediaKind::TvShow).with_title("Show");

        assert!(store.upsert(&show).await.is_err());
    }

    #[tokio::test]
    async fn test_upsert_all_is_atomic() {
        let store = movie_store().await;
        let records = vec![create_test_record(1, "One"), create_test_record(-1, "Broken")];

        assert!(store.upsert_all(&records).await.is_err());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ordered_scan_excludes_non_members() {
        let store = movie_store().await;
        store
            .upsert_all(&[
                create_test_record(1, "Third").with_rank(OrderingKind::Trending, 3),
                create_test_record(2, "First").with_rank(OrderingKind::Trending, 1),
                create_test_record(3, "Unlisted").with_rank(OrderingKind::Popular, 1),
                create_test_record(4, "Second").with_rank(OrderingKind::Trending, 2),
            ])
            .await
            .unwrap();

        let trending = store
            .get_all_ordered_by(OrderingKind::Trending)
            .await
            .unwrap();
        let ids: Vec<i64> = trending.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 4, 1]);
        assert!(trending
            .iter()
            .all(|r| r.orderings.is_member(OrderingKind::Trending)));

        let page = store
            .get_ordered_page(OrderingKind::Trending, PageRequest::new(1, 2))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, 1);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_substring() {
        let store = movie_store().await;
        store
            .upsert_all(&[
                create_test_record(3, "Bright Light"),
                create_test_record(1, "The Dark Knight"),
                create_test_record(2, "Dark Phoenix"),
            ])
            .await
            .unwrap();

        let results = store.search("dark").await.unwrap();
        let titles: Vec<_> = results.iter().filter_map(|r| r.title.as_deref()).collect();
        assert_eq!(titles, vec!["The Dark Knight", "Dark Phoenix"]);

        assert_eq!(store.search("DARK").await.unwrap().len(), 2);
        assert!(store.search("%").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_filter_by_genre() {
        let store = movie_store().await;
        store
            .upsert_all(&[
                create_test_record(1, "Heat").with_genres(["Crime", "Thriller"]),
                create_test_record(2, "Up").with_genres(["Animation"]),
                create_test_record(3, "Fargo").with_genres(["crime"]),
            ])
            .await
            .unwrap();

        let ids: Vec<i64> = store
            .filter_by_genre("Crime")
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_corrupt_composite_column_fails_closed() {
        let store = movie_store().await;
        store
            .upsert(&create_test_record(1, "Heat").with_genres(["Crime"]))
            .await
            .unwrap();

        sqlx::query("UPDATE movies SET genres = 'not json', images = '{' WHERE id = 1")
            .execute(&store.pool)
            .await
            .unwrap();

        let loaded = store.get_by_id(1).await.unwrap().unwrap();
        assert!(loaded.genres.is_empty());
        assert!(loaded.images.is_empty());
        assert_eq!(loaded.title.as_deref(), Some("Heat"));
        assert!(store.filter_by_genre("Crime").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_filter_by_year_range_inclusive() {
        let store = movie_store().await;
        store
            .upsert_all(&[
                create_test_record(1, "Old").with_release_date("1999-03-31"),
                create_test_record(2, "Mid").with_release_date("2005-06-15"),
                create_test_record(3, "New").with_release_date("2023-07-21"),
            ])
            .await
            .unwrap();

        let ids: Vec<i64> = store
            .filter_by_year_range(2000, 2020)
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![2]);

        assert_eq!(store.filter_by_year_range(1999, 2005).await.unwrap().len(), 2);
        assert!(store.filter_by_year_range(2020, 2000).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = movie_store().await;
        let record = create_test_record(9, "Gone");
        store.upsert(&record).await.unwrap();

        assert!(store.delete(&record).await.unwrap());
        assert!(!store.delete(&record).await.unwrap());
        assert!(store.get_by_id(9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_obsolete_keeps_listed_records() {
        let store = movie_store().await;
        store
            .upsert_all(&[
                create_test_record(1, "Old unlisted").with_last_updated(10),
                create_test_record(2, "Old listed")
                    .with_last_updated(10)
                    .with_rank(OrderingKind::Upcoming, 1),
                create_test_record(3, "Fresh unlisted").with_last_updated(5_000),
            ])
            .await
            .unwrap();

        let removed = store.delete_obsolete(1_000).await.unwrap();

        assert_eq!(removed, 1);
        assert!(store.get_by_id(1).await.unwrap().is_none());
        assert!(store.get_by_id(2).await.unwrap().is_some());
        assert!(store.get_by_id(3).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_run_in_transaction_rolls_back_on_error() {
        let store: Arc<dyn MediaStore> = Arc::new(movie_store().await);
        store.upsert(&create_test_record(1, "Before")).await.unwrap();

        let result: std::result::Result<(), LibraryError> = store
            .run_in_transaction(|tx| {
                Box::pin(async move {
                    tx.upsert(&create_test_record(1, "During")).await?;
                    tx.upsert(&create_test_record(2, "Inserted")).await?;
                    Err(LibraryError::Conversion("abort".to_string()))
                })
            })
            .await;

        assert!(result.is_err());
        let kept = store.get_by_id(1).await.unwrap().unwrap();
        assert_eq!(kept.title.as_deref(), Some("Before"));
        assert!(store.get_by_id(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_run_in_transaction_commits() {
        let store: Arc<dyn MediaStore> = Arc::new(movie_store().await);

        let count = store
            .run_in_transaction(|tx| {
                Box::pin(async move {
                    tx.upsert(&create_test_record(1, "A").with_rank(OrderingKind::Popular, 1))
                        .await?;
                    tx.upsert(&create_test_record(2, "B").with_rank(OrderingKind::Popular, 2))
                        .await?;
                    let cleared = tx.clear_ordering_above(OrderingKind::Popular, 1).await?;
                    Ok::<_, LibraryError>(cleared)
                })
            })
            .await
            .unwrap();

        assert_eq!(count, 1);
        let popular = store.get_all_ordered_by(OrderingKind::Popular).await.unwrap();
        assert_eq!(popular.len(), 1);
        assert_eq!(popular[0].id, 1);
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = movie_store().await;
        {
            let mut tx = store.begin().await.unwrap();
            tx.upsert(&create_test_record(1, "Uncommitted")).await.unwrap();
        }

        assert!(store.get_by_id(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_shared_write_lock_serializes_stores() {
        let pool = create_test_pool().await.unwrap();
        let lock = new_write_lock();
        let movies = SqliteMediaStore::with_write_lock(pool.clone(), MediaKind::Movie, lock.clone());
        let shows = Arc::new(SqliteMediaStore::with_write_lock(pool, MediaKind::TvShow, lock));

        let tx = movies.begin().await.unwrap();

        let writer = {
            let shows = Arc::clone(&shows);
            tokio::spawn(async move {
                shows
                    .upsert(&MediaRecord::new(1, MediaKind::TvShow).with_title("Show"))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!writer.is_finished());

        tx.rollback().await.unwrap();
        writer.await.unwrap().unwrap();
        assert_eq!(shows.count().await.unwrap(), 1);
    }

    #[test]
    fn test_upsert_sql_binds_every_column() {
        let sql = upsert_sql("movies");
        let placeholders = sql.matches('?').count();
        assert_eq!(placeholders, RECORD_COLUMNS.len() + OrderingKind::ALL.len() + 3);
        assert!(sql.contains("trending_rank = excluded.trending_rank"));
        assert!(!sql.contains("id = excluded.id,"));
    }

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("Dark"), "%dark%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }
}
