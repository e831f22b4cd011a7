//! # Catalog Repository
//!
//! Cache-aside orchestration for one media kind.
//!
//! ## Overview
//!
//! ```text
//! ┌────────────────────┐  miss / refresh  ┌──────────────────┐
//! │ CatalogRepository  ├─────────────────>│ Remote adapters  │
//! │  - in-flight map   │                  └──────────────────┘
//! │  - clock, events   │  merge + commit  ┌──────────────────┐
//! │                    ├─────────────────>│ MediaStore (tx)  │
//! └─────────┬──────────┘                  └──────────────────┘
//!           │ to_domain
//!           v
//!      DomainRecord
//! ```
//!
//! - Reads (`get_cached`, `ordered`, `search`, filters) never touch the network.
//! - `get_or_fetch` coalesces concurrent misses for one id into one adapter
//!   call and one store write.
//! - Every write is a read-merge-write inside one store transaction. Partial
//!   payloads never erase fields they do not carry.
//! - `get_or_fetch_ratings` serves stored ratings while they are younger
//!   than `ratings_ttl`, and falls back to them when a refresh fails.
//! - `refresh_ordering` replaces a ranked window atomically; on any failure
//!   the ordering is left exactly as it was.
//! - Events are emitted only after the transaction commits.
//!
//! ## Usage
//!
//! ```ignore
//! let movies = CatalogRepository::new(
//!     MediaKind::Movie,
//!     Arc::new(SqliteMediaStore::with_write_lock(pool, MediaKind::Movie, lock)),
//!     adapters,
//!     Arc::new(SystemClock),
//!     event_bus,
//!     config,
//! );
//!
//! movies.refresh_ordering(OrderingKind::Trending, 1).await?;
//! let row = movies.ordered(OrderingKind::Trending).await?;
//! let detail = movies.get_or_fetch(row[0].id()).await?;
//! ```

use crate::domain::DomainRecord;
use crate::error::{FetchError, Result};
use crate::inflight::InflightRegistry;
use crate::mapper::{to_domain, to_entity};
use crate::remote::{AdapterResult, CatalogAdapter, CatalogRequest, DetailAdapter, RatingsAdapter};
use bridge_traits::time::Clock;
use core_library::models::MediaRecord;
use core_library::repositories::{MediaStore, Page, PageRequest};
use core_library::{merge_into, LibraryError};
use core_runtime::config::CatalogConfig;
use core_runtime::events::{CatalogEvent, EventBus, EventStream};
use core_runtime::kinds::{MediaKind, OrderingKind};
use futures::FutureExt;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, trace, warn};

/// The three upstream adapters a repository calls
#[derive(Clone)]
pub struct Adapters {
    pub catalog: Arc<dyn CatalogAdapter>,
    pub details: Arc<dyn DetailAdapter>,
    pub ratings: Arc<dyn RatingsAdapter>,
}

impl Adapters {
    pub fn new(
        catalog: Arc<dyn CatalogAdapter>,
        details: Arc<dyn DetailAdapter>,
        ratings: Arc<dyn RatingsAdapter>,
    ) -> Self {
        Self {
            catalog,
            details,
            ratings,
        }
    }
}

/// Cache-aside repository for one media kind. Cheap to clone.
#[derive(Clone)]
pub struct CatalogRepository {
    inner: Arc<Inner>,
}

struct Inner {
    media_kind: MediaKind,
    store: Arc<dyn MediaStore>,
    adapters: Adapters,
    clock: Arc<dyn Clock>,
    events: EventBus,
    config: CatalogConfig,
    inflight: InflightRegistry<i64, Result<MediaRecord>>,
    ratings_inflight: InflightRegistry<i64, Result<MediaRecord>>,
}

impl CatalogRepository {
    pub fn new(
        media_kind: MediaKind,
        store: Arc<dyn MediaStore>,
        adapters: Adapters,
        clock: Arc<dyn Clock>,
        events: EventBus,
        config: CatalogConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                media_kind,
                store,
                adapters,
                clock,
                events,
                config,
                inflight: InflightRegistry::new(),
                ratings_inflight: InflightRegistry::new(),
            }),
        }
    }

    pub fn media_kind(&self) -> MediaKind {
        self.inner.media_kind
    }

    /// Store-only lookup.
    pub async fn get_cached(&self, id: i64) -> Result<Option<MediaRecord>> {
        Ok(self.inner.store.get_by_id(id).await?)
    }

    /// Cached record if detail-complete, otherwise one coalesced detail fetch.
    ///
    /// Summary-only records written by a catalog refresh count as misses. The
    /// fetched detail is merged onto whatever is stored; orderings are kept.
    ///
    /// # Errors
    ///
    /// Adapter failures and timeouts are returned to every coalesced caller.
    /// Nothing is written in that case.
    #[instrument(skip(self), fields(kind = %self.inner.media_kind))]
    pub async fn get_or_fetch(&self, id: i64) -> Result<DomainRecord> {
        if let Some(record) = self.inner.store.get_by_id(id).await? {
            if record.is_detail_complete() {
                trace!("Cache hit");
                return Ok(to_domain(&record));
            }
        }

        let record = self.fetch_shared(id, false).await?;
        Ok(to_domain(&record))
    }

    /// Forced detail fetch, coalesced with `get_or_fetch` on the same id.
    #[instrument(skip(self), fields(kind = %self.inner.media_kind))]
    pub async fn refresh_details(&self, id: i64) -> Result<DomainRecord> {
        let record = self.fetch_shared(id, true).await?;
        Ok(to_domain(&record))
    }

    async fn fetch_shared(&self, id: i64, force: bool) -> Result<MediaRecord> {
        let inner = Arc::clone(&self.inner);
        self.inner
            .inflight
            .run(id, move || async move { inner.fetch_and_store(id, force).await }.boxed())
            .await
    }

    /// Cached ratings while fresh, otherwise one coalesced ratings fetch.
    ///
    /// Ratings stamped less than `ratings_ttl` ago are returned without a
    /// network call. When the refresh fails with a remote error and the
    /// record already holds ratings, the stale record is returned instead.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the record is not cached
    /// - `MissingSecondaryId` if a fetch is needed and it has no secondary id
    #[instrument(skip(self), fields(kind = %self.inner.media_kind))]
    pub async fn get_or_fetch_ratings(&self, id: i64) -> Result<DomainRecord> {
        let stored = self
            .inner
            .store
            .get_by_id(id)
            .await?
            .ok_or(FetchError::NotFound { id })?;
        if self.inner.ratings_fresh(&stored) {
            trace!("Ratings cache hit");
            return Ok(to_domain(&stored));
        }

        match self.ratings_shared(id, false).await {
            Ok(record) => Ok(to_domain(&record)),
            Err(err) if err.is_remote() && stored.ratings_updated_at.is_some() => {
                warn!(id, error = %err, "Ratings refresh failed, serving stale ratings");
                Ok(to_domain(&stored))
            }
            Err(err) => Err(err),
        }
    }

    /// Fetches ratings by the stored secondary id and merges them per slot.
    ///
    /// Ignores freshness; coalesced with `get_or_fetch_ratings` on the same id.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the record is not cached
    /// - `MissingSecondaryId` if it carries no secondary id
    #[instrument(skip(self), fields(kind = %self.inner.media_kind))]
    pub async fn refresh_ratings(&self, id: i64) -> Result<DomainRecord> {
        let record = self.ratings_shared(id, true).await?;
        Ok(to_domain(&record))
    }

    async fn ratings_shared(&self, id: i64, force: bool) -> Result<MediaRecord> {
        let inner = Arc::clone(&self.inner);
        self.inner
            .ratings_inflight
            .run(id, move || async move { inner.fetch_ratings_and_store(id, force).await }.boxed())
            .await
    }

    /// Replaces one page of `ordering` with the catalog adapter's result.
    ///
    /// `page` is 1-based; 0 is treated as 1. With
    /// `window_start = (page - 1) * page_size`, members ranked at or below
    /// `window_start` keep their ranks, every rank above it is cleared, and
    /// the page's entries are ranked densely after the kept members. Page 1
    /// is therefore a full replacement.
    ///
    /// Returns the number of records ranked by this call.
    ///
    /// # Errors
    ///
    /// On adapter or store failure the ordering is unchanged and a
    /// `RefreshFailed` event is emitted.
    #[instrument(skip(self), fields(kind = %self.inner.media_kind))]
    pub async fn refresh_ordering(&self, ordering: OrderingKind, page: u32) -> Result<usize> {
        let inner = &self.inner;
        let page = page.max(1);
        let result = inner.refresh_ordering_page(ordering, page).await;

        match result {
            Ok(count) => {
                info!(%ordering, page, count, "Ordering refreshed");
                inner.emit(CatalogEvent::OrderingRefreshed {
                    media_kind: inner.media_kind,
                    ordering,
                    page,
                    count,
                });
                Ok(count)
            }
            Err(err) => {
                warn!(%ordering, page, error = %err, "Ordering refresh failed");
                inner.emit(CatalogEvent::RefreshFailed {
                    media_kind: inner.media_kind,
                    ordering,
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Members of `ordering` in rank order.
    pub async fn ordered(&self, ordering: OrderingKind) -> Result<Vec<DomainRecord>> {
        let records = self.inner.store.get_all_ordered_by(ordering).await?;
        Ok(records.iter().map(to_domain).collect())
    }

    pub async fn ordered_page(
        &self,
        ordering: OrderingKind,
        page_request: PageRequest,
    ) -> Result<Page<DomainRecord>> {
        let page = self
            .inner
            .store
            .get_ordered_page(ordering, page_request)
            .await?;
        Ok(page.map(|record| to_domain(&record)))
    }

    /// Case-insensitive title substring search over the cache.
    pub async fn search(&self, query: &str) -> Result<Vec<DomainRecord>> {
        let records = self.inner.store.search(query).await?;
        Ok(records.iter().map(to_domain).collect())
    }

    pub async fn by_genre(&self, genre: &str) -> Result<Vec<DomainRecord>> {
        let records = self.inner.store.filter_by_genre(genre).await?;
        Ok(records.iter().map(to_domain).collect())
    }

    /// Records released in `lo..=hi`. Empty when `lo > hi`.
    pub async fn by_year_range(&self, lo: i32, hi: i32) -> Result<Vec<DomainRecord>> {
        let records = self.inner.store.filter_by_year_range(lo, hi).await?;
        Ok(records.iter().map(to_domain).collect())
    }

    /// Evicts records older than `retention_horizon` that belong to no
    /// ordering. Listed records are never evicted.
    #[instrument(skip(self), fields(kind = %self.inner.media_kind))]
    pub async fn clear_obsolete_data(&self, retention_horizon: Duration) -> Result<u64> {
        let inner = &self.inner;
        let horizon_millis = i64::try_from(retention_horizon.as_millis()).unwrap_or(i64::MAX);
        let cutoff = inner.clock.unix_timestamp_millis().saturating_sub(horizon_millis);

        let removed = inner.store.delete_obsolete(cutoff).await?;
        if removed > 0 {
            info!(removed, "Evicted obsolete records");
            inner.emit(CatalogEvent::ObsoleteDataCleared {
                media_kind: inner.media_kind,
                removed,
            });
        }
        Ok(removed)
    }

    /// Writes a domain-originated edit.
    ///
    /// The edit replaces the stored descriptive fields. Stored orderings and
    /// refresh stamps are kept, and `last_updated` is set to now.
    #[instrument(skip(self, edit), fields(kind = %self.inner.media_kind, id = edit.id()))]
    pub async fn persist_edit(&self, edit: &DomainRecord) -> Result<DomainRecord> {
        let inner = &self.inner;
        if edit.media_kind() != inner.media_kind {
            return Err(LibraryError::InvalidInput {
                field: "media_kind".to_string(),
                message: format!(
                    "{} edit sent to the {} repository",
                    edit.media_kind(),
                    inner.media_kind
                ),
            }
            .into());
        }

        let mut entity = to_entity(edit);
        entity.last_updated = inner.clock.unix_timestamp_millis();
        let id = entity.id;

        let written = inner
            .store
            .run_in_transaction(move |tx| {
                Box::pin(async move {
                    if let Some(stored) = tx.get_by_id(id).await? {
                        entity.orderings = stored.orderings;
                        entity.details_updated_at = stored.details_updated_at;
                        entity.ratings_updated_at = stored.ratings_updated_at;
                    }
                    tx.upsert(&entity).await?;
                    Ok::<_, FetchError>(entity)
                })
            })
            .await?;

        inner.emit(CatalogEvent::RecordCached {
            media_kind: inner.media_kind,
            id,
        });
        Ok(to_domain(&written))
    }

    /// Events for this media kind, emitted after each committed write.
    pub fn subscribe(&self) -> EventStream {
        let media_kind = self.inner.media_kind;
        self.inner
            .events
            .stream()
            .filter(move |event| event.media_kind() == media_kind)
    }

    /// Detail and ratings fetches currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.inner.inflight.in_flight_count() + self.inner.ratings_inflight.in_flight_count()
    }
}

impl Inner {
    fn adapter_timeout(&self) -> Duration {
        self.config.adapter_timeout
    }

    async fn call_adapter<T>(
        &self,
        id: Option<i64>,
        call: impl Future<Output = AdapterResult<T>>,
    ) -> Result<T> {
        let deadline = self.adapter_timeout();
        match tokio::time::timeout(deadline, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(FetchError::from_adapter(err, id, deadline)),
            Err(_) => {
                warn!(?deadline, "Adapter call timed out");
                Err(FetchError::Timeout(deadline))
            }
        }
    }

    fn ratings_fresh(&self, record: &MediaRecord) -> bool {
        let ttl = i64::try_from(self.config.ratings_ttl.as_millis()).unwrap_or(i64::MAX);
        let now = self.clock.unix_timestamp_millis();
        record
            .ratings_updated_at
            .is_some_and(|stamped| now.saturating_sub(stamped) < ttl)
    }

    fn emit(&self, event: CatalogEvent) {
        if self.events.emit(event).is_err() {
            trace!("No event subscribers");
        }
    }

    async fn fetch_and_store(&self, id: i64, force: bool) -> Result<MediaRecord> {
        let media_kind = self.media_kind;

        if !force {
            if let Some(record) = self.store.get_by_id(id).await? {
                if record.is_detail_complete() {
                    return Ok(record);
                }
            }
        }

        debug!(id, kind = %media_kind, "Fetching details");
        let detail = self
            .call_adapter(Some(id), self.adapters.details.fetch_details(media_kind, id))
            .await?;

        if detail.id != id {
            return Err(FetchError::Malformed(format!(
                "Detail payload for {} carried id {}",
                id, detail.id
            )));
        }

        let incoming = detail.into_record(media_kind, self.clock.unix_timestamp_millis());
        let merged = self
            .store
            .run_in_transaction(move |tx| {
                Box::pin(async move {
                    let merged = match tx.get_by_id(id).await? {
                        Some(stored) => merge_into(stored, incoming),
                        None => incoming,
                    };
                    tx.upsert(&merged).await?;
                    Ok::<_, FetchError>(merged)
                })
            })
            .await?;

        self.emit(CatalogEvent::RecordCached { media_kind, id });
        Ok(merged)
    }

    async fn fetch_ratings_and_store(&self, id: i64, force: bool) -> Result<MediaRecord> {
        let stored = self
            .store
            .get_by_id(id)
            .await?
            .ok_or(FetchError::NotFound { id })?;
        if !force && self.ratings_fresh(&stored) {
            return Ok(stored);
        }
        let secondary_id = stored
            .secondary_id
            .filter(|secondary| !secondary.trim().is_empty())
            .ok_or(FetchError::MissingSecondaryId { id })?;

        debug!(id, secondary_id = %secondary_id, "Fetching ratings");
        let ratings = self
            .call_adapter(Some(id), self.adapters.ratings.fetch_ratings(&secondary_id))
            .await?;

        let now = self.clock.unix_timestamp_millis();
        let media_kind = self.media_kind;
        let mut incoming = MediaRecord::new(id, media_kind).with_last_updated(now);
        incoming.ratings = ratings.to_slots();
        incoming.rating_distribution = ratings.distribution;
        incoming.ratings_updated_at = Some(now);

        let merged = self
            .store
            .run_in_transaction(move |tx| {
                Box::pin(async move {
                    let stored = tx.get_by_id(id).await?.ok_or(FetchError::NotFound { id })?;
                    let merged = merge_into(stored, incoming);
                    tx.upsert(&merged).await?;
                    Ok::<_, FetchError>(merged)
                })
            })
            .await?;

        self.emit(CatalogEvent::RatingsUpdated { media_kind, id });
        Ok(merged)
    }

    async fn refresh_ordering_page(&self, ordering: OrderingKind, page: u32) -> Result<usize> {
        let media_kind = self.media_kind;
        let (endpoint, page_size, cache_key) = match self.config.row_for(media_kind, ordering) {
            Some(row) => (row.endpoint.clone(), row.page_size, row.cache_key.as_str()),
            None => (
                ordering.as_str().to_string(),
                self.config.default_page_size,
                ordering.as_str(),
            ),
        };

        let request = CatalogRequest {
            media_kind,
            ordering,
            endpoint,
            page,
            page_size,
        };
        debug!(endpoint = %request.endpoint, cache_key, page, "Fetching catalog page");
        let summaries = self
            .call_adapter(None, self.adapters.catalog.fetch_catalog_page(&request))
            .await?;

        let window_start = i64::from(page - 1) * i64::from(page_size);
        let now = self.clock.unix_timestamp_millis();

        self.store
            .run_in_transaction(move |tx| {
                Box::pin(async move {
                    let retained: HashSet<i64> = tx
                        .members_of(ordering)
                        .await?
                        .into_iter()
                        .filter(|record| {
                            record
                                .orderings
                                .get(ordering)
                                .is_some_and(|rank| rank <= window_start)
                        })
                        .map(|record| record.id)
                        .collect();
                    tx.clear_ordering_above(ordering, window_start).await?;

                    let mut next_rank = retained.len() as i64 + 1;
                    let mut seen = HashSet::new();
                    let mut ranked = 0;

                    for summary in summaries {
                        let id = summary.id;
                        if !seen.insert(id) {
                            continue;
                        }

                        let incoming = summary.into_record(media_kind, now);
                        let mut merged = match tx.get_by_id(id).await? {
                            Some(stored) => merge_into(stored, incoming),
                            None => incoming,
                        };
                        if !retained.contains(&id) {
                            merged.orderings.set(ordering, Some(next_rank));
                            next_rank += 1;
                            ranked += 1;
                        }
                        tx.upsert(&merged).await?;
                    }

                    Ok::<_, FetchError>(ranked)
                })
            })
            .await
    }
}
