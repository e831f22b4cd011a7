use crate::error::Result;
use bridge_traits::time::{Clock, SystemClock};
use core_library::db::{create_pool, DatabaseConfig};
use core_library::repositories::{new_write_lock, MediaStore, SqliteMediaStore};
use core_metadata::{Adapters, CatalogRepository, FetchError};
use core_runtime::config::{CatalogConfig, RowDefinition};
use core_runtime::events::{EventBus, EventStream};
use core_runtime::kinds::MediaKind;
use futures::future::join_all;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of [`CatalogService::refresh_rows`]
#[derive(Debug, Default)]
pub struct RefreshReport {
    /// Row id and number of records ranked
    pub refreshed: Vec<(String, usize)>,
    pub failed: Vec<RowFailure>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug)]
pub struct RowFailure {
    pub row_id: String,
    pub error: FetchError,
}

/// Primary façade exposed to host applications.
///
/// Owns the pool and one repository per media kind. Both stores share a
/// single write lock, so writes of different kinds are serialized.
#[derive(Clone)]
pub struct CatalogService {
    config: Arc<CatalogConfig>,
    pool: SqlitePool,
    events: EventBus,
    movies: CatalogRepository,
    tv: CatalogRepository,
}

impl CatalogService {
    /// Opens the database named by `config` (in memory when it names none)
    /// and builds both repositories over `adapters`.
    pub async fn bootstrap(config: CatalogConfig, adapters: Adapters) -> Result<Self> {
        Self::bootstrap_with_clock(config, adapters, Arc::new(SystemClock)).await
    }

    #[instrument(skip_all)]
    pub async fn bootstrap_with_clock(
        config: CatalogConfig,
        adapters: Adapters,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let db_config = match &config.database_path {
            Some(path) => DatabaseConfig::new(path),
            None => DatabaseConfig::in_memory(),
        };
        let pool = create_pool(db_config).await?;

        let write_lock = new_write_lock();
        let events = EventBus::new(config.event_buffer_size);

        let repository = |media_kind: MediaKind| {
            let store: Arc<dyn MediaStore> = Arc::new(SqliteMediaStore::with_write_lock(
                pool.clone(),
                media_kind,
                Arc::clone(&write_lock),
            ));
            CatalogRepository::new(
                media_kind,
                store,
                adapters.clone(),
                Arc::clone(&clock),
                events.clone(),
                config.clone(),
            )
        };
        let movies = repository(MediaKind::Movie);
        let tv = repository(MediaKind::TvShow);

        info!(
            rows = config.rows.len(),
            persistent = config.database_path.is_some(),
            "Catalog service ready"
        );

        Ok(Self {
            config: Arc::new(config),
            pool,
            events,
            movies,
            tv,
        })
    }

    pub fn movies(&self) -> &CatalogRepository {
        &self.movies
    }

    pub fn tv(&self) -> &CatalogRepository {
        &self.tv
    }

    pub fn repository(&self, media_kind: MediaKind) -> &CatalogRepository {
        match media_kind {
            MediaKind::Movie => &self.movies,
            MediaKind::TvShow => &self.tv,
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Events of both media kinds.
    pub fn events(&self) -> EventStream {
        self.events.stream()
    }

    /// Refreshes page 1 of every enabled row.
    ///
    /// Rows are refreshed concurrently; one failing row does not stop the
    /// others and leaves its own ordering unchanged.
    #[instrument(skip(self))]
    pub async fn refresh_rows(&self) -> RefreshReport {
        let rows: Vec<&RowDefinition> = self.config.rows.iter().filter(|row| row.enabled).collect();

        let outcomes = join_all(rows.iter().map(|row| async move {
            let result = self
                .repository(row.media_kind)
                .refresh_ordering(row.ordering, 1)
                .await;
            (row.id.clone(), result)
        }))
        .await;

        let mut report = RefreshReport::default();
        for (row_id, result) in outcomes {
            match result {
                Ok(count) => report.refreshed.push((row_id, count)),
                Err(error) => {
                    warn!(row_id = %row_id, error = %error, "Row refresh failed");
                    report.failed.push(RowFailure { row_id, error });
                }
            }
        }

        info!(
            refreshed = report.refreshed.len(),
            failed = report.failed.len(),
            "Row refresh finished"
        );
        report
    }

    /// Evicts obsolete records of both kinds using the configured horizon.
    ///
    /// Returns the total number of records removed.
    #[instrument(skip(self))]
    pub async fn clear_obsolete_data(&self) -> Result<u64> {
        let horizon = self.config.retention_horizon;
        let (movies, tv) = tokio::join!(
            self.movies.clear_obsolete_data(horizon),
            self.tv.clear_obsolete_data(horizon)
        );
        Ok(movies? + tv?)
    }

    /// Closes the pool. Pending writes finish first.
    pub async fn shutdown(&self) {
        self.pool.close().await;
        info!("Catalog service shut down");
    }
}

/// Keys for the stock providers
#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    /// TMDB v4 read access token
    pub tmdb_access_token: String,
    pub omdb_api_key: String,
}

/// Bootstraps with the reqwest client and the TMDB/OMDb connectors.
#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub async fn bootstrap_desktop(
    config: CatalogConfig,
    credentials: ProviderCredentials,
) -> Result<CatalogService> {
    use crate::error::ServiceError;
    use bridge_desktop::ReqwestHttpClient;
    use bridge_traits::http::HttpClient;
    use provider_omdb::OmdbConnector;
    use provider_tmdb::TmdbConnector;

    let http_client: Arc<dyn HttpClient> = Arc::new(
        ReqwestHttpClient::new()
            .map_err(|err| ServiceError::InitializationFailed(err.to_string()))?,
    );
    let tmdb = Arc::new(TmdbConnector::new(
        Arc::clone(&http_client),
        credentials.tmdb_access_token,
    ));
    let omdb = Arc::new(OmdbConnector::new(http_client, credentials.omdb_api_key));

    let adapters = Adapters::new(tmdb.clone(), tmdb, omdb);
    CatalogService::bootstrap(config, adapters).await
}
