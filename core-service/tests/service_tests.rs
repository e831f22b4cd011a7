//! Service wiring tests against mocked adapters

use async_trait::async_trait;
use bridge_traits::time::{Clock, ManualClock};
use core_metadata::remote::AdapterResult;
use core_metadata::{
    AdapterError, Adapters, CatalogAdapter, CatalogRequest, CatalogSummary, DetailAdapter,
    ExternalRatings, MediaDetail, RatingsAdapter,
};
use core_runtime::config::{CatalogConfig, RowDefinition};
use core_runtime::events::CatalogEvent;
use core_runtime::kinds::{MediaKind, OrderingKind};
use core_service::CatalogService;
use mockall::mock;
use std::sync::Arc;
use std::time::Duration;

mock! {
    Catalog {}

    #[async_trait]
    impl CatalogAdapter for Catalog {
        async fn fetch_catalog_page(&self, request: &CatalogRequest) -> AdapterResult<Vec<CatalogSummary>>;
    }
}

mock! {
    Details {}

    #[async_trait]
    impl DetailAdapter for Details {
        async fn fetch_details(&self, media_kind: MediaKind, id: i64) -> AdapterResult<MediaDetail>;
    }
}

mock! {
    Ratings {}

    #[async_trait]
    impl RatingsAdapter for Ratings {
        async fn fetch_ratings(&self, secondary_id: &str) -> AdapterResult<ExternalRatings>;
    }
}

const START_MILLIS: i64 = 1_700_000_000_000;

/// Movie ids start at 100, show ids at 200; `upcoming` always fails.
fn scripted_catalog() -> MockCatalog {
    let mut catalog = MockCatalog::new();
    catalog.expect_fetch_catalog_page().returning(|request| {
        if request.ordering == OrderingKind::Upcoming {
            return Err(AdapterError::Network("upstream unavailable".to_string()));
        }
        let base = match request.media_kind {
            MediaKind::Movie => 100,
            MediaKind::TvShow => 200,
        };
        Ok((base..base + 3)
            .map(|id| CatalogSummary::new(id, format!("{} {}", request.endpoint, id)))
            .collect())
    });
    catalog
}

fn adapters(catalog: MockCatalog, details: MockDetails) -> Adapters {
    Adapters::new(
        Arc::new(catalog),
        Arc::new(details),
        Arc::new(MockRatings::new()),
    )
}

fn config(rows: Vec<RowDefinition>) -> CatalogConfig {
    CatalogConfig::builder()
        .adapter_timeout(Duration::from_secs(2))
        .rows(rows)
        .build()
        .unwrap()
}

async fn service(rows: Vec<RowDefinition>, details: MockDetails) -> (CatalogService, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::at_millis(START_MILLIS));
    let shared: Arc<dyn Clock> = clock.clone();
    let service = CatalogService::bootstrap_with_clock(
        config(rows),
        adapters(scripted_catalog(), details),
        shared,
    )
    .await
    .unwrap();
    (service, clock)
}

fn trending_rows() -> Vec<RowDefinition> {
    vec![
        RowDefinition::new(
            "trending_movies",
            MediaKind::Movie,
            OrderingKind::Trending,
            "trending/movie/day",
        ),
        RowDefinition::new(
            "trending_tv",
            MediaKind::TvShow,
            OrderingKind::Trending,
            "trending/tv/day",
        ),
    ]
}

#[tokio::test]
async fn test_repositories_are_per_kind() {
    let (service, _) = service(trending_rows(), MockDetails::new()).await;

    assert_eq!(service.movies().media_kind(), MediaKind::Movie);
    assert_eq!(service.tv().media_kind(), MediaKind::TvShow);
    assert_eq!(
        service.repository(MediaKind::TvShow).media_kind(),
        MediaKind::TvShow
    );

    service
        .movies()
        .refresh_ordering(OrderingKind::Trending, 1)
        .await
        .unwrap();

    let movies = service.movies().ordered(OrderingKind::Trending).await.unwrap();
    let shows = service.tv().ordered(OrderingKind::Trending).await.unwrap();
    assert_eq!(movies.len(), 3);
    assert!(shows.is_empty());
    assert_eq!(movies[0].title(), "trending/movie/day 100");
}

#[tokio::test]
async fn test_refresh_rows_reports_each_row() {
    let mut rows = trending_rows();
    rows.push(RowDefinition::new(
        "upcoming_movies",
        MediaKind::Movie,
        OrderingKind::Upcoming,
        "movie/upcoming",
    ));
    rows.push(
        RowDefinition::new(
            "popular_tv",
            MediaKind::TvShow,
            OrderingKind::Popular,
            "tv/popular",
        )
        .disabled(),
    );
    let (service, _) = service(rows, MockDetails::new()).await;

    let report = service.refresh_rows().await;

    assert!(!report.is_complete());
    let mut refreshed: Vec<&str> = report.refreshed.iter().map(|(id, _)| id.as_str()).collect();
    refreshed.sort_unstable();
    assert_eq!(refreshed, vec!["trending_movies", "trending_tv"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].row_id, "upcoming_movies");
    assert!(report.failed[0].error.is_remote());

    let shows = service.tv().ordered(OrderingKind::Trending).await.unwrap();
    assert_eq!(shows[0].id(), 200);
    assert!(service.tv().ordered(OrderingKind::Popular).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_event_stream_sees_both_kinds() {
    let (service, _) = service(trending_rows(), MockDetails::new()).await;
    let mut events = service.events().filter(|event| {
        matches!(event, CatalogEvent::OrderingRefreshed { .. })
    });

    service
        .movies()
        .refresh_ordering(OrderingKind::Trending, 1)
        .await
        .unwrap();
    service
        .tv()
        .refresh_ordering(OrderingKind::Trending, 1)
        .await
        .unwrap();

    let first = events.recv().await.unwrap();
    let second = events.recv().await.unwrap();
    assert_eq!(first.media_kind(), MediaKind::Movie);
    assert_eq!(second.media_kind(), MediaKind::TvShow);
}

#[tokio::test]
async fn test_clear_obsolete_data_covers_both_kinds() {
    let mut details = MockDetails::new();
    details.expect_fetch_details().times(2).returning(|_, id| {
        Ok(MediaDetail {
            id,
            title: Some(format!("Detail {id}")),
            ..MediaDetail::default()
        })
    });
    let (service, clock) = service(trending_rows(), details).await;

    service
        .movies()
        .refresh_ordering(OrderingKind::Trending, 1)
        .await
        .unwrap();
    service.movies().get_or_fetch(7).await.unwrap();
    service.tv().get_or_fetch(8).await.unwrap();

    clock.advance(chrono::Duration::days(30));
    let removed = service.clear_obsolete_data().await.unwrap();

    assert_eq!(removed, 2);
    assert!(service.movies().get_cached(7).await.unwrap().is_none());
    assert!(service.tv().get_cached(8).await.unwrap().is_none());
    assert_eq!(
        service
            .movies()
            .ordered(OrderingKind::Trending)
            .await
            .unwrap()
            .len(),
        3
    );
}

#[tokio::test]
async fn test_file_database_survives_restart() {
    let path = std::env::temp_dir().join(format!("catalog-service-test-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);

    let build = |path: &std::path::Path| {
        CatalogConfig::builder()
            .database_path(path)
            .rows(trending_rows())
            .build()
            .unwrap()
    };

    let first = CatalogService::bootstrap(
        build(&path),
        adapters(scripted_catalog(), MockDetails::new()),
    )
    .await
    .unwrap();
    first
        .movies()
        .refresh_ordering(OrderingKind::Trending, 1)
        .await
        .unwrap();
    first.shutdown().await;

    let second = CatalogService::bootstrap(
        build(&path),
        adapters(MockCatalog::new(), MockDetails::new()),
    )
    .await
    .unwrap();
    let ids: Vec<i64> = second
        .movies()
        .ordered(OrderingKind::Trending)
        .await
        .unwrap()
        .iter()
        .map(|record| record.id())
        .collect();
    assert_eq!(ids, vec![100, 101, 102]);
    second.shutdown().await;

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let mut config = config(Vec::new());
    config.adapter_timeout = Duration::ZERO;

    let result = CatalogService::bootstrap(
        config,
        adapters(MockCatalog::new(), MockDetails::new()),
    )
    .await;

    assert!(matches!(result, Err(core_service::ServiceError::Config(_))));
}
