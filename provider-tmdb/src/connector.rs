//! TMDB connector
//!
//! Implements [`CatalogAdapter`] and [`DetailAdapter`] over the host
//! [`HttpClient`]. Requests authenticate with a v4 read access token sent as a
//! bearer header.

use crate::error::{Result, TmdbError};
use crate::types::{genre_name, DetailResponse, ErrorResponse, ListItem, PagedResponse};
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use core_library::models::{
    year_from_date, CastMember, CollectionRef, CrewMember, ImageSet, SimilarItem,
};
use core_metadata::remote::AdapterResult;
use core_metadata::{CatalogAdapter, CatalogRequest, CatalogSummary, DetailAdapter, MediaDetail};
use core_runtime::kinds::MediaKind;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

const APPENDED_RESOURCES: &str = "credits,similar,external_ids,images";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_CAST: usize = 20;

/// TMDB catalog and detail adapter
pub struct TmdbConnector {
    http_client: Arc<dyn HttpClient>,
    access_token: String,
    base_url: String,
    image_base_url: String,
    request_timeout: Duration,
}

impl TmdbConnector {
    pub fn new(http_client: Arc<dyn HttpClient>, access_token: impl Into<String>) -> Self {
        Self {
            http_client,
            access_token: access_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Prefix joined with relative image paths, e.g. `.../t/p/original`
    pub fn with_image_base_url(mut self, image_base_url: impl Into<String>) -> Self {
        self.image_base_url = image_base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn catalog_url(&self, endpoint: &str, page: u32) -> String {
        let endpoint = endpoint.trim_start_matches('/');
        let separator = if endpoint.contains('?') { '&' } else { '?' };
        format!("{}/{}{}page={}", self.base_url, endpoint, separator, page.max(1))
    }

    fn detail_url(&self, media_kind: MediaKind, id: i64) -> String {
        format!(
            "{}/{}/{}?append_to_response={}",
            self.base_url,
            media_kind.as_str(),
            id,
            APPENDED_RESOURCES
        )
    }

    fn image_url(&self, path: Option<&str>) -> Option<String> {
        let path = path?.trim();
        if path.is_empty() {
            return None;
        }
        if path.starts_with("http://") || path.starts_with("https://") {
            return Some(path.to_string());
        }
        Some(format!(
            "{}/{}",
            self.image_base_url,
            path.trim_start_matches('/')
        ))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String, resource: &str) -> Result<T> {
        debug!(url = %url, "TMDB request");

        let request = HttpRequest::new(HttpMethod::Get, url)
            .bearer_token(self.access_token.as_str())
            .header("Accept", "application/json")
            .timeout(self.request_timeout);

        let response = self.http_client.execute(request).await?;

        match response.status {
            200..=299 => serde_json::from_slice(&response.body).map_err(|e| {
                warn!(resource, error = %e, "Unparseable TMDB response");
                TmdbError::ParseError(e.to_string())
            }),
            404 => Err(TmdbError::NotFound {
                resource: resource.to_string(),
            }),
            status => {
                let message = serde_json::from_slice::<ErrorResponse>(&response.body)
                    .ok()
                    .and_then(|body| body.status_message)
                    .unwrap_or_else(|| response.text().unwrap_or_default());
                warn!(resource, status, message = %message, "TMDB request failed");
                Err(TmdbError::ApiError {
                    status_code: status,
                    message,
                })
            }
        }
    }

    fn summary_from_item(&self, item: ListItem) -> CatalogSummary {
        let title = item.display_title();
        let release_date = item.date();
        CatalogSummary {
            id: item.id,
            title,
            overview: item.overview.filter(|o| !o.is_empty()),
            release_date,
            poster_url: self.image_url(item.poster_path.as_deref()),
            backdrop_url: self.image_url(item.backdrop_path.as_deref()),
            genres: item
                .genre_ids
                .iter()
                .filter_map(|id| genre_name(*id))
                .map(str::to_string)
                .collect(),
            vote_average: item.vote_average,
            vote_count: item.vote_count,
        }
    }

    fn similar_from_item(&self, item: ListItem, media_kind: MediaKind) -> Option<SimilarItem> {
        let title = item.display_title()?;
        let year = item.date().as_deref().and_then(year_from_date);
        Some(SimilarItem {
            id: item.id,
            title,
            media_kind,
            poster_url: self.image_url(item.poster_path.as_deref()),
            backdrop_url: self.image_url(item.backdrop_path.as_deref()),
            rating: item.vote_average,
            year,
        })
    }

    fn detail_from_response(&self, response: DetailResponse, media_kind: MediaKind) -> MediaDetail {
        let secondary_id = response.imdb_id();
        let title = response.display_title();
        let release_date = response.date();
        let runtime = response.effective_runtime();
        let logo = self.image_url(response.images.preferred_logo());

        let mut cast: Vec<CastMember> = response
            .credits
            .cast
            .into_iter()
            .map(|credit| CastMember {
                id: credit.id,
                name: credit.name,
                character: credit.character.filter(|c| !c.is_empty()),
                profile_path: self.image_url(credit.profile_path.as_deref()),
                order: credit.order,
            })
            .collect();
        cast.sort_by_key(|member| member.order.unwrap_or(i32::MAX));
        cast.truncate(MAX_CAST);

        let crew = response
            .credits
            .crew
            .into_iter()
            .map(|credit| CrewMember {
                id: credit.id,
                name: credit.name,
                job: credit.job,
                department: credit.department,
                profile_path: self.image_url(credit.profile_path.as_deref()),
            })
            .collect();

        let collection = response.belongs_to_collection.map(|c| CollectionRef {
            id: c.id,
            name: c.name,
            poster_path: self.image_url(c.poster_path.as_deref()),
            backdrop_path: self.image_url(c.backdrop_path.as_deref()),
        });

        let similar = response
            .similar
            .results
            .into_iter()
            .filter_map(|item| self.similar_from_item(item, media_kind))
            .collect();

        MediaDetail {
            id: response.id,
            secondary_id,
            title,
            overview: response.overview.filter(|o| !o.is_empty()),
            release_date,
            last_air_date: response.last_air_date.filter(|d| !d.is_empty()),
            runtime,
            language: response.original_language,
            status: response.status,
            genres: response.genres.into_iter().map(|g| g.name).collect(),
            cast,
            crew,
            images: ImageSet {
                poster: self.image_url(response.poster_path.as_deref()),
                backdrop: self.image_url(response.backdrop_path.as_deref()),
                logo,
            },
            collection,
            similar,
            vote_average: response.vote_average,
            vote_count: response.vote_count,
        }
    }
}

#[async_trait]
impl CatalogAdapter for TmdbConnector {
    #[instrument(skip(self), fields(endpoint = %request.endpoint, page = request.page))]
    async fn fetch_catalog_page(
        &self,
        request: &CatalogRequest,
    ) -> AdapterResult<Vec<CatalogSummary>> {
        let url = self.catalog_url(&request.endpoint, request.page);
        let page: PagedResponse = self.get_json(url, &request.endpoint).await?;

        debug!(
            results = page.results.len(),
            total_pages = page.total_pages,
            "Catalog page received"
        );

        Ok(page
            .results
            .into_iter()
            .take(request.page_size as usize)
            .map(|item| self.summary_from_item(item))
            .collect())
    }
}

#[async_trait]
impl DetailAdapter for TmdbConnector {
    #[instrument(skip(self))]
    async fn fetch_details(&self, media_kind: MediaKind, id: i64) -> AdapterResult<MediaDetail> {
        let resource = format!("{}/{}", media_kind.as_str(), id);
        let response: DetailResponse = self.get_json(self.detail_url(media_kind, id), &resource).await?;
        Ok(self.detail_from_response(response, media_kind))
    }
}
