//! OMDb connector

use crate::error::{OmdbError, Result};
use crate::types::OmdbResponse;
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use core_metadata::remote::AdapterResult;
use core_metadata::{ExternalRatings, RatingsAdapter};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub const DEFAULT_BASE_URL: &str = "https://www.omdbapi.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Ratings adapter over the OMDb `?i=` lookup
pub struct OmdbConnector {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    base_url: String,
    request_timeout: Duration,
}

impl OmdbConnector {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn lookup_url(&self, imdb_id: &str) -> String {
        format!(
            "{}/?i={}&apikey={}",
            self.base_url,
            urlencoding::encode(imdb_id),
            urlencoding::encode(&self.api_key)
        )
    }

    async fn lookup(&self, imdb_id: &str) -> Result<OmdbResponse> {
        let request = HttpRequest::new(HttpMethod::Get, self.lookup_url(imdb_id))
            .header("Accept", "application/json")
            .timeout(self.request_timeout);

        let response = self.http_client.execute(request).await?;

        if !response.is_success() {
            let message = response.text().unwrap_or_default();
            warn!(imdb_id, status = response.status, "OMDb request failed");
            return Err(OmdbError::ApiError {
                status_code: response.status,
                message,
            });
        }

        let body: OmdbResponse = serde_json::from_slice(&response.body)
            .map_err(|e| OmdbError::ParseError(e.to_string()))?;

        if !body.is_success() {
            return Err(OmdbError::NotFound {
                imdb_id: imdb_id.to_string(),
                message: body.error.unwrap_or_default(),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl RatingsAdapter for OmdbConnector {
    #[instrument(skip(self))]
    async fn fetch_ratings(&self, secondary_id: &str) -> AdapterResult<ExternalRatings> {
        let body = self.lookup(secondary_id).await?;

        let ratings = ExternalRatings {
            imdb: body.imdb(),
            rotten_tomatoes: body.rotten_tomatoes(),
            metacritic: body.metacritic(),
            ..ExternalRatings::default()
        };
        debug!(empty = ratings.is_empty(), "OMDb ratings parsed");

        Ok(ratings)
    }
}
