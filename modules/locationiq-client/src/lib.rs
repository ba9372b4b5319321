pub mod error;
pub mod types;

pub use error::{LocationIqError, Result};
pub use types::Place;

use std::time::Duration;

use types::ErrorBody;

pub const DEFAULT_BASE_URL: &str = "https://us1.locationiq.com/v1";

/// Longest free-text query forwarded to the API.
const MAX_QUERY_CHARS: usize = 200;

pub struct LocationIqClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl LocationIqClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Forward-geocode a free-text place name. An empty vector means the API
    /// found nothing; LocationIQ signals that with a 404.
    pub async fn search(&self, query: &str) -> Result<Vec<Place>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(LocationIqError::InvalidQuery("empty query".to_string()));
        }
        if query.chars().count() > MAX_QUERY_CHARS {
            return Err(LocationIqError::InvalidQuery(format!(
                "query too long (max {MAX_QUERY_CHARS} chars)"
            )));
        }

        let endpoint = format!("{}/search.php", self.base_url);
        let resp = self
            .client
            .get(&endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", query),
                ("format", "json"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(query, "LocationIQ found no match");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(LocationIqError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await?;
        let places: Vec<Place> = serde_json::from_str(&body)?;
        Ok(places)
    }

    /// Coordinates of the best match, if any.
    pub async fn first_match(&self, query: &str) -> Result<Option<(f64, f64)>> {
        let places = self.search(query).await?;
        match places.first() {
            Some(place) => Ok(Some(place.coordinates()?)),
            None => Ok(None),
        }
    }
}
