use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{BackendError, SearchBackend, SearchRequest, SearchResponse};

/// Hosted retrieval service speaking the `queries/top-documents` protocol.
pub struct RemoteBackend {
    client: Client,
    base_url: String,
    api_key: String,
    season_year: Option<i32>,
}

impl RemoteBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            season_year: None,
        })
    }

    /// The hosted collection cannot report its own season, so it is configured.
    pub fn with_season_year(mut self, year: Option<i32>) -> Self {
        self.season_year = year;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/queries/top-documents", self.base_url)
    }
}

#[async_trait]
impl SearchBackend for RemoteBackend {
    fn name(&self) -> &str {
        "remote"
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError> {
        tracing::debug!(
            endpoint = %self.endpoint(),
            collection = %request.collection,
            k = request.k,
            filtered = request.filter.is_some(),
            "querying remote backend"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| BackendError::Decode(format!("{} | raw: {}", e, truncate(&body, 200))))
    }

    fn season_year(&self) -> Option<i32> {
        self.season_year
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
