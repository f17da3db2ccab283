use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{filter_blocked, ImageResolutionError, ImageResolver, DEFAULT_BLOCKED_DOMAINS};

const CUSTOM_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";
const RESULTS_PER_QUERY: u8 = 8;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    link: String,
}

/// Image lookups through the Google Custom Search JSON API.
pub struct GoogleImageSearch {
    client: Client,
    api_key: String,
    engine_id: String,
    blocklist: Vec<String>,
    timeout: Duration,
}

impl GoogleImageSearch {
    pub fn new(api_key: impl Into<String>, engine_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            engine_id: engine_id.into(),
            blocklist: DEFAULT_BLOCKED_DOMAINS.iter().map(|d| d.to_string()).collect(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_blocklist(mut self, blocklist: Vec<String>) -> Self {
        self.blocklist = blocklist;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ImageResolver for GoogleImageSearch {
    async fn resolve(&self, query: &str) -> Result<Vec<String>, ImageResolutionError> {
        if self.api_key.trim().is_empty() || self.engine_id.trim().is_empty() {
            return Err(ImageResolutionError::NotConfigured(
                "missing Google API key or search engine id".to_string(),
            ));
        }

        let num = RESULTS_PER_QUERY.to_string();
        let response = self
            .client
            .get(CUSTOM_SEARCH_URL)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("searchType", "image"),
                ("q", query),
                ("num", num.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ImageResolutionError::Api { status, error_body });
        }

        let body: SearchResponse = response.json().await?;
        let links = body.items.into_iter().map(|item| item.link).collect();
        let filtered = filter_blocked(links, &self.blocklist);
        log::debug!("Image search '{}' returned {} usable links", query, filtered.len());
        Ok(filtered)
    }
}
