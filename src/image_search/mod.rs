//! Step illustrations: text query in, candidate image URLs out.

mod google;

pub use google::GoogleImageSearch;

use async_trait::async_trait;
use reqwest::Url;

/// Platforms whose image links don't embed outside their own pages.
pub const DEFAULT_BLOCKED_DOMAINS: &[&str] = &["instagram.com", "facebook.com", "tiktok.com"];

#[derive(Debug, thiserror::Error)]
pub enum ImageResolutionError {
    #[error("Image search is not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Image search API error {status}: {error_body}")]
    Api {
        status: reqwest::StatusCode,
        error_body: String,
    },
}

#[async_trait]
pub trait ImageResolver: Send + Sync {
    /// Candidate image URLs for `query`, best first, already filtered against the blocklist.
    async fn resolve(&self, query: &str) -> Result<Vec<String>, ImageResolutionError>;
}

/// True when `url` is hosted on (or under) a blocked domain. Unparsable URLs count as blocked.
pub fn is_blocked_domain<S: AsRef<str>>(url: &str, blocklist: &[S]) -> bool {
    let host = match Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_ascii_lowercase)) {
        Some(host) => host,
        None => return true,
    };

    blocklist.iter().any(|blocked| {
        let blocked = blocked.as_ref().to_ascii_lowercase();
        host == blocked || host.ends_with(&format!(".{}", blocked))
    })
}

pub fn filter_blocked<S: AsRef<str>>(urls: Vec<String>, blocklist: &[S]) -> Vec<String> {
    urls.into_iter()
        .filter(|url| !is_blocked_domain(url, blocklist))
        .collect()
}
