use anyhow::{bail, Context, Result};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Downloads a recipe page. The HTML is passed on verbatim; the first-turn prompt
/// strips blog and ad content.
pub async fn fetch_recipe_page(url: &str) -> Result<String> {
    let response = Client::new()
        .get(url)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await
        .with_context(|| format!("Failed to fetch recipe page '{}'", url))?;

    let status = response.status();
    if !status.is_success() {
        bail!("Fetching '{}' returned {}", url, status);
    }

    let body = response
        .text()
        .await
        .with_context(|| format!("Failed to read body of '{}'", url))?;
    log::debug!("Fetched {} bytes from {}", body.len(), url);
    Ok(body)
}

/// Reads pasted recipe text from disk.
pub async fn read_recipe_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read recipe file '{}'", path.display()))?;
    if content.trim().is_empty() {
        bail!("Recipe file '{}' is empty", path.display());
    }
    Ok(content)
}
