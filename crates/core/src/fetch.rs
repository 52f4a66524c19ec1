//! Page fetching from URLs, files, and stdin.
//!
//! The command-line front end uses these to load the HTML a tab would show.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use tokio::io::AsyncReadExt;
use url::Url;

use crate::{ReadLaterError, Result};

/// HTTP settings for fetching pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// User-Agent header sent with requests.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: 30, user_agent: "Mozilla/5.0 (compatible; ReadLater/0.1)".to_string() }
    }
}

/// Fetches a page over HTTP(S).
///
/// Redirects are followed and the final response body is returned as text.
pub async fn fetch_url(url: &str, config: &FetchConfig) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| ReadLaterError::InvalidUrl(format!("{url}: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ReadLaterError::InvalidUrl(format!("{url}: only http and https pages can be fetched")));
    }

    let client = Client::builder().timeout(Duration::from_secs(config.timeout)).build()?;

    tracing::debug!(url, timeout = config.timeout, "fetching page");
    let response = client
        .get(parsed)
        .header("User-Agent", &config.user_agent)
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await
        .map_err(|e| if e.is_timeout() { ReadLaterError::Timeout { timeout: config.timeout } } else { e.into() })?;

    Ok(response.text().await?)
}

/// Reads a page from a local file.
pub async fn fetch_file(path: &str) -> Result<String> {
    let path = PathBuf::from(path);

    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Err(ReadLaterError::FileNotFound(path));
    }
    Ok(tokio::fs::read_to_string(&path).await?)
}

/// Reads a page from standard input until EOF.
pub async fn fetch_stdin() -> Result<String> {
    let mut buffer = String::new();
    tokio::io::stdin().read_to_string(&mut buffer).await?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, 30);
        assert!(config.user_agent.contains("ReadLater"));
    }

    #[tokio::test]
    async fn test_fetch_url_invalid() {
        let result = fetch_url("not-a-url", &FetchConfig::default()).await;
        assert!(matches!(result, Err(ReadLaterError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_url_rejects_other_schemes() {
        let result = fetch_url("ftp://example.com/page", &FetchConfig::default()).await;
        assert!(matches!(result, Err(ReadLaterError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_file_not_found() {
        let result = fetch_file("/nonexistent/path/file.html").await;
        assert!(matches!(result, Err(ReadLaterError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_fetch_file_reads_contents() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("page.html");
        std::fs::write(&path, "<p>saved</p>").unwrap();

        let html = fetch_file(path.to_str().unwrap()).await.unwrap();
        assert_eq!(html, "<p>saved</p>");
    }
}
