// src/fetch/source.rs
// =============================================================================
// Where page bodies come from.
//
// The workers only know the PageSource trait. The real implementation is
// HttpSource (one GET per URL with reqwest, no retries); tests plug in an
// in-memory source instead.
// =============================================================================

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, UPGRADE_INSECURE_REQUESTS};
use reqwest::Client;

// Browser-like identity; some job boards refuse obvious bots
const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.12; rv:53.0) Gecko/20100101 Firefox/53.0";

pub const CONNECTION_FAILED: &str = "Connection failed: could not establish a new connection";

#[async_trait]
pub trait PageSource: Send + Sync {
    // Body of the page, or an error whose message becomes the failure reason
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    // Builds one client shared by every worker (connection pooling)
    //
    // No timeout is set: a stuck request only holds one task of one worker.
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US;q=0.5,en;q=0.3"));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await.map_err(categorize_error)?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP {}", response.status()));
        }

        let body = response.text().await.map_err(categorize_error)?;
        Ok(body)
    }
}

// Short, stable reasons for the errors-file
fn categorize_error(error: reqwest::Error) -> anyhow::Error {
    if error.is_connect() {
        anyhow!(CONNECTION_FAILED)
    } else if error.is_timeout() {
        anyhow!("Request timed out")
    } else if error.is_builder() {
        anyhow!("Invalid URL: {}", error)
    } else {
        anyhow!(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_an_error() {
        let source = HttpSource::new().unwrap();
        let result = source.fetch("not a url").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Nothing listens on port 9 of localhost in the test environment
        let source = HttpSource::new().unwrap();
        let error = source.fetch("http://127.0.0.1:9/").await.unwrap_err();
        assert_eq!(error.to_string(), CONNECTION_FAILED);
    }
}
