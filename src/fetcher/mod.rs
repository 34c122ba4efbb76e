//! Page fetcher
//!
//! Retrieves raw HTML for a URL with a single bounded GET. Retry policy is left
//! to callers.

mod error;

pub use error::FetchError;

use std::time::Duration;

use reqwest::Client as ReqwestClient;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use tracing::{debug, instrument};
use url::Url;

use crate::config::AnalyzerConfig;
use crate::error::Error;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,

    /// HTTP status code
    pub status_code: u16,

    /// Response body as text
    pub body: String,
}

/// Normalize user input into an absolute http(s) URL.
///
/// Inputs without a scheme get `https://` injected. Other schemes are rejected.
pub fn normalize_url(input: &str) -> Result<Url, FetchError> {
    let trimmed = input.trim();
    let invalid = |reason: &str| FetchError::InvalidUrl {
        url: trimmed.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid("empty URL"));
    }

    let lower = trimmed.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else if trimmed.contains("://") {
        return Err(invalid("only http and https URLs are supported"));
    } else {
        format!("https://{}", trimmed.trim_start_matches('/'))
    };

    let url = Url::parse(&candidate).map_err(|e| invalid(&e.to_string()))?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("URL has no host"));
    }
    Ok(url)
}

/// HTTP fetcher with a bounded per-request timeout
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: ReqwestClient,
    timeout: Duration,
}

impl Fetcher {
    /// Create a fetcher with the given timeout and user agent
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );

        let client = ReqwestClient::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// Create a fetcher from the analyzer configuration
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, Error> {
        Self::new(config.fetch_timeout(), &config.user_agent)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch a URL.
    ///
    /// Non-2xx responses come back as [`FetchError::Status`] with the body
    /// attached.
    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let url = normalize_url(url)?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url.as_str(), e))?;

        let status = response.status();
        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(&final_url, e))?;

        debug!(status = status.as_u16(), bytes = body.len(), "Fetched {}", final_url);

        if !status.is_success() {
            return Err(FetchError::Status {
                url: final_url,
                status_code: status.as_u16(),
                body,
            });
        }

        Ok(FetchedPage {
            url: final_url,
            status_code: status.as_u16(),
            body,
        })
    }
}
