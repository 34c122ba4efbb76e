//! # Site Crawl Orchestration
//!
//! Discovers a site's pages from its sitemaps and runs the single-page
//! pipeline for each of them. Pages are processed with bounded concurrency
//! while outcomes keep discovery order. A failing page becomes an `error`
//! outcome and never aborts the crawl.
//!
//! Every attempted URL yields exactly one [`PageOutcome`]. Pages cut off by
//! cancellation or by the crawl deadline are reported as errors too.

pub mod config;
pub mod discovery;
mod error;

pub use config::{SiteCrawlConfig, SiteCrawlConfigBuilder};
pub use discovery::Discovery;
pub use error::CrawlError;

use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use rig::completion::CompletionModel;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::analyzer::{Analyzer, PageReport};
use crate::cache::CacheStore;
use crate::error::Result;
use crate::fetcher::{FetchedPage, normalize_url};
use crate::suggestions::SuggestionResult;

/// Whether a page made it through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    Success,
    Error,
}

/// Result of one page in a site crawl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageOutcome {
    pub url: String,

    pub status: PageStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issues_count: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_suggestions: Option<SuggestionResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageOutcome {
    pub fn success(report: PageReport) -> Self {
        Self {
            url: report.url,
            status: PageStatus::Success,
            status_code: Some(report.status_code),
            score: Some(report.score),
            title: report.title,
            issues_count: Some(report.issues.len()),
            llm_suggestions: report.llm_suggestions,
            error: None,
        }
    }

    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: PageStatus::Error,
            status_code: None,
            score: None,
            title: None,
            issues_count: None,
            llm_suggestions: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PageStatus::Success
    }
}

/// Aggregated result of a site crawl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteCrawlResult {
    pub ok: bool,
    pub base_url: String,
    pub sitemaps_found: Vec<String>,
    pub pages_analyzed: usize,
    pub pages_failed: usize,
    pub pages_skipped: usize,

    /// Pages were found by following links because the sitemaps listed none
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub link_fallback: bool,

    pub pages: Vec<PageOutcome>,
    pub analyzed_at: DateTime<Utc>,
}

impl SiteCrawlResult {
    fn new(base_url: String, discovery: Discovery, pages: Vec<PageOutcome>) -> Self {
        let pages_analyzed = pages.iter().filter(|p| p.is_success()).count();
        Self {
            ok: true,
            base_url,
            sitemaps_found: discovery.sitemaps_found,
            pages_analyzed,
            pages_failed: pages.len() - pages_analyzed,
            pages_skipped: discovery.pages_skipped,
            link_fallback: discovery.link_fallback,
            pages,
            analyzed_at: Utc::now(),
        }
    }
}

/// Runs a sitemap-driven crawl with the pipeline of an [`Analyzer`]
pub struct SiteCrawler<'a, M: CompletionModel, S: CacheStore> {
    analyzer: &'a Analyzer<M, S>,
    config: SiteCrawlConfig,
}

impl<'a, M: CompletionModel, S: CacheStore> SiteCrawler<'a, M, S> {
    pub fn new(analyzer: &'a Analyzer<M, S>, config: SiteCrawlConfig) -> Self {
        Self { analyzer, config }
    }

    pub fn config(&self) -> &SiteCrawlConfig {
        &self.config
    }

    /// Crawl the site of `base_url`.
    ///
    /// Fails only when no pages can be discovered, or when the crawl is
    /// cancelled or runs out of time during discovery. `max_crawl_duration`
    /// covers discovery and page analysis together.
    #[instrument(skip(self, token))]
    pub async fn crawl(
        &self,
        base_url: &str,
        token: &CancellationToken,
    ) -> std::result::Result<SiteCrawlResult, CrawlError> {
        let base = normalize_url(base_url)?;
        let deadline = Instant::now() + self.config.max_crawl_duration;

        let discovery = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(CrawlError::Cancelled),
            discovery = tokio::time::timeout_at(
                deadline,
                discovery::discover(self.analyzer.fetcher(), &base, self.config.max_pages),
            ) => match discovery {
                Ok(discovery) => discovery?,
                Err(_) => return Err(CrawlError::DeadlineExceeded(base.to_string())),
            },
        };

        info!(
            pages = discovery.page_urls.len(),
            concurrency = self.config.concurrency,
            "Analyzing discovered pages"
        );

        let pages: Vec<PageOutcome> = stream::iter(discovery.page_urls.clone())
            .map(|url| self.crawl_page(url, deadline, token))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let result = SiteCrawlResult::new(base.to_string(), discovery, pages);
        info!(
            analyzed = result.pages_analyzed,
            failed = result.pages_failed,
            skipped = result.pages_skipped,
            "Site crawl complete"
        );
        Ok(result)
    }

    async fn crawl_page(
        &self,
        url: String,
        deadline: Instant,
        token: &CancellationToken,
    ) -> PageOutcome {
        if token.is_cancelled() {
            return PageOutcome::failed(url, "crawl cancelled");
        }

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err("crawl cancelled".to_string()),
            outcome = tokio::time::timeout_at(deadline, self.analyze_url(&url)) => match outcome {
                Ok(report) => report.map_err(|e| e.to_string()),
                Err(_) => Err("crawl deadline exceeded".to_string()),
            },
        };

        match result {
            Ok(report) => PageOutcome::success(report),
            Err(error) => {
                warn!(error = %error, "Page failed: {}", url);
                PageOutcome::failed(url, error)
            }
        }
    }

    async fn analyze_url(&self, url: &str) -> Result<PageReport> {
        let page = self.fetch_with_retries(url).await?;
        self.analyzer
            .report_page(page, self.config.with_suggestions, self.config.force_llm)
            .await
    }

    /// Fetch a page, retrying network errors and timeouts
    async fn fetch_with_retries(&self, url: &str) -> Result<FetchedPage> {
        let mut attempt = 0;
        loop {
            match self.analyzer.fetcher().fetch(url).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() && attempt < self.config.max_fetch_retries => {
                    attempt += 1;
                    debug!(error = %e, attempt, "Retrying fetch of {}", url);
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
