//! # Site Crawl Configuration
//!
//! Limits and switches for a sitemap-driven site crawl.
//!
//! ## Key Components
//!
//! - `SiteCrawlConfig`: The configuration struct consumed by the site crawler
//! - `SiteCrawlConfigBuilder`: Builder pattern implementation for easier configuration

use std::time::Duration;

/// Configuration for a site crawl
#[derive(Debug, Clone)]
pub struct SiteCrawlConfig {
    /// Maximum number of discovered pages to analyze
    pub max_pages: usize,

    /// Pages analyzed at the same time
    pub concurrency: usize,

    /// Extra fetch attempts for a page after a network error or timeout
    pub max_fetch_retries: u32,

    /// Pause before a fetch retry, multiplied by the attempt number
    pub retry_backoff: Duration,

    /// Upper bound on the whole crawl
    pub max_crawl_duration: Duration,

    /// Generate LLM suggestions for every page
    pub with_suggestions: bool,

    /// Bypass the suggestion cache
    pub force_llm: bool,
}

impl Default for SiteCrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 500,
            concurrency: 4,
            max_fetch_retries: 1,
            retry_backoff: Duration::from_millis(500),
            max_crawl_duration: Duration::from_secs(600),
            with_suggestions: false,
            force_llm: false,
        }
    }
}

/// Builder for SiteCrawlConfig
#[derive(Debug, Default)]
pub struct SiteCrawlConfigBuilder {
    config: SiteCrawlConfig,
}

impl SiteCrawlConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    /// Set the number of pages analyzed concurrently. Zero is treated as one.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency.max(1);
        self
    }

    pub fn max_fetch_retries(mut self, retries: u32) -> Self {
        self.config.max_fetch_retries = retries;
        self
    }

    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.config.retry_backoff = backoff;
        self
    }

    pub fn max_crawl_duration(mut self, duration: Duration) -> Self {
        self.config.max_crawl_duration = duration;
        self
    }

    pub fn with_suggestions(mut self, with_suggestions: bool) -> Self {
        self.config.with_suggestions = with_suggestions;
        self
    }

    pub fn force_llm(mut self, force_llm: bool) -> Self {
        self.config.force_llm = force_llm;
        self
    }

    pub fn build(self) -> SiteCrawlConfig {
        self.config
    }
}

impl SiteCrawlConfig {
    pub fn builder() -> SiteCrawlConfigBuilder {
        SiteCrawlConfigBuilder::new()
    }
}
