//! # Page Analyzer
//!
//! Wires fetcher, extractor, scorer, suggestion cache and suggestion generator
//! into the analysis pipeline and answers [`AnalyzeRequest`]s.
//!
//! In page mode only a fetch or parse failure of the requested URL produces
//! an error response. Suggestion problems are reported inside
//! `llm_suggestions` and never affect scoring.

use chrono::{DateTime, Utc};
use rig::completion::CompletionModel;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::cache::{CacheStore, SuggestionCache};
use crate::config::{AnalyzerConfig, ENV_API_KEY};
use crate::error::{Error, Result};
use crate::extractor::{ExtractionIssue, ImageRef, PageRecord, extract_page};
use crate::fetcher::{FetchedPage, Fetcher};
use crate::scorer::{ScoreBreakdown, score_page};
use crate::site::{CrawlError, SiteCrawlConfig, SiteCrawlResult, SiteCrawler};
use crate::suggestions::{SuggestionError, SuggestionGenerator, SuggestionResult};

/// An analysis request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub url: String,

    /// Analyze every page listed in the site's sitemaps instead of one page
    #[serde(default)]
    pub crawl_site: bool,

    /// Ignore cached suggestions
    #[serde(default)]
    pub force_llm: bool,
}

impl AnalyzeRequest {
    pub fn page(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            crawl_site: false,
            force_llm: false,
        }
    }

    pub fn site(url: impl Into<String>) -> Self {
        Self {
            crawl_site: true,
            ..Self::page(url)
        }
    }
}

/// Full report for a single page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    pub url: String,
    pub status_code: u16,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub h1: Vec<String>,
    pub h2: Vec<String>,
    pub h3: Vec<String>,
    pub word_count: usize,
    pub images: Vec<ImageRef>,

    /// Rule issues in component order
    pub issues: Vec<String>,

    /// Page score in `0..=100`
    pub score: u32,

    pub score_breakdown: ScoreBreakdown,
    pub raw_html_snippet: String,
    pub extraction_issues: Vec<ExtractionIssue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_suggestions: Option<SuggestionResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_generated_at: Option<DateTime<Utc>>,
}

impl PageReport {
    pub fn new(
        record: PageRecord,
        breakdown: ScoreBreakdown,
        suggestions: Option<SuggestionResult>,
    ) -> Self {
        let llm_generated_at = suggestions
            .as_ref()
            .filter(|s| !s.is_error())
            .map(|s| s.generated_at);

        Self {
            url: record.url,
            status_code: record.status_code,
            title: record.title,
            meta_description: record.meta_description,
            h1: record.headings.h1,
            h2: record.headings.h2,
            h3: record.headings.h3,
            word_count: record.word_count,
            images: record.images,
            issues: breakdown.issues(),
            score: breakdown.total(),
            score_breakdown: breakdown,
            raw_html_snippet: record.raw_html_snippet,
            extraction_issues: record.issues,
            llm_suggestions: suggestions,
            llm_generated_at,
        }
    }
}

/// Error body. `ok` is only present for failed site crawls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,

    pub error: String,
}

/// Answer to an [`AnalyzeRequest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalyzeResponse {
    Page(Box<PageReport>),
    Site(SiteCrawlResult),
    Error(ErrorResponse),
}

impl AnalyzeResponse {
    fn error(error: impl ToString) -> Self {
        AnalyzeResponse::Error(ErrorResponse {
            ok: None,
            error: error.to_string(),
        })
    }

    fn crawl_error(error: CrawlError) -> Self {
        AnalyzeResponse::Error(ErrorResponse {
            ok: Some(false),
            error: error.to_string(),
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AnalyzeResponse::Error(_))
    }
}

/// The analysis pipeline
pub struct Analyzer<M: CompletionModel, S: CacheStore> {
    config: AnalyzerConfig,
    site_config: SiteCrawlConfig,
    fetcher: Fetcher,
    generator: Option<SuggestionGenerator<M>>,
    cache: SuggestionCache<S>,
}

impl<M: CompletionModel, S: CacheStore> Analyzer<M, S> {
    /// Create an analyzer. Without a model, suggestion requests report the
    /// missing credential instead of calling out.
    pub fn new(config: AnalyzerConfig, model: Option<M>, store: S) -> Result<Self> {
        let fetcher = Fetcher::from_config(&config)?;
        let generator = model.map(|model| SuggestionGenerator::from_config(model, &config));
        let cache = SuggestionCache::new(store, config.cache_window()?);

        Ok(Self {
            config,
            site_config: SiteCrawlConfig::default(),
            fetcher,
            generator,
            cache,
        })
    }

    /// Use `site_config` for site crawls
    pub fn with_site_config(mut self, site_config: SiteCrawlConfig) -> Self {
        self.site_config = site_config;
        self
    }

    /// Replace the suggestion generator, e.g. to tune its retry delay
    pub fn with_generator(mut self, generator: SuggestionGenerator<M>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn cache(&self) -> &SuggestionCache<S> {
        &self.cache
    }

    /// Answer a request. Failures become [`AnalyzeResponse::Error`].
    ///
    /// Cancelling `token` abandons in-flight fetches and model calls.
    #[instrument(skip(self, token), fields(url = %request.url, crawl_site = request.crawl_site))]
    pub async fn handle(&self, request: &AnalyzeRequest, token: &CancellationToken) -> AnalyzeResponse {
        if request.url.trim().is_empty() {
            return AnalyzeResponse::error("url is required");
        }

        if request.crawl_site {
            return match self.analyze_site(&request.url, request.force_llm, token).await {
                Ok(result) => AnalyzeResponse::Site(result),
                Err(e) => {
                    warn!(error = %e, "Site crawl failed");
                    AnalyzeResponse::crawl_error(e)
                }
            };
        }

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Cancelled),
            report = self.analyze_page(&request.url, request.force_llm) => report,
        };

        match result {
            Ok(report) => AnalyzeResponse::Page(Box::new(report)),
            Err(e) => {
                warn!(error = %e, "Page analysis failed");
                AnalyzeResponse::error(e)
            }
        }
    }

    /// Fetch, extract, score and suggest for a single page
    pub async fn analyze_page(&self, url: &str, force_llm: bool) -> Result<PageReport> {
        let page = self.fetcher.fetch(url).await?;
        self.report_page(page, true, force_llm).await
    }

    /// Crawl the site of `url` with the configured site crawl settings
    pub async fn analyze_site(
        &self,
        url: &str,
        force_llm: bool,
        token: &CancellationToken,
    ) -> std::result::Result<SiteCrawlResult, CrawlError> {
        let mut site_config = self.site_config.clone();
        site_config.force_llm |= force_llm;
        SiteCrawler::new(self, site_config).crawl(url, token).await
    }

    /// Run the pipeline on an already fetched page
    #[instrument(skip(self, page), fields(url = %page.url))]
    pub async fn report_page(
        &self,
        page: FetchedPage,
        with_suggestions: bool,
        force_llm: bool,
    ) -> Result<PageReport> {
        let record = extract_page(&page.body, &page.url, page.status_code);
        if record.is_unparseable() {
            return Err(Error::Parse(format!(
                "{} did not return usable HTML",
                record.url
            )));
        }

        let breakdown = score_page(&record);
        info!(score = breakdown.total(), issues = breakdown.issues().len(), "Page scored");

        let suggestions = if with_suggestions {
            Some(self.suggestions(&record, &breakdown.issues(), force_llm).await)
        } else {
            None
        };

        Ok(PageReport::new(record, breakdown, suggestions))
    }

    async fn suggestions(
        &self,
        record: &PageRecord,
        issues: &[String],
        force_llm: bool,
    ) -> SuggestionResult {
        let Some(generator) = &self.generator else {
            let error = SuggestionError::Unavailable(format!("{} is not set", ENV_API_KEY));
            return SuggestionResult::failed(&error, None);
        };

        self.cache
            .get_or_generate(&record.url, force_llm, || generator.generate(record, issues))
            .await
    }
}
