//! Error types for the site module

use thiserror::Error;

use crate::error::Error as CrateError;
use crate::fetcher::FetchError;

/// Reasons a site crawl could not start. Failures of individual pages are
/// recorded on their outcomes instead.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The base URL is unusable
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Neither robots.txt nor any well-known path answered with a sitemap
    #[error("No sitemaps found for {0}")]
    NoSitemap(String),

    /// Neither the sitemaps nor the link fallback turned up any page
    #[error("No pages found for {0} from sitemaps or by following links")]
    NoPages(String),

    /// The crawl was cancelled before any page was analyzed
    #[error("Crawl cancelled")]
    Cancelled,

    /// `max_crawl_duration` ran out before page discovery finished
    #[error("Crawl deadline exceeded during discovery of {0}")]
    DeadlineExceeded(String),
}

impl From<CrawlError> for CrateError {
    fn from(err: CrawlError) -> Self {
        match err {
            CrawlError::Fetch(e) => CrateError::Fetch(e),
            _ => CrateError::Crawl(err.to_string()),
        }
    }
}
