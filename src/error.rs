//! Error types for the seoscope crate

use thiserror::Error;

/// Result type for seoscope operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for seoscope operations
#[derive(Debug, Error)]
pub enum Error {
    /// Page fetch error
    #[error("Fetch error: {0}")]
    Fetch(#[from] crate::fetcher::FetchError),

    /// The fetched body could not be treated as HTML
    #[error("Parse error: {0}")]
    Parse(String),

    /// Site crawl error
    #[error("Crawl error: {0}")]
    Crawl(String),

    /// Suggestion cache error
    #[error("Cache error: {0}")]
    Cache(String),

    /// The request was cancelled before it finished
    #[error("request cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}
