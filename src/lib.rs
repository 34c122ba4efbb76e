//! # seoscope - SEO page and site analysis
//!
//! Fetches pages, extracts their SEO-relevant structure, scores them against
//! fixed rules and asks a language model for improved title, meta description
//! and H1 text. Whole sites can be analyzed through their sitemaps.
//!
//! ## Pipeline
//!
//! - [`fetcher`]: bounded HTTP fetch with URL normalization
//! - [`extractor`]: HTML to [`extractor::PageRecord`]
//! - [`scorer`]: rule-based 0-100 score with a per-component breakdown
//! - [`suggestions`]: prompt building, model call and tolerant JSON recovery
//! - [`cache`]: freshness-gated, single-flight suggestion cache
//! - [`site`]: sitemap discovery and concurrent per-page analysis
//! - [`analyzer`]: wires the stages together and answers requests
//!
//! ## Example
//!
//! ```rust,no_run
//! use seoscope::analyzer::{AnalyzeRequest, Analyzer};
//! use seoscope::cache::MemoryCacheStore;
//! use seoscope::config::AnalyzerConfig;
//! use seoscope::model::gemini_from_config;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnalyzerConfig::from_env()?;
//!     let model = gemini_from_config(&config)?;
//!     let analyzer = Analyzer::new(config, model, MemoryCacheStore::new())?;
//!
//!     let response = analyzer
//!         .handle(&AnalyzeRequest::page("example.com"), &CancellationToken::new())
//!         .await;
//!     println!("{}", serde_json::to_string_pretty(&response)?);
//!     Ok(())
//! }
//! ```

mod error;

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod model;
pub mod scorer;
pub mod site;
pub mod suggestions;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};

/// Commonly used types
pub mod prelude {
    pub use crate::analyzer::{AnalyzeRequest, AnalyzeResponse, Analyzer, PageReport};
    pub use crate::config::AnalyzerConfig;
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::site::{SiteCrawlConfig, SiteCrawlResult};
}
