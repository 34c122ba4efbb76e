//! # Language Model Client
//!
//! Builds the rate-limited completion model used for suggestion generation.
//! Any rig [`CompletionModel`] works with the suggestion generator; Gemini is
//! the provider wired up from configuration.

use std::num::NonZeroU32;

use governor::{Quota, RateLimiter};
use rig::providers::gemini;
use tracing::info;

use crate::config::AnalyzerConfig;
use crate::error::{Error, Result};

#[cfg(test)]
pub mod mock_model;
pub mod ratelimited_completion;

pub use ratelimited_completion::RateLimitedCompletionModel;

/// Completion model used by the CLI
pub type GeminiModel = RateLimitedCompletionModel<gemini::completion::CompletionModel>;

/// Build the Gemini completion model, or `None` when no API key is configured
pub fn gemini_from_config(config: &AnalyzerConfig) -> Result<Option<GeminiModel>> {
    let Some(api_key) = config.llm_api_key.as_deref() else {
        info!("No LLM API key configured, suggestions disabled");
        return Ok(None);
    };

    let per_minute = NonZeroU32::new(config.llm_requests_per_minute).ok_or_else(|| {
        Error::Config("LLM requests per minute must be greater than zero".to_string())
    })?;
    let limiter = RateLimiter::direct(Quota::per_minute(per_minute));

    let client = gemini::Client::new(api_key);
    let model = RateLimitedCompletionModel::new(client.completion_model(&config.llm_model), limiter);
    info!(model = %config.llm_model, per_minute = config.llm_requests_per_minute, "LLM client ready");
    Ok(Some(model))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_key_means_no_model() {
        let config = AnalyzerConfig::default();
        assert!(gemini_from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_zero_rate_is_rejected() {
        let config = AnalyzerConfig::builder()
            .llm_api_key(Some("test-key".to_string()))
            .llm_requests_per_minute(0)
            .build();
        assert!(matches!(gemini_from_config(&config), Err(Error::Config(_))));
    }
}
