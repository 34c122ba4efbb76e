//! # Analyzer Configuration Module
//!
//! Settings for the page-analysis pipeline: fetch behaviour, the language
//! model used for suggestions and the suggestion cache freshness window.
//!
//! ## Key Components
//!
//! - `AnalyzerConfig`: The configuration struct consumed by the analyzer
//! - `AnalyzerConfigBuilder`: Builder pattern implementation for easier configuration
//!
//! ## Environment
//!
//! `AnalyzerConfig::from_env` reads:
//!
//! - `GEMINI_API_KEY`: language-model credential. Absent disables suggestions.
//! - `LLM_MODEL`: model identifier
//! - `LLM_TIMEOUT`: model call timeout in seconds
//! - `LLM_CACHE_DAYS`: suggestion freshness window in days
//! - `FETCH_TIMEOUT`: page fetch timeout in seconds

use std::time::Duration;

use crate::error::Error;

pub const ENV_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_MODEL: &str = "LLM_MODEL";
pub const ENV_LLM_TIMEOUT: &str = "LLM_TIMEOUT";
pub const ENV_CACHE_DAYS: &str = "LLM_CACHE_DAYS";
pub const ENV_FETCH_TIMEOUT: &str = "FETCH_TIMEOUT";

/// Configuration for the analyzer
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Timeout for a single page fetch, in seconds
    pub fetch_timeout_secs: u64,

    /// User agent sent with every fetch
    pub user_agent: String,

    /// Credential for the language model. `None` disables suggestions.
    pub llm_api_key: Option<String>,

    /// Language model identifier
    pub llm_model: String,

    /// Timeout for a single model call, in seconds
    pub llm_timeout_secs: u64,

    /// Extra attempts after a failed or unparseable model response
    pub llm_max_retries: u32,

    /// Completion requests allowed per minute
    pub llm_requests_per_minute: u32,

    /// Age in days after which a cached suggestion is regenerated
    pub cache_days: i64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 15,
            user_agent: format!(
                "seoscope/{} (+https://github.com/seoscope/seoscope)",
                env!("CARGO_PKG_VERSION")
            ),
            llm_api_key: None,
            llm_model: "gemini-2.0-flash".to_string(),
            llm_timeout_secs: 20,
            llm_max_retries: 1,
            llm_requests_per_minute: 30,
            cache_days: 7,
        }
    }
}

/// Builder for AnalyzerConfig
#[derive(Debug, Default)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: AnalyzerConfig::default(),
        }
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn llm_api_key(mut self, api_key: Option<String>) -> Self {
        self.config.llm_api_key = api_key;
        self
    }

    pub fn llm_model(mut self, model: impl Into<String>) -> Self {
        self.config.llm_model = model.into();
        self
    }

    pub fn llm_timeout_secs(mut self, secs: u64) -> Self {
        self.config.llm_timeout_secs = secs;
        self
    }

    pub fn llm_max_retries(mut self, retries: u32) -> Self {
        self.config.llm_max_retries = retries;
        self
    }

    pub fn llm_requests_per_minute(mut self, per_minute: u32) -> Self {
        self.config.llm_requests_per_minute = per_minute;
        self
    }

    pub fn cache_days(mut self, days: i64) -> Self {
        self.config.cache_days = days;
        self
    }

    /// Build the configuration
    pub fn build(self) -> AnalyzerConfig {
        self.config
    }
}

impl AnalyzerConfig {
    /// Create a new builder
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder::new()
    }

    /// Load the configuration from process environment variables
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration from an arbitrary key lookup, falling back to
    /// defaults for missing keys
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let llm_api_key = lookup(ENV_API_KEY)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        let llm_model = lookup(ENV_MODEL)
            .map(|model| model.trim().to_string())
            .filter(|model| !model.is_empty())
            .unwrap_or(defaults.llm_model.clone());

        let config = Self {
            llm_api_key,
            llm_model,
            llm_timeout_secs: parse_positive(&lookup, ENV_LLM_TIMEOUT, defaults.llm_timeout_secs)?,
            cache_days: parse_cache_days(&lookup, defaults.cache_days)?,
            fetch_timeout_secs: parse_positive(
                &lookup,
                ENV_FETCH_TIMEOUT,
                defaults.fetch_timeout_secs,
            )?,
            ..defaults
        };
        config.cache_window()?;
        Ok(config)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    /// Suggestion freshness window. Fails when `cache_days` does not fit a
    /// `chrono::TimeDelta`.
    pub fn cache_window(&self) -> Result<chrono::TimeDelta, Error> {
        chrono::TimeDelta::try_days(self.cache_days).ok_or_else(|| {
            Error::Config(format!(
                "{} is out of range: {} days",
                ENV_CACHE_DAYS, self.cache_days
            ))
        })
    }
}

fn parse_cache_days<F>(lookup: &F, default: i64) -> Result<i64, Error>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(ENV_CACHE_DAYS) else {
        return Ok(default);
    };
    let days = parse_positive(lookup, ENV_CACHE_DAYS, 1)?;
    let days = i64::try_from(days).map_err(|_| {
        Error::Config(format!("{} is out of range: '{}'", ENV_CACHE_DAYS, raw.trim()))
    })?;
    chrono::TimeDelta::try_days(days)
        .map(|_| days)
        .ok_or_else(|| Error::Config(format!("{} is out of range: '{}'", ENV_CACHE_DAYS, raw.trim())))
}

fn parse_positive<F>(lookup: &F, key: &str, default: u64) -> Result<u64, Error>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(Error::Config(format!(
                "{} must be a positive integer, got '{}'",
                key, raw
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = AnalyzerConfig::from_lookup(lookup_from(&[])).unwrap();

        assert!(config.llm_api_key.is_none());
        assert_eq!(config.llm_model, "gemini-2.0-flash");
        assert_eq!(config.llm_timeout_secs, 20);
        assert_eq!(config.cache_days, 7);
        assert_eq!(config.fetch_timeout_secs, 15);
    }

    #[test]
    fn test_environment_overrides() {
        let config = AnalyzerConfig::from_lookup(lookup_from(&[
            (ENV_API_KEY, "secret"),
            (ENV_MODEL, "gemini-2.0-flash-lite"),
            (ENV_LLM_TIMEOUT, "5"),
            (ENV_CACHE_DAYS, "30"),
            (ENV_FETCH_TIMEOUT, "3"),
        ]))
        .unwrap();

        assert_eq!(config.llm_api_key.as_deref(), Some("secret"));
        assert_eq!(config.llm_model, "gemini-2.0-flash-lite");
        assert_eq!(config.llm_timeout(), Duration::from_secs(5));
        assert_eq!(config.cache_window().unwrap(), chrono::Duration::days(30));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_blank_api_key_disables_suggestions() {
        let config = AnalyzerConfig::from_lookup(lookup_from(&[(ENV_API_KEY, "  ")])).unwrap();
        assert!(config.llm_api_key.is_none());
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let result = AnalyzerConfig::from_lookup(lookup_from(&[(ENV_LLM_TIMEOUT, "soon")]));
        assert!(matches!(result, Err(Error::Config(_))));

        let result = AnalyzerConfig::from_lookup(lookup_from(&[(ENV_CACHE_DAYS, "0")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_cache_days_out_of_range_is_rejected() {
        for raw in ["200000000000000", "18446744073709551615"] {
            let result = AnalyzerConfig::from_lookup(lookup_from(&[(ENV_CACHE_DAYS, raw)]));
            assert!(matches!(result, Err(Error::Config(_))), "accepted {raw}");
        }

        let config = AnalyzerConfig::builder().cache_days(i64::MAX).build();
        assert!(matches!(config.cache_window(), Err(Error::Config(_))));
    }

    #[test]
    fn test_builder() {
        let config = AnalyzerConfig::builder()
            .llm_model("test-model")
            .llm_timeout_secs(1)
            .cache_days(2)
            .user_agent("test-agent")
            .build();

        assert_eq!(config.llm_model, "test-model");
        assert_eq!(config.llm_timeout_secs, 1);
        assert_eq!(config.cache_days, 2);
        assert_eq!(config.user_agent, "test-agent");
    }
}
