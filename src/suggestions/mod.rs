//! # LLM Suggestion Generation
//!
//! Asks a language model for improved title, meta description and H1 text for
//! an analyzed page. Every failure (missing credentials, timeout, model error,
//! unusable output) is folded into a [`SuggestionResult`] with `error` set so
//! that page analysis always completes.

mod error;
pub mod prompt;
pub mod response_parsing;

pub use error::SuggestionError;
pub use response_parsing::{ParsedSuggestions, parse_suggestions};

use std::time::Duration;

use chrono::{DateTime, Utc};
use rig::completion::{AssistantContent, CompletionModel};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::AnalyzerConfig;
use crate::extractor::PageRecord;

/// Token ceiling for a suggestion response
const MAX_TOKENS: u64 = 512;

/// Outcome of a suggestion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionResult {
    pub improved_title: Option<String>,
    pub improved_meta_description: Option<String>,
    pub improved_h1: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_summary: Option<String>,

    #[serde(default)]
    pub suggestions: Vec<String>,

    pub generated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SuggestionResult {
    /// An errored result. Improvement fields stay empty.
    pub fn failed(error: &SuggestionError, model: Option<String>) -> Self {
        Self {
            improved_title: None,
            improved_meta_description: None,
            improved_h1: None,
            seo_summary: None,
            suggestions: Vec::new(),
            generated_at: Utc::now(),
            model,
            error: Some(error.to_string()),
        }
    }

    fn from_parsed(parsed: ParsedSuggestions, model: String) -> Self {
        Self {
            improved_title: parsed.improved_title,
            improved_meta_description: parsed.improved_meta_description,
            improved_h1: parsed.improved_h1,
            seo_summary: parsed.seo_summary,
            suggestions: parsed.suggestions,
            generated_at: Utc::now(),
            model: Some(model),
            error: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Generates suggestions with any rig completion model
#[derive(Clone)]
pub struct SuggestionGenerator<M: CompletionModel> {
    model: M,
    model_name: String,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl<M: CompletionModel> SuggestionGenerator<M> {
    pub fn new(model: M, model_name: impl Into<String>) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            timeout: Duration::from_secs(20),
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
        }
    }

    /// Generator using the model name, timeout and retry count from `config`
    pub fn from_config(model: M, config: &AnalyzerConfig) -> Self {
        Self::new(model, config.llm_model.clone())
            .with_timeout(config.llm_timeout())
            .with_max_retries(config.llm_max_retries)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Produce suggestions for a page. Never fails: problems are reported in
    /// the result's `error` field.
    #[instrument(skip(self, record, issues), fields(url = %record.url, model = %self.model_name))]
    pub async fn generate(&self, record: &PageRecord, issues: &[String]) -> SuggestionResult {
        let request = prompt::build_prompt(record, issues);
        let mut attempt = 0;

        loop {
            match self.attempt(&request).await {
                Ok(parsed) => {
                    debug!(attempt, "Suggestions generated");
                    return SuggestionResult::from_parsed(parsed, self.model_name.clone());
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(error = %e, attempt, "Suggestion attempt failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    warn!(error = %e, "Suggestion generation failed");
                    return SuggestionResult::failed(&e, Some(self.model_name.clone()));
                }
            }
        }
    }

    async fn attempt(&self, request: &str) -> Result<ParsedSuggestions, SuggestionError> {
        let call = self
            .model
            .completion_request(request.to_string())
            .preamble(prompt::PREAMBLE.to_string())
            .temperature(0.0)
            .max_tokens(MAX_TOKENS)
            .send();

        let response = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| SuggestionError::Timeout(self.timeout))??;

        let text = response
            .choice
            .iter()
            .filter_map(|c| match c {
                AssistantContent::Text(t) => Some(t.text.clone()),
                _ => None,
            })
            .collect::<Vec<String>>()
            .join("\n");

        parse_suggestions(&text)
    }
}
