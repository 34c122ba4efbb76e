//! Error types for the suggestions module

use std::time::Duration;

use thiserror::Error;

/// Reasons a suggestion could not be produced. These never fail the page
/// analysis; they end up in `SuggestionResult::error`.
#[derive(Debug, Error)]
pub enum SuggestionError {
    /// No language model is configured
    #[error("Suggestions unavailable: {0}")]
    Unavailable(String),

    /// The model did not answer in time
    #[error("Language model timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The model call failed
    #[error("Language model error: {0}")]
    Model(String),

    /// The model answered with text that holds no usable JSON object
    #[error("Language model returned unparsable output: {0}")]
    Unparseable(String),
}

impl SuggestionError {
    /// Whether another attempt may help
    pub fn is_retryable(&self) -> bool {
        matches!(self, SuggestionError::Model(_) | SuggestionError::Unparseable(_))
    }
}

impl From<rig::completion::CompletionError> for SuggestionError {
    fn from(err: rig::completion::CompletionError) -> Self {
        SuggestionError::Model(err.to_string())
    }
}
