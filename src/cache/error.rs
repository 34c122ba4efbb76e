use thiserror::Error;

/// Error type for cache store operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<CacheError> for crate::error::Error {
    fn from(err: CacheError) -> Self {
        crate::error::Error::Cache(err.to_string())
    }
}
