//! Suggestion cache stores keyed by page URL

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::error::CacheError;
use crate::suggestions::SuggestionResult;

type Result<T> = std::result::Result<T, CacheError>;

/// Persistence for suggestion results
pub trait CacheStore: Send + Sync {
    fn get(&self, url: &str) -> impl Future<Output = Result<Option<SuggestionResult>>> + Send;

    fn put(
        &self,
        url: &str,
        result: SuggestionResult,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, SuggestionResult>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl CacheStore for MemoryCacheStore {
    async fn get(&self, url: &str) -> Result<Option<SuggestionResult>> {
        Ok(self.entries.read().await.get(url).cloned())
    }

    async fn put(&self, url: &str, result: SuggestionResult) -> Result<()> {
        self.entries.write().await.insert(url.to_string(), result);
        Ok(())
    }
}

/// Store backed by a single JSON document mapping URL to result.
///
/// The file is read on first use and rewritten in full on every `put`.
#[derive(Debug)]
pub struct JsonFileCacheStore {
    path: PathBuf,
    entries: Mutex<Option<HashMap<String, SuggestionResult>>>,
}

impl JsonFileCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<HashMap<String, SuggestionResult>> {
        match fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(HashMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn persist(&self, entries: &HashMap<String, SuggestionResult>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), entries = entries.len(), "Persisted suggestion cache");
        Ok(())
    }
}

impl CacheStore for JsonFileCacheStore {
    async fn get(&self, url: &str) -> Result<Option<SuggestionResult>> {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        Ok(guard.as_ref().and_then(|entries| entries.get(url).cloned()))
    }

    async fn put(&self, url: &str, result: SuggestionResult) -> Result<()> {
        let mut guard = self.entries.lock().await;
        let mut entries = match guard.take() {
            Some(entries) => entries,
            None => self.load().await?,
        };
        entries.insert(url.to_string(), result);
        let persisted = self.persist(&entries).await;
        *guard = Some(entries);
        persisted
    }
}
