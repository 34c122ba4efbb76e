//! # Suggestion Cache
//!
//! Reuses suggestion results younger than the freshness window. Generation
//! for a given URL is single-flight: concurrent callers for the same URL wait
//! on a per-URL lock and then pick up the result the first caller stored.
//! A lock is dropped from the map once no caller holds it.

mod error;
pub mod gate;
pub mod store;

pub use error::CacheError;
pub use gate::should_regenerate;
pub use store::{CacheStore, JsonFileCacheStore, MemoryCacheStore};

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use tracing::{debug, instrument, warn};

use crate::suggestions::SuggestionResult;

/// Per-URL generation locks with the number of callers holding each
type LockMap = Mutex<HashMap<String, (Arc<tokio::sync::Mutex<()>>, usize)>>;

/// Freshness-gated cache in front of a [`CacheStore`]
pub struct SuggestionCache<S: CacheStore> {
    store: S,
    window: Duration,
    locks: LockMap,
}

/// A caller's share of a per-URL lock. Dropping the last share removes the
/// map entry, including when the caller is cancelled mid-generation.
struct UrlLock<'a> {
    locks: &'a LockMap,
    url: &'a str,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for UrlLock<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some((_, holders)) = locks.get_mut(self.url) {
            *holders -= 1;
            if *holders == 0 {
                locks.remove(self.url);
            }
        }
    }
}

impl<S: CacheStore> SuggestionCache<S> {
    pub fn new(store: S, window: Duration) -> Self {
        Self {
            store,
            window,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn url_lock<'a>(&'a self, url: &'a str) -> UrlLock<'a> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let (lock, holders) = locks.entry(url.to_string()).or_default();
        *holders += 1;
        UrlLock {
            locks: &self.locks,
            url,
            lock: lock.clone(),
        }
    }

    /// Number of URLs with a generation in flight or waiting
    pub fn in_flight(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Return the cached result for `url` when fresh, otherwise run `generate`
    /// and store its result. Errored results are returned but never stored.
    ///
    /// Store failures are logged and do not fail the lookup.
    #[instrument(skip(self, generate))]
    pub async fn get_or_generate<F, Fut>(
        &self,
        url: &str,
        force: bool,
        generate: F,
    ) -> SuggestionResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SuggestionResult>,
    {
        let entry = self.url_lock(url);
        let _guard = entry.lock.lock().await;

        let prior = match self.store.get(url).await {
            Ok(prior) => prior,
            Err(e) => {
                warn!(error = %e, "Cache read failed, regenerating");
                None
            }
        };

        if !should_regenerate(prior.as_ref(), Utc::now(), self.window, force) {
            if let Some(prior) = prior {
                debug!("Reusing cached suggestions");
                return prior;
            }
        }

        let result = generate().await;
        if result.is_error() {
            debug!("Not caching errored suggestions");
        } else if let Err(e) = self.store.put(url, result.clone()).await {
            warn!(error = %e, "Cache write failed");
        }
        result
    }
}
