//! Response cache
//!
//! Raw markup keyed by fully expanded URL. Shared by every navigation of
//! one runtime.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,
    pub markup: String,
    pub stored_at: DateTime<Utc>,
}

pub struct CacheStore {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Option<Duration>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl: None,
        }
    }

    /// Entries older than `ttl` are treated as misses.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::new()
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        match self.ttl {
            Some(ttl) => Utc::now() - entry.stored_at <= ttl,
            None => true,
        }
    }

    pub fn get(&self, url: &str) -> Option<String> {
        let entries = self.entries.read();
        entries
            .get(url)
            .filter(|entry| self.is_fresh(entry))
            .map(|entry| entry.markup.clone())
    }

    pub fn contains(&self, url: &str) -> bool {
        let entries = self.entries.read();
        entries.get(url).is_some_and(|entry| self.is_fresh(entry))
    }

    /// Store (or refresh) the markup for `url`.
    pub fn insert(&self, url: &str, markup: String) {
        tracing::debug!(url = %url, bytes = markup.len(), "Caching response");
        self.entries.write().insert(
            url.to_string(),
            CacheEntry {
                url: url.to_string(),
                markup,
                stored_at: Utc::now(),
            },
        );
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for CacheStore {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            ttl: self.ttl,
        }
    }
}
