//! Per-process memo table for price lookups.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::trace;

/// Lookup counters, reported at the end of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Shared memo table. Clones share the same entries and counters.
pub struct Cache<K, V> {
    entries: Arc<Mutex<HashMap<K, V>>>,
    counters: Arc<Counters>,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Debug + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            counters: Arc::new(Counters {
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the memoized value and counts the lookup as a hit or a miss.
    pub async fn get(&self, key: &K) -> Option<V> {
        let value = self.entries.lock().await.get(key).cloned();
        let counter = if value.is_some() {
            &self.counters.hits
        } else {
            &self.counters.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        trace!(?key, hit = value.is_some(), "Cache lookup");
        value
    }

    /// Stores `value` unless another task stored one for `key` first; the
    /// value that ends up in the table is returned.
    pub async fn put(&self, key: K, value: V) -> V {
        let mut entries = self.entries.lock().await;
        entries.entry(key).or_insert(value).clone()
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.lock().await.len(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
        }
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Debug + Send + Sync,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}
