//! Concurrency-safe in-memory TTL cache.
//!
//! One mutex guards both the backing map and the hit/miss/set counters, and
//! no I/O ever happens while it is held. Expiry is checked lazily at read
//! time; the background sweeper only bounds memory from expired entries and
//! is never required for `get` correctness.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Per-operation TTLs, tuned to how quickly each page class goes stale.
pub mod ttl {
    use std::time::Duration;

    /// Home/popular pages change infrequently
    pub const HOME: Duration = Duration::from_secs(15 * 60);
    pub const SEARCH: Duration = Duration::from_secs(30 * 60);
    pub const DETAIL: Duration = Duration::from_secs(60 * 60);
    /// Chapter/episode lists
    pub const CHAPTER: Duration = Duration::from_secs(2 * 60 * 60);
    /// Stream URLs can expire quickly upstream
    pub const STREAM: Duration = Duration::from_secs(5 * 60);
}

/// Consistent cache-key formats, namespaced by source.
pub mod keys {
    pub fn home(source: &str) -> String {
        format!("{}:home", source)
    }
    pub fn search(source: &str, keyword: &str) -> String {
        format!("{}:search:{}", source, keyword)
    }
    pub fn detail(source: &str, endpoint: &str) -> String {
        format!("{}:detail:{}", source, endpoint)
    }
    pub fn episode(source: &str, endpoint: &str) -> String {
        format!("{}:episode:{}", source, endpoint)
    }
    pub fn chapter(source: &str, endpoint: &str) -> String {
        format!("{}:chapter:{}", source, endpoint)
    }
    pub fn listing(source: &str, name: &str) -> String {
        format!("{}:{}", source, name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

struct Inner<V> {
    items: HashMap<String, Entry<V>>,
    stats: CacheStats,
}

pub struct TtlCache<V> {
    inner: Mutex<Inner<V>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<V: Clone + Send + 'static> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: HashMap::new(),
                stats: CacheStats::default(),
            }),
            sweeper: Mutex::new(None),
        }
    }

    /// Look up a key. Entries past their expiry are misses even if the
    /// sweeper has not reclaimed them yet.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock().unwrap();
        match inner.items.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                let value = entry.value.clone();
                inner.stats.hits += 1;
                Some(value)
            }
            _ => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    /// Unconditional overwrite; expiry is always creation time + `ttl`,
    /// including when an existing key is replaced.
    pub fn set(&self, key: &str, value: V, ttl: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.items.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        inner.stats.sets += 1;
    }

    pub fn delete(&self, key: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.items.remove(key);
    }

    /// Atomically empty the store and zero all counters.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.items.clear();
        inner.stats = CacheStats::default();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cumulative counters since construction or the last `clear`.
    pub fn stats(&self) -> CacheStats {
        self.inner.lock().unwrap().stats
    }

    /// hits / (hits + misses), 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let stats = self.stats();
        let total = stats.hits + stats.misses;
        if total == 0 {
            return 0.0;
        }
        stats.hits as f64 / total as f64
    }

    /// Drop every expired entry. Called by the sweeper; harmless to call
    /// directly.
    pub fn sweep(&self) {
        let mut inner = self.inner.lock().unwrap();
        let now = Instant::now();
        inner.items.retain(|_, entry| entry.expires_at > now);
    }

    /// Start the owned background sweep task. The task holds only a weak
    /// reference, so dropping the last `Arc` ends it; restarting replaces
    /// (and cancels) a previous sweeper.
    pub fn start_sweeper(self: Arc<Self>, every: Duration) {
        let weak: Weak<Self> = Arc::downgrade(&self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // the first tick fires immediately; nothing can be expired yet
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = weak.upgrade() else { break };
                cache.sweep();
            }
        });
        let mut guard = self.sweeper.lock().unwrap();
        if let Some(old) = guard.replace(handle) {
            old.abort();
        }
    }

    /// Stop the sweep task. Reads and writes keep working; only the
    /// periodic reclamation stops.
    pub fn shutdown(&self) {
        let mut guard = self.sweeper.lock().unwrap();
        if let Some(handle) = guard.take() {
            handle.abort();
        }
    }
}

impl<V: Clone + Send + 'static> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Drop for TtlCache<V> {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.sweeper.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}
