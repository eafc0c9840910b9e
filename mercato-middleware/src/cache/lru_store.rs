use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use ::lru::LruCache;
use async_trait::async_trait;
use mercato_types::MercatoError;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::CacheBackend;

struct Entry {
    value: Value,
    created_at: Instant,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-process LRU map with lazy expiry on read.
///
/// Expired entries are evicted when read or by [`purge_expired`](CacheBackend::purge_expired);
/// capacity overflow evicts the least recently used entry.
pub struct LruBackend {
    inner: Mutex<LruCache<String, Entry>>,
    purged: AtomicU64,
}

impl LruBackend {
    /// Backend holding at most `capacity` entries (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(cap)),
            purged: AtomicU64::new(0),
        }
    }

    /// Entries removed by compaction so far.
    #[must_use]
    pub fn purged_total(&self) -> u64 {
        self.purged.load(Ordering::Relaxed)
    }

    /// Age of the entry under `key`, if it is still live.
    pub async fn age(&self, key: &str) -> Option<Duration> {
        let guard = self.inner.lock().await;
        let now = Instant::now();
        guard
            .peek(key)
            .filter(|e| e.is_live(now))
            .map(|e| now - e.created_at)
    }

    /// Run compaction every `every` until the backend is dropped.
    pub fn spawn_janitor(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            tick.tick().await;
            loop {
                tick.tick().await;
                let Some(backend) = weak.upgrade() else {
                    break;
                };
                let _removed = backend.purge_expired().await;
                #[cfg(feature = "tracing")]
                tracing::debug!(removed = _removed, "cache compaction");
            }
        })
    }
}

impl Default for LruBackend {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl CacheBackend for LruBackend {
    fn kind(&self) -> &'static str {
        "lru"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, MercatoError> {
        let mut guard = self.inner.lock().await;
        let now = Instant::now();
        if let Some(entry) = guard.get(key)
            && entry.is_live(now)
        {
            return Ok(Some(entry.value.clone()));
        }
        guard.pop(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), MercatoError> {
        let mut guard = self.inner.lock().await;
        if ttl.is_zero() {
            guard.pop(key);
            return Ok(());
        }
        let now = Instant::now();
        guard.put(
            key.to_string(),
            Entry {
                value,
                created_at: now,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, MercatoError> {
        Ok(self.inner.lock().await.pop(key).is_some())
    }

    async fn clear(&self) -> Result<(), MercatoError> {
        self.inner.lock().await.clear();
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, MercatoError> {
        let mut guard = self.inner.lock().await;
        let doomed: Vec<String> = guard
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect();
        for k in &doomed {
            guard.pop(k);
        }
        Ok(doomed.len())
    }

    async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    async fn purge_expired(&self) -> usize {
        let mut guard = self.inner.lock().await;
        let now = Instant::now();
        let expired: Vec<String> = guard
            .iter()
            .filter(|(_, e)| !e.is_live(now))
            .map(|(k, _)| k.clone())
            .collect();
        for k in &expired {
            guard.pop(k);
        }
        self.purged
            .fetch_add(expired.len() as u64, Ordering::Relaxed);
        expired.len()
    }
}
