use std::time::{Duration, Instant};

use async_trait::async_trait;
use mercato_types::MercatoError;
use moka::Expiry;
use moka::future::Cache;
use serde_json::Value;

use super::CacheBackend;

#[derive(Clone)]
struct Stored {
    value: Value,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, Stored> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Stored, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Stored,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Concurrent cache backed by `moka`, with a TTL per entry.
///
/// Expiry and capacity eviction are handled by moka's own maintenance.
#[derive(Clone)]
pub struct MokaBackend {
    cache: Cache<String, Stored>,
}

impl MokaBackend {
    /// Backend holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }
}

impl Default for MokaBackend {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl CacheBackend for MokaBackend {
    fn kind(&self) -> &'static str {
        "moka"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, MercatoError> {
        Ok(self.cache.get(key).await.map(|s| s.value))
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), MercatoError> {
        if ttl.is_zero() {
            self.cache.invalidate(key).await;
            return Ok(());
        }
        self.cache.insert(key.to_string(), Stored { value, ttl }).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, MercatoError> {
        Ok(self.cache.remove(key).await.is_some())
    }

    async fn clear(&self) -> Result<(), MercatoError> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, MercatoError> {
        let doomed: Vec<String> = self
            .cache
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.to_string())
            .collect();
        for k in &doomed {
            self.cache.invalidate(k).await;
        }
        Ok(doomed.len())
    }

    async fn len(&self) -> usize {
        self.cache.run_pending_tasks().await;
        usize::try_from(self.cache.entry_count()).unwrap_or(usize::MAX)
    }

    async fn purge_expired(&self) -> usize {
        let before = self.cache.entry_count();
        self.cache.run_pending_tasks().await;
        usize::try_from(before.saturating_sub(self.cache.entry_count())).unwrap_or(0)
    }
}
