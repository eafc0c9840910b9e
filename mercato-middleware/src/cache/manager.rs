use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use mercato_types::{
    CacheKind, CacheTtlConfig, Category, InstrumentRef, InstrumentSnapshot, ProviderStatus,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use super::{CacheBackend, CacheStats, LruBackend};

/// Append `arg` with `%`, `|` and space percent-escaped so argument
/// boundaries stay unambiguous.
fn push_escaped(key: &mut String, arg: &str) {
    for ch in arg.chars() {
        match ch {
            '%' => key.push_str("%25"),
            '|' => key.push_str("%7C"),
            ' ' => key.push_str("%20"),
            _ => key.push(ch),
        }
    }
}

/// Typed front of the cache layer.
///
/// Builds deterministic keys (`kind|arg|arg...`, digested past the configured
/// length), applies the TTL of each [`CacheKind`], and turns backend failures
/// and undecodable values into misses.
pub struct CacheManager {
    backend: Arc<dyn CacheBackend>,
    ttl: CacheTtlConfig,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheManager {
    /// Manager over an explicit backend.
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: CacheTtlConfig) -> Self {
        Self {
            backend,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Manager over a fresh in-process LRU backend.
    #[must_use]
    pub fn in_memory(ttl: CacheTtlConfig) -> Self {
        let backend = Arc::new(LruBackend::new(ttl.max_entries));
        Self::new(backend, ttl)
    }

    /// Underlying backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// TTL applied to `kind`.
    #[must_use]
    pub fn ttl(&self, kind: CacheKind) -> Duration {
        self.ttl.ttl(kind)
    }

    /// Deterministic key for `kind` and ordered `args`.
    ///
    /// Each argument is percent-escaped, so distinct argument lists never
    /// share a key. Keys longer than the configured threshold are replaced by
    /// `kind:<sha256>`.
    #[must_use]
    pub fn key(&self, kind: CacheKind, args: &[&str]) -> String {
        let mut key = String::from(kind.as_str());
        for a in args {
            key.push('|');
            push_escaped(&mut key, a);
        }
        if key.len() > self.ttl.key_hash_threshold {
            let digest = Sha256::digest(key.as_bytes());
            return format!("{}:{digest:x}", kind.as_str());
        }
        key
    }

    /// Decode the value under `key`; misses, expired entries, backend
    /// failures and shape mismatches all yield `None`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let hit = match self.backend.get(key).await {
            Ok(v) => v.and_then(|v| serde_json::from_value(v).ok()),
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(key, error = %_e, "cache backend read failed");
                None
            }
        };
        let counter = if hit.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        hit
    }

    /// Store `value` under `key` with the TTL of `kind`. Failures are logged and ignored.
    pub async fn put_json<T: Serialize + ?Sized>(&self, kind: CacheKind, key: &str, value: &T) {
        let Ok(json) = serde_json::to_value(value) else {
            return;
        };
        if let Err(_e) = self.backend.set(key, json, self.ttl(kind)).await {
            #[cfg(feature = "tracing")]
            tracing::warn!(key, error = %_e, "cache backend write failed");
        }
    }

    /// Cached snapshot of one symbol.
    pub async fn market_data(
        &self,
        provider: &str,
        symbol: &str,
        category: Category,
    ) -> Option<InstrumentSnapshot> {
        let key = self.key(CacheKind::MarketData, &[provider, symbol, category.as_str()]);
        self.get_json(&key).await
    }

    /// Cache one snapshot under its provider, symbol and category.
    pub async fn put_market_data(&self, snap: &InstrumentSnapshot) {
        let key = self.key(
            CacheKind::MarketData,
            &[snap.provider.as_str(), snap.symbol.as_str(), snap.category.as_str()],
        );
        self.put_json(CacheKind::MarketData, &key, snap).await;
    }

    /// Cached references of one raw listing page.
    pub async fn instrument_list(
        &self,
        provider: &str,
        category: Category,
        page: &str,
    ) -> Option<Vec<InstrumentRef>> {
        let key = self.key(CacheKind::InstrumentList, &[provider, category.as_str(), page]);
        self.get_json(&key).await
    }

    /// Cache the references of one raw listing page.
    pub async fn put_instrument_list(
        &self,
        provider: &str,
        category: Category,
        page: &str,
        refs: &[InstrumentRef],
    ) {
        let key = self.key(CacheKind::InstrumentList, &[provider, category.as_str(), page]);
        self.put_json(CacheKind::InstrumentList, &key, refs).await;
    }

    /// Last recorded status of `provider`.
    pub async fn provider_health(&self, provider: &str) -> Option<ProviderStatus> {
        let key = self.key(CacheKind::ProviderHealth, &[provider]);
        self.get_json(&key).await
    }

    /// Record the status of `provider`.
    pub async fn put_provider_health(&self, provider: &str, status: &ProviderStatus) {
        let key = self.key(CacheKind::ProviderHealth, &[provider]);
        self.put_json(CacheKind::ProviderHealth, &key, status).await;
    }

    /// Key for an endpoint response; parameters are sorted by name.
    #[must_use]
    pub fn api_key(&self, endpoint: &str, params: &BTreeMap<&str, String>) -> String {
        let rendered: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let mut args: Vec<&str> = vec![endpoint];
        args.extend(rendered.iter().map(String::as_str));
        self.key(CacheKind::ApiResponse, &args)
    }

    /// Cached endpoint response.
    pub async fn api_response<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &BTreeMap<&str, String>,
    ) -> Option<T> {
        self.get_json(&self.api_key(endpoint, params)).await
    }

    /// Cache an endpoint response.
    pub async fn put_api_response<T: Serialize>(
        &self,
        endpoint: &str,
        params: &BTreeMap<&str, String>,
        value: &T,
    ) {
        let key = self.api_key(endpoint, params);
        self.put_json(CacheKind::ApiResponse, &key, value).await;
    }

    /// Drop every undigested entry belonging to `provider`; returns how many.
    pub async fn invalidate_provider(&self, provider: &str) -> usize {
        let mut removed = 0;
        for kind in [CacheKind::MarketData, CacheKind::InstrumentList] {
            let mut prefix = format!("{}|", kind.as_str());
            push_escaped(&mut prefix, provider);
            prefix.push('|');
            removed += self.backend.delete_prefix(&prefix).await.unwrap_or(0);
        }
        let health = self.key(CacheKind::ProviderHealth, &[provider]);
        if self.backend.delete(&health).await.unwrap_or(false) {
            removed += 1;
        }
        removed
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        if let Err(_e) = self.backend.clear().await {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_e, "cache clear failed");
        }
    }

    /// Eagerly drop expired entries.
    pub async fn purge_expired(&self) -> usize {
        self.backend.purge_expired().await
    }

    /// Current configuration and counters.
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            backend: self.backend.kind(),
            entries: self.backend.len().await,
            ttl_secs: CacheKind::ALL
                .into_iter()
                .map(|k| (k.as_str().to_string(), self.ttl(k).as_secs()))
                .collect(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::in_memory(CacheTtlConfig::default())
    }
}
