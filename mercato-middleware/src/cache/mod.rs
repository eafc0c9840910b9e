//! TTL cache with swappable storage.
//!
//! The core only talks to [`CacheBackend`]; [`LruBackend`] keeps entries in
//! process with lazy expiry on read, [`MokaBackend`] delegates eviction to a
//! concurrent cache. [`CacheManager`] builds deterministic keys and applies the
//! TTL of each [`CacheKind`](mercato_types::CacheKind).

use std::time::Duration;

use async_trait::async_trait;
use mercato_types::MercatoError;
use serde::Serialize;
use serde_json::Value;

mod adapter;
mod lru_store;
mod manager;
mod moka_store;

pub use adapter::{CacheMiddleware, CachingAdapter};
pub use lru_store::LruBackend;
pub use manager::CacheManager;
pub use moka_store::MokaBackend;

/// Storage behind the cache layer.
///
/// Expired entries must be indistinguishable from missing ones. Errors are
/// reserved for shared stores; callers treat them as misses.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short backend label for stats and logs.
    fn kind(&self) -> &'static str;

    /// Value stored under `key`, if present and not expired.
    async fn get(&self, key: &str) -> Result<Option<Value>, MercatoError>;

    /// Store `value` under `key` for `ttl`. A zero TTL stores nothing.
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), MercatoError>;

    /// Remove `key`; returns whether it was present.
    async fn delete(&self, key: &str) -> Result<bool, MercatoError>;

    /// Remove every entry.
    async fn clear(&self) -> Result<(), MercatoError>;

    /// Remove every entry whose key starts with `prefix`; returns how many.
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, MercatoError>;

    /// Number of stored entries, expired ones included until compaction.
    async fn len(&self) -> usize;

    /// Drop expired entries eagerly; returns how many were removed.
    async fn purge_expired(&self) -> usize {
        0
    }
}

/// Snapshot of cache configuration and occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Backend label.
    pub backend: &'static str,
    /// Entries currently stored.
    pub entries: usize,
    /// TTL per kind in seconds.
    pub ttl_secs: std::collections::BTreeMap<String, u64>,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that missed or failed.
    pub misses: u64,
}
