//! Configuration types shared across the orchestrator, middleware and adapters.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{CacheKind, Category};

/// Inclusive numeric bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    /// Lower bound (inclusive).
    pub min: f64,
    /// Upper bound (inclusive).
    pub max: f64,
}

impl PriceRange {
    /// Construct a range.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Returns true when `v` lies within the bounds.
    #[must_use]
    pub fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }
}

/// Retry policy for outbound calls.
///
/// Backoff grows as `min_backoff_ms * factor^(attempt-1)` clamped to
/// `[min_backoff_ms, max_backoff_ms]`, without jitter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one (>= 1).
    pub max_attempts: u32,
    /// Minimum backoff delay in milliseconds.
    pub min_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds.
    pub max_backoff_ms: u64,
    /// Exponential factor applied after each failure (>= 1).
    pub factor: u32,
    /// Extra wait after an HTTP 429 response, in milliseconds.
    pub rate_limited_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_backoff_ms: 1_000,
            max_backoff_ms: 10_000,
            factor: 2,
            rate_limited_backoff_ms: 15_000,
        }
    }
}

/// Request pacing for a single provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per `per` window.
    pub requests: u32,
    /// Window length.
    pub per: Duration,
}

impl RateLimitConfig {
    /// `n` requests per second.
    #[must_use]
    pub const fn per_second(n: u32) -> Self {
        Self {
            requests: n,
            per: Duration::from_secs(1),
        }
    }

    /// `n` requests per minute.
    #[must_use]
    pub const fn per_minute(n: u32) -> Self {
        Self {
            requests: n,
            per: Duration::from_secs(60),
        }
    }

    /// Minimum spacing between two grants.
    ///
    /// A zero request count disables pacing.
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        if self.requests == 0 {
            return Duration::ZERO;
        }
        self.per / self.requests
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        // One request every two seconds.
        Self {
            requests: 1,
            per: Duration::from_secs(2),
        }
    }
}

/// Time-to-live per cache kind plus key shaping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheTtlConfig {
    /// TTL per cache kind, in seconds. Zero disables caching for that kind.
    pub ttl_secs: BTreeMap<CacheKind, u64>,
    /// Keys longer than this are replaced by a digest.
    pub key_hash_threshold: usize,
    /// Capacity of the in-process backend.
    pub max_entries: usize,
}

impl CacheTtlConfig {
    /// TTL for `kind`; unknown kinds fall back to 60 seconds.
    #[must_use]
    pub fn ttl(&self, kind: CacheKind) -> Duration {
        Duration::from_secs(self.ttl_secs.get(&kind).copied().unwrap_or(60))
    }

    /// Override the TTL of one kind.
    #[must_use]
    pub fn with_ttl(mut self, kind: CacheKind, ttl: Duration) -> Self {
        self.ttl_secs.insert(kind, ttl.as_secs());
        self
    }
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        let ttl_secs = BTreeMap::from([
            (CacheKind::MarketData, 60),
            (CacheKind::InstrumentList, 300),
            (CacheKind::ProviderHealth, 120),
            (CacheKind::ApiResponse, 30),
        ]);
        Self {
            ttl_secs,
            key_hash_threshold: 200,
            max_entries: 10_000,
        }
    }
}

/// Plausibility tables used by the validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Accepted price range per category.
    pub price: BTreeMap<Category, PriceRange>,
    /// Accepted change-percent range per category.
    pub change_pct: BTreeMap<Category, PriceRange>,
    /// Accepted symbol shapes per category; a symbol must match one.
    pub symbol_patterns: BTreeMap<Category, Vec<String>>,
    /// Snapshots older than this many hours are rejected.
    pub max_age_hours: i64,
    /// Tolerated clock skew for timestamps slightly in the future.
    pub future_tolerance_secs: i64,
    /// Upper bound on `market_cap` metadata.
    pub max_market_cap: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        use Category::{Commodities, Crypto, Forex, Indices, Stocks};

        let price = BTreeMap::from([
            (Forex, PriceRange::new(0.0001, 10_000.0)),
            (Stocks, PriceRange::new(0.01, 1_000_000.0)),
            (Crypto, PriceRange::new(0.000_000_01, 1_000_000.0)),
            (Indices, PriceRange::new(0.1, 100_000.0)),
            (Commodities, PriceRange::new(0.01, 100_000.0)),
        ]);
        let change_pct = BTreeMap::from([
            (Forex, PriceRange::new(-50.0, 50.0)),
            (Stocks, PriceRange::new(-100.0, 1_000.0)),
            (Crypto, PriceRange::new(-99.0, 10_000.0)),
            (Indices, PriceRange::new(-30.0, 30.0)),
            (Commodities, PriceRange::new(-50.0, 100.0)),
        ]);
        let patterns = |ps: &[&str]| ps.iter().map(|p| (*p).to_string()).collect::<Vec<_>>();
        let symbol_patterns = BTreeMap::from([
            (Forex, patterns(&[r"^[A-Z]{6}=X$", r"^[A-Z]{3}[A-Z]{3}$"])),
            (Stocks, patterns(&[r"^[A-Z]{1,5}$"])),
            (Crypto, patterns(&[r"^[A-Z]{2,10}-USD$", r"^[A-Z]{2,10}USD$"])),
            (Indices, patterns(&[r"^\^[A-Z0-9]{1,10}$", r"^[A-Z0-9]{1,10}$"])),
            (Commodities, patterns(&[r"^[A-Z]{2,4}=F$", r"^[A-Z]{2,4}$"])),
        ]);
        Self {
            price,
            change_pct,
            symbol_patterns,
            max_age_hours: 24,
            future_tolerance_secs: 5,
            max_market_cap: 1e15,
        }
    }
}

/// Global configuration for the `Mercato` orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MercatoConfig {
    /// Page size used when a request does not specify one.
    pub default_page_size: usize,
    /// Largest accepted page size.
    pub max_page_size: usize,
    /// Hours window used when a request does not specify one.
    pub default_hours_window: u32,
    /// Concurrency used when a request does not specify one.
    pub max_concurrency: usize,
    /// Ceiling on concurrent units; requests above it are rejected. May not
    /// exceed [`MercatoConfig::CONCURRENCY_LIMIT`].
    pub hard_max_concurrency: usize,
    /// Timeout applied to each (provider, category) unit.
    pub provider_timeout: Duration,
    /// Optional deadline for the whole aggregate call.
    pub request_timeout: Option<Duration>,
    /// Whether requests dedupe unless told otherwise.
    pub dedupe_by_default: bool,
    /// Provider names in descending dedupe priority. Empty means registration order.
    pub dedupe_priority: Vec<String>,
    /// Upper bound on elements walked per category during verification.
    pub verify_cap: usize,
    /// Number of sample checks reported per verified category.
    pub verify_sample_size: usize,
}

impl MercatoConfig {
    /// Most units any orchestrator runs at once, whatever the configuration says.
    pub const CONCURRENCY_LIMIT: usize = 4;
}

impl Default for MercatoConfig {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 500,
            default_hours_window: 1,
            max_concurrency: Self::CONCURRENCY_LIMIT,
            hard_max_concurrency: Self::CONCURRENCY_LIMIT,
            provider_timeout: Duration::from_secs(60),
            request_timeout: None,
            dedupe_by_default: true,
            dedupe_priority: Vec::new(),
            verify_cap: 5_000,
            verify_sample_size: 3,
        }
    }
}
