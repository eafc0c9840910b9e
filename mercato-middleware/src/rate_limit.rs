//! Per-provider interval pacing.
//!
//! Each provider owns one [`RateLimiter`]. A grant is handed out at most once
//! every `1/N` seconds; callers arriving early sleep for the remainder while
//! holding the limiter, so concurrent callers serialize in arrival order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use mercato_types::RateLimitConfig;
use tokio::time::Instant;

/// Interval pacer for one provider.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_grant: tokio::sync::Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Pacer allowing `cfg.requests` grants per `cfg.per`.
    #[must_use]
    pub fn new(cfg: RateLimitConfig) -> Self {
        Self::with_interval(cfg.min_interval())
    }

    /// Pacer allowing `rps` grants per second; fractional rates are allowed.
    ///
    /// Non-positive or non-finite rates disable pacing. Rates too small for
    /// a `Duration` saturate to [`Duration::MAX`].
    #[must_use]
    pub fn per_second(rps: f64) -> Self {
        let interval = if rps.is_finite() && rps > 0.0 {
            Duration::try_from_secs_f64(1.0 / rps).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };
        Self::with_interval(interval)
    }

    /// Pacer with an explicit minimum spacing between grants.
    #[must_use]
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            last_grant: tokio::sync::Mutex::new(None),
        }
    }

    /// Minimum spacing between grants.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until a grant is available and record it.
    pub async fn acquire(&self) {
        let mut last = self.last_grant.lock().await;
        if let Some(prev) = *last {
            match prev.checked_add(self.interval) {
                Some(ready_at) if ready_at > Instant::now() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        wait_ms = u64::try_from((ready_at - Instant::now()).as_millis()).unwrap_or(u64::MAX),
                        "rate limiter pacing request"
                    );
                    tokio::time::sleep_until(ready_at).await;
                }
                Some(_) => {}
                // Past the end of the clock; `sleep` parks until the far future.
                None => tokio::time::sleep(self.interval).await,
            }
        }
        *last = Some(Instant::now());
    }
}

/// Lazily created limiters keyed by provider name.
///
/// Providers without an explicit override share the default configuration,
/// but each still gets its own limiter.
#[derive(Debug, Default)]
pub struct RateLimiterRegistry {
    default: RateLimitConfig,
    overrides: HashMap<String, RateLimitConfig>,
    limiters: Mutex<HashMap<String, Arc<RateLimiter>>>,
}

impl RateLimiterRegistry {
    /// Registry whose providers default to `default`.
    #[must_use]
    pub fn new(default: RateLimitConfig) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
            limiters: Mutex::new(HashMap::new()),
        }
    }

    /// Configure one provider explicitly.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>, cfg: RateLimitConfig) -> Self {
        self.overrides.insert(provider.into(), cfg);
        self
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<RateLimiter>>> {
        self.limiters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Limiter for `provider`, created on first use.
    pub fn get(&self, provider: &str) -> Arc<RateLimiter> {
        let mut map = self.lock();
        if let Some(existing) = map.get(provider) {
            return Arc::clone(existing);
        }
        let cfg = self.overrides.get(provider).copied().unwrap_or(self.default);
        let limiter = Arc::new(RateLimiter::new(cfg));
        map.insert(provider.to_string(), Arc::clone(&limiter));
        limiter
    }

    /// Number of limiters created so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true when no limiter has been created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_rates_map_to_intervals() {
        assert_eq!(RateLimiter::per_second(2.0).interval(), Duration::from_millis(500));
        let five_per_minute = RateLimiter::new(RateLimitConfig::per_minute(5));
        assert_eq!(five_per_minute.interval(), Duration::from_secs(12));
        assert_eq!(RateLimiter::per_second(0.0).interval(), Duration::ZERO);
    }

    #[test]
    fn vanishing_rates_saturate() {
        assert_eq!(RateLimiter::per_second(1e-300).interval(), Duration::MAX);
        assert_eq!(RateLimiter::per_second(f64::MIN_POSITIVE).interval(), Duration::MAX);
        assert_eq!(RateLimiter::per_second(f64::NAN).interval(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_interval_blocks_without_overflow() {
        let limiter = RateLimiter::with_interval(Duration::MAX);
        limiter.acquire().await;
        let second = tokio::time::timeout(Duration::from_secs(365 * 24 * 3600), limiter.acquire()).await;
        assert!(second.is_err());
    }

    #[test]
    fn registry_hands_out_one_limiter_per_provider() {
        let reg = RateLimiterRegistry::new(RateLimitConfig::per_second(1))
            .with_provider("slow", RateLimitConfig::per_minute(5));
        let a = reg.get("fast");
        let b = reg.get("fast");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(reg.get("slow").interval(), Duration::from_secs(12));
        assert_eq!(reg.len(), 2);
    }
}
