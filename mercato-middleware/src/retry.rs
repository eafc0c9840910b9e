use std::future::Future;
use std::time::Duration;

use mercato_types::{MercatoError, RetryConfig, TransportError};

/// Bounded, jitter-free exponential retry for outbound calls.
///
/// Only transient transport errors are retried (timeouts, connection errors,
/// 5xx, 429). A 429 waits at least `rate_limited_backoff_ms` before the next
/// attempt. Anything else short-circuits on the first occurrence.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryPolicy {
    cfg: RetryConfig,
}

impl RetryPolicy {
    /// Policy from configuration; `max_attempts` below 1 is treated as 1.
    #[must_use]
    pub const fn new(cfg: RetryConfig) -> Self {
        Self { cfg }
    }

    /// Policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self::new(RetryConfig {
            max_attempts: 1,
            ..RetryConfig::default()
        })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &RetryConfig {
        &self.cfg
    }

    fn attempts(&self) -> u32 {
        self.cfg.max_attempts.max(1)
    }

    /// Delay after the `failures`-th consecutive failure (1-based).
    #[must_use]
    pub fn backoff_for(&self, failures: u32) -> Duration {
        let min = self.cfg.min_backoff_ms;
        let max = self.cfg.max_backoff_ms.max(min);
        let factor = u64::from(self.cfg.factor.max(1));
        let grown = factor
            .saturating_pow(failures.saturating_sub(1))
            .saturating_mul(min);
        Duration::from_millis(grown.clamp(min, max))
    }

    fn delay_after(&self, failures: u32, err: &TransportError) -> Duration {
        let base = self.backoff_for(failures);
        if err.is_rate_limited() {
            base.max(Duration::from_millis(self.cfg.rate_limited_backoff_ms))
        } else {
            base
        }
    }

    /// Run `op` until it succeeds, fails permanently or runs out of attempts.
    ///
    /// `op` receives the 1-based attempt number.
    ///
    /// # Errors
    /// - `NotFound` for a 404.
    /// - `Transport` for any other non-retryable failure.
    /// - `RetriesExhausted` when every attempt failed transiently.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "mercato::retry::run",
            skip(self, op),
            fields(connector = connector, max_attempts = self.attempts()),
        )
    )]
    pub async fn run<T, F, Fut>(&self, connector: &str, mut op: F) -> Result<T, MercatoError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let attempts = self.attempts();
        let mut last = TransportError::Timeout;
        for attempt in 1..=attempts {
            match op(attempt).await {
                Ok(v) => return Ok(v),
                Err(TransportError::Status { code: 404 }) => {
                    return Err(MercatoError::not_found(format!("{connector}: http 404")));
                }
                Err(e) if !e.is_transient() => {
                    return Err(MercatoError::transport(connector, e));
                }
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(attempt, error = %e, "transient transport failure");
                    if attempt < attempts {
                        tokio::time::sleep(self.delay_after(attempt, &e)).await;
                    }
                    last = e;
                }
            }
        }
        Err(MercatoError::RetriesExhausted {
            connector: connector.to_string(),
            attempts,
            last,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_clamps() {
        let p = RetryPolicy::new(RetryConfig {
            max_attempts: 5,
            min_backoff_ms: 1_000,
            max_backoff_ms: 10_000,
            factor: 2,
            rate_limited_backoff_ms: 15_000,
        });
        assert_eq!(p.backoff_for(1), Duration::from_secs(1));
        assert_eq!(p.backoff_for(2), Duration::from_secs(2));
        assert_eq!(p.backoff_for(3), Duration::from_secs(4));
        assert_eq!(p.backoff_for(5), Duration::from_secs(10));
        assert_eq!(p.backoff_for(60), Duration::from_secs(10));
    }

    #[test]
    fn rate_limited_waits_longer() {
        let p = RetryPolicy::default();
        let d = p.delay_after(1, &TransportError::Status { code: 429 });
        assert_eq!(d, Duration::from_secs(15));
        let d = p.delay_after(1, &TransportError::Status { code: 503 });
        assert_eq!(d, Duration::from_secs(1));
    }
}
