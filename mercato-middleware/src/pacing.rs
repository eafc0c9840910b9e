//! Adapter-level pacing for sources that do not route through a [`Fetcher`](crate::Fetcher).

use std::sync::Arc;

use async_trait::async_trait;
use mercato_core::{Cursor, MarketAdapter, Middleware, RefPage};
use mercato_types::{Category, InstrumentRef, InstrumentSnapshot, MercatoError, RateLimitConfig};
use serde_json::json;

use crate::RateLimiter;

/// Wrapper that takes a limiter grant before every listing and snapshot call.
pub struct PacedAdapter {
    inner: Arc<dyn MarketAdapter>,
    limiter: Arc<RateLimiter>,
}

impl PacedAdapter {
    /// Wrap `inner` behind `limiter`.
    pub fn new(inner: Arc<dyn MarketAdapter>, limiter: Arc<RateLimiter>) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl MarketAdapter for PacedAdapter {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn vendor(&self) -> &'static str {
        self.inner.vendor()
    }

    fn supports_category(&self, category: Category) -> bool {
        self.inner.supports_category(category)
    }

    async fn list_refs(
        &self,
        category: Category,
        cursor: Option<&Cursor>,
        page_size: usize,
    ) -> Result<RefPage, MercatoError> {
        if !self.inner.supports_category(category) {
            return Ok(RefPage::empty());
        }
        self.limiter.acquire().await;
        self.inner.list_refs(category, cursor, page_size).await
    }

    async fn fetch_snapshots(
        &self,
        refs: &[InstrumentRef],
        hours_window: u32,
    ) -> Result<Vec<InstrumentSnapshot>, MercatoError> {
        if refs.is_empty() {
            return Ok(Vec::new());
        }
        self.limiter.acquire().await;
        self.inner.fetch_snapshots(refs, hours_window).await
    }

    async fn expected_count(&self, category: Category) -> Result<Option<usize>, MercatoError> {
        self.limiter.acquire().await;
        self.inner.expected_count(category).await
    }
}

/// Declarative wrapper that applies pacing when building an adapter stack.
pub struct RateLimitMiddleware {
    limiter: Arc<RateLimiter>,
}

impl RateLimitMiddleware {
    /// Middleware with its own limiter.
    #[must_use]
    pub fn new(cfg: RateLimitConfig) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::new(cfg)),
        }
    }

    /// Middleware sharing an existing limiter, e.g. one from a registry.
    #[must_use]
    pub const fn shared(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl Middleware for RateLimitMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn MarketAdapter>) -> Arc<dyn MarketAdapter> {
        Arc::new(PacedAdapter::new(inner, self.limiter))
    }

    fn name(&self) -> &'static str {
        "RateLimitMiddleware"
    }

    fn config_json(&self) -> serde_json::Value {
        json!({
            "interval_ms": u64::try_from(self.limiter.interval().as_millis()).unwrap_or(u64::MAX),
        })
    }
}
