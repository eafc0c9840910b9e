//! Builder for composing adapters with middleware layers.
//!
//! Layers form an onion around the raw adapter:
//!
//! ```text
//! Scheduler
//!     ↓
//! Outermost layer (e.g. cache: answers hits without touching anything below)
//!     ↓
//! Inner layer (e.g. pacing: only misses consume rate-limit grants)
//!     ↓
//! Raw adapter
//! ```
//!
//! `layers` is stored outermost-first (the most recently added layer is
//! outermost) and applied in reverse during [`AdapterBuilder::build`].

use std::sync::Arc;

use mercato_core::{MarketAdapter, Middleware};
use mercato_types::RateLimitConfig;
use serde_json::json;

use crate::{CacheManager, CacheMiddleware, RateLimitMiddleware};

/// Generic middleware builder for composing an adapter with layered wrappers.
pub struct AdapterBuilder {
    raw: Arc<dyn MarketAdapter>,
    /// Middleware layers in outermost-first order.
    layers: Vec<Box<dyn Middleware>>,
}

impl AdapterBuilder {
    /// Start from a raw, unwrapped adapter.
    #[must_use]
    pub fn new(raw: Arc<dyn MarketAdapter>) -> Self {
        Self {
            raw,
            layers: Vec::new(),
        }
    }

    /// Add or replace the cache layer at the outermost position.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<CacheManager>) -> Self {
        self.layers.retain(|m| m.name() != "CacheMiddleware");
        self.layers.insert(0, Box::new(CacheMiddleware::new(cache)));
        self
    }

    /// Remove the cache layer if present.
    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.layers.retain(|m| m.name() != "CacheMiddleware");
        self
    }

    /// Add or replace the pacing layer at the outermost position.
    #[must_use]
    pub fn with_rate_limit(mut self, cfg: RateLimitConfig) -> Self {
        self.layers.retain(|m| m.name() != "RateLimitMiddleware");
        self.layers.insert(0, Box::new(RateLimitMiddleware::new(cfg)));
        self
    }

    /// Add an arbitrary middleware layer at the outermost position.
    #[must_use]
    pub fn layer(mut self, layer: Box<dyn Middleware>) -> Self {
        self.layers.insert(0, layer);
        self
    }

    /// Layer names and configuration, outermost first, ending with the raw adapter.
    #[must_use]
    pub fn describe(&self) -> Vec<(&'static str, serde_json::Value)> {
        let mut out: Vec<(&'static str, serde_json::Value)> = self
            .layers
            .iter()
            .map(|l| (l.name(), l.config_json()))
            .collect();
        out.push(("RawAdapter", json!({ "name": self.raw.name() })));
        out
    }

    /// Build the wrapped adapter.
    ///
    /// With `layers = [Cache, Pacing]` the result is `Cache(Pacing(Raw))`.
    #[must_use]
    pub fn build(self) -> Arc<dyn MarketAdapter> {
        let mut acc: Arc<dyn MarketAdapter> = Arc::clone(&self.raw);
        for m in self.layers.into_iter().rev() {
            acc = m.apply(acc);
        }
        acc
    }
}
