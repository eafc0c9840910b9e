//! Middleware trait for wrapping `MarketAdapter` implementations.

use std::sync::Arc;

use crate::adapter::MarketAdapter;

/// Trait implemented by adapter middleware layers.
///
/// A middleware consumes an inner adapter and returns a wrapped adapter that
/// augments its behavior (caching, pacing).
pub trait Middleware: Send + Sync {
    /// Wrap `inner` and return the wrapped adapter.
    fn apply(self: Box<Self>, inner: Arc<dyn MarketAdapter>) -> Arc<dyn MarketAdapter>;

    /// Human-readable middleware name for introspection/logging.
    fn name(&self) -> &'static str;

    /// Opaque configuration snapshot for inspection.
    fn config_json(&self) -> serde_json::Value;
}
