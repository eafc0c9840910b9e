//! Deterministic adapters for tests and examples.
#![warn(missing_docs)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mercato_core::{
    Category, Cursor, InstrumentRef, InstrumentSnapshot, MarketAdapter, MercatoError, RefPage,
    paginate,
};
use serde_json::json;

mod dynamic;
mod fixtures;

pub use dynamic::{DynamicMockAdapter, DynamicMockController, MockBehavior};

/// Fixture-backed adapter for CI-safe tests and examples.
///
/// Lists a fixed table per category in a stable order and builds snapshots
/// from the listed prices. Every knob is opt-in; `MockAdapter::new()` behaves
/// like a healthy provider named `mock` supporting all categories.
pub struct MockAdapter {
    name: &'static str,
    supported: BTreeSet<Category>,
    overrides: BTreeMap<Category, Vec<InstrumentRef>>,
    delay: Duration,
    failure: Option<String>,
    list_calls: Arc<AtomicUsize>,
    fetch_calls: Arc<AtomicUsize>,
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAdapter {
    /// Healthy adapter named `mock` over the built-in fixtures.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "mock",
            supported: Category::ALL.into_iter().collect(),
            overrides: BTreeMap::new(),
            delay: Duration::ZERO,
            failure: None,
            list_calls: Arc::new(AtomicUsize::new(0)),
            fetch_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Rename the adapter, e.g. to register two mocks side by side.
    #[must_use]
    pub const fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Restrict the supported categories.
    #[must_use]
    pub fn only(mut self, categories: &[Category]) -> Self {
        self.supported = categories.iter().copied().collect();
        self
    }

    /// Replace the listing of `category` with `refs`.
    #[must_use]
    pub fn with_refs(mut self, category: Category, refs: Vec<InstrumentRef>) -> Self {
        self.supported.insert(category);
        self.overrides.insert(category, refs);
        self
    }

    /// Sleep for `delay` before answering each call.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail every call with a connector error carrying `msg`.
    #[must_use]
    pub fn failing(mut self, msg: impl Into<String>) -> Self {
        self.failure = Some(msg.into());
        self
    }

    /// Number of `list_refs` calls answered so far.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::Relaxed)
    }

    /// Number of `fetch_snapshots` calls answered so far.
    #[must_use]
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::Relaxed)
    }

    /// Full listing of `category`, in listing order.
    #[must_use]
    pub fn listing(&self, category: Category) -> Vec<InstrumentRef> {
        if !self.supported.contains(&category) {
            return Vec::new();
        }
        self.overrides
            .get(&category)
            .cloned()
            .unwrap_or_else(|| fixtures::refs(category))
    }

    async fn pause_or_fail(&self, capability: &str) -> Result<(), MercatoError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.failure {
            Some(msg) => Err(MercatoError::connector(
                self.name,
                format!("{capability}: {msg}"),
            )),
            None => Ok(()),
        }
    }

    fn snapshot(&self, r: &InstrumentRef, hours_window: u32) -> Option<InstrumentSnapshot> {
        let price = r.price?;
        let mut snap = InstrumentSnapshot::from_ref(self.name, r, price);
        snap.meta.insert("source".into(), json!(self.name));
        snap.meta
            .insert("hours_window".into(), json!(hours_window));
        if let Some(f) = fixtures::by_symbol(r.category, &r.symbol) {
            snap.meta.insert("volume".into(), json!(f.volume));
            if let Some(cap) = f.market_cap {
                snap.meta.insert("market_cap".into(), json!(cap));
            }
        }
        Some(snap)
    }
}

#[async_trait]
impl MarketAdapter for MockAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn vendor(&self) -> &'static str {
        "Mock"
    }

    fn supports_category(&self, category: Category) -> bool {
        self.supported.contains(&category)
    }

    async fn list_refs(
        &self,
        category: Category,
        cursor: Option<&Cursor>,
        page_size: usize,
    ) -> Result<RefPage, MercatoError> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        if !self.supports_category(category) {
            return Ok(RefPage::empty());
        }
        self.pause_or_fail("list_refs").await?;
        let all = self.listing(category);
        let (refs, next_cursor) = paginate(&all, self.name, category, cursor, page_size);
        Ok(RefPage::new(refs, next_cursor))
    }

    async fn fetch_snapshots(
        &self,
        refs: &[InstrumentRef],
        hours_window: u32,
    ) -> Result<Vec<InstrumentSnapshot>, MercatoError> {
        self.fetch_calls.fetch_add(1, Ordering::Relaxed);
        self.pause_or_fail("fetch_snapshots").await?;
        Ok(refs
            .iter()
            .filter_map(|r| self.snapshot(r, hours_window))
            .collect())
    }

    async fn expected_count(&self, category: Category) -> Result<Option<usize>, MercatoError> {
        if !self.supports_category(category) {
            return Ok(None);
        }
        self.pause_or_fail("expected_count").await?;
        Ok(Some(self.listing(category).len()))
    }
}
