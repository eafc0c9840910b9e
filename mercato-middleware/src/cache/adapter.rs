use std::sync::Arc;

use async_trait::async_trait;
use mercato_core::{Cursor, MarketAdapter, Middleware, RefPage};
use mercato_types::{CacheKind, Category, InstrumentRef, InstrumentSnapshot, MercatoError};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::CacheManager;

#[derive(Serialize, Deserialize)]
struct CachedPage {
    refs: Vec<InstrumentRef>,
    next: Option<Cursor>,
}

/// Adapter wrapper that serves listing pages and per-symbol snapshots from a
/// shared [`CacheManager`].
///
/// Listing pages are keyed by (provider, category, offset, page size) and use
/// the instrument-list TTL. Snapshots are keyed by (provider, symbol,
/// category) and use the market-data TTL; only the symbols that miss are
/// forwarded to the inner adapter. Errors are never cached.
pub struct CachingAdapter {
    inner: Arc<dyn MarketAdapter>,
    cache: Arc<CacheManager>,
}

impl CachingAdapter {
    /// Wrap `inner`.
    pub fn new(inner: Arc<dyn MarketAdapter>, cache: Arc<CacheManager>) -> Self {
        Self { inner, cache }
    }

    /// Wrapped adapter.
    pub fn inner(&self) -> &Arc<dyn MarketAdapter> {
        &self.inner
    }

    fn page_key(&self, category: Category, cursor: Option<&Cursor>, page_size: usize) -> String {
        let offset = cursor.map_or(0, |c| c.offset_for(self.inner.name(), category, page_size));
        let offset = format!("offset={offset}");
        let limit = format!("limit={page_size}");
        self.cache.key(
            CacheKind::InstrumentList,
            &[self.inner.name(), category.as_str(), offset.as_str(), limit.as_str()],
        )
    }
}

#[async_trait]
impl MarketAdapter for CachingAdapter {
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
        let key = self.page_key(category, cursor, page_size);
        if let Some(hit) = self.cache.get_json::<CachedPage>(&key).await {
            return Ok(RefPage::new(hit.refs, hit.next));
        }
        let page = self.inner.list_refs(category, cursor, page_size).await?;
        // Incomplete listings are refetched next time.
        if page.is_partial() {
            return Ok(page);
        }
        let cached = CachedPage {
            refs: page.refs.clone(),
            next: page.next_cursor.clone(),
        };
        self.cache
            .put_json(CacheKind::InstrumentList, &key, &cached)
            .await;
        Ok(page)
    }

    async fn fetch_snapshots(
        &self,
        refs: &[InstrumentRef],
        hours_window: u32,
    ) -> Result<Vec<InstrumentSnapshot>, MercatoError> {
        let provider = self.inner.name();
        let mut hits: Vec<Option<InstrumentSnapshot>> = Vec::with_capacity(refs.len());
        let mut missing: Vec<InstrumentRef> = Vec::new();
        for r in refs {
            let cached = self.cache.market_data(provider, &r.symbol, r.category).await;
            if cached.is_none() {
                missing.push(r.clone());
            }
            hits.push(cached);
        }

        let fetched = if missing.is_empty() {
            Vec::new()
        } else {
            self.inner.fetch_snapshots(&missing, hours_window).await?
        };
        for snap in &fetched {
            self.cache.put_market_data(snap).await;
        }

        // Reassemble in the order of `refs`.
        let mut out = Vec::with_capacity(refs.len());
        let mut fetched = fetched.into_iter().peekable();
        for (r, hit) in refs.iter().zip(hits) {
            match hit {
                Some(s) => out.push(s),
                None => {
                    if let Some(s) = fetched.next_if(|s| s.symbol == r.symbol) {
                        out.push(s);
                    }
                }
            }
        }
        out.extend(fetched);
        Ok(out)
    }

    async fn expected_count(&self, category: Category) -> Result<Option<usize>, MercatoError> {
        self.inner.expected_count(category).await
    }
}

/// Declarative wrapper that applies caching when building an adapter stack.
pub struct CacheMiddleware {
    cache: Arc<CacheManager>,
}

impl CacheMiddleware {
    /// Middleware sharing `cache` across every adapter it wraps.
    #[must_use]
    pub const fn new(cache: Arc<CacheManager>) -> Self {
        Self { cache }
    }
}

impl Middleware for CacheMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn MarketAdapter>) -> Arc<dyn MarketAdapter> {
        let Self { cache } = *self;
        Arc::new(CachingAdapter::new(inner, cache))
    }

    fn name(&self) -> &'static str {
        "CacheMiddleware"
    }

    fn config_json(&self) -> serde_json::Value {
        json!({
            "backend": self.cache.backend().kind(),
            "market_data_ttl_s": self.cache.ttl(CacheKind::MarketData).as_secs(),
            "instrument_list_ttl_s": self.cache.ttl(CacheKind::InstrumentList).as_secs(),
        })
    }
}
