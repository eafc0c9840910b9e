use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mercato_core::{
    Category, Cursor, HttpTransport, InstrumentRef, InstrumentSnapshot, MarketAdapter,
    MercatoError, RateLimitConfig, RefPage, normalize_symbol, paginate,
};
use mercato_middleware::{CacheManager, Fetcher, RateLimiter, RetryPolicy};
use serde_json::json;

use crate::{CategorySource, Extractor, ReqwestTransport};

/// Every reference a category's raw pages yielded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    /// Normalized, deduplicated references in the adapter's stable order.
    pub refs: Vec<InstrumentRef>,
    /// Why the walk over raw pages stopped before the source ran out.
    pub truncated: Option<String>,
}

/// Adapter over sources that publish instrument tables as paged documents.
///
/// Listing reads every raw page of a category (bounded by the source's
/// `max_raw_pages`), normalizes symbols, drops duplicates, sorts by symbol when
/// the source order is unstable, then slices with the shared cursor protocol.
/// Snapshots reuse the price observed while listing; unpriced references are
/// looked up on the source's quote page when one is configured, otherwise
/// dropped.
pub struct ScrapingAdapter {
    name: &'static str,
    vendor: &'static str,
    fetcher: Fetcher,
    extractor: Arc<dyn Extractor>,
    sources: BTreeMap<Category, CategorySource>,
    cache: Option<Arc<CacheManager>>,
}

impl ScrapingAdapter {
    /// Start configuring an adapter called `name`.
    #[must_use]
    pub fn builder(name: &'static str) -> ScrapingAdapterBuilder {
        ScrapingAdapterBuilder::new(name)
    }

    /// Source configured for `category`.
    #[must_use]
    pub fn source(&self, category: Category) -> Option<&CategorySource> {
        self.sources.get(&category)
    }

    fn normalize(&self, refs: Vec<InstrumentRef>, category: Category) -> Vec<InstrumentRef> {
        refs.into_iter()
            .filter_map(|mut r| {
                r.symbol = normalize_symbol(&r.symbol)?;
                r.category = category;
                Some(r)
            })
            .collect()
    }

    async fn raw_page(
        &self,
        category: Category,
        source: &CategorySource,
        index: usize,
    ) -> Result<Vec<InstrumentRef>, MercatoError> {
        let page = index.to_string();
        if let Some(cache) = &self.cache
            && let Some(hit) = cache.instrument_list(self.name, category, &page).await
        {
            return Ok(hit);
        }
        let doc = self.fetcher.get_text(&source.page_url(index)).await?;
        let refs = self.normalize(self.extractor.extract_refs(&doc, category), category);
        if let Some(cache) = &self.cache
            && !refs.is_empty()
        {
            cache
                .put_instrument_list(self.name, category, &page, &refs)
                .await;
        }
        Ok(refs)
    }

    /// Full listing of `category` in the adapter's stable order.
    ///
    /// # Errors
    /// Fails when the first raw page cannot be fetched. A later page that
    /// fails ends the listing early and is reported in [`Listing::truncated`].
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "mercato_scrape::listing",
            skip(self),
            fields(provider = self.name, category = category.as_str()),
        )
    )]
    pub async fn listing(&self, category: Category) -> Result<Listing, MercatoError> {
        let Some(source) = self.sources.get(&category) else {
            return Ok(Listing::default());
        };
        let mut all: Vec<InstrumentRef> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut truncated = None;
        for index in 0..source.max_raw_pages() {
            let refs = match self.raw_page(category, source, index).await {
                Ok(refs) => refs,
                Err(e) if index == 0 => return Err(e),
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(index, error = %e, "raw page failed; listing truncated");
                    truncated = Some(format!("listing truncated at raw page {index}: {e}"));
                    break;
                }
            };
            let before = all.len();
            for r in refs {
                if seen.insert(r.symbol.clone()) {
                    all.push(r);
                }
            }
            // An empty page or a repeat of known rows means the source ran out.
            if all.len() == before {
                break;
            }
        }
        if !source.is_stable() {
            all.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        }
        Ok(Listing {
            refs: all,
            truncated,
        })
    }

    async fn price_for(&self, source: &CategorySource, r: &InstrumentRef) -> Option<(f64, Option<f64>)> {
        if let Some(price) = r.price {
            return Some((price, r.change_24h_pct));
        }
        let url = source.quote_url(&r.symbol)?;
        let doc = self.fetcher.get_text_soft(&url).await?;
        self.extractor.extract_quote(&doc, r)
    }
}

#[async_trait]
impl MarketAdapter for ScrapingAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn vendor(&self) -> &'static str {
        self.vendor
    }

    fn supports_category(&self, category: Category) -> bool {
        self.sources.contains_key(&category)
    }

    async fn list_refs(
        &self,
        category: Category,
        cursor: Option<&Cursor>,
        page_size: usize,
    ) -> Result<RefPage, MercatoError> {
        if !self.supports_category(category) {
            return Ok(RefPage::empty());
        }
        let listing = self.listing(category).await?;
        let (refs, next_cursor) = paginate(&listing.refs, self.name, category, cursor, page_size);
        let page = RefPage::new(refs, next_cursor);
        Ok(match listing.truncated {
            Some(reason) => page.truncated(reason),
            None => page,
        })
    }

    async fn fetch_snapshots(
        &self,
        refs: &[InstrumentRef],
        hours_window: u32,
    ) -> Result<Vec<InstrumentSnapshot>, MercatoError> {
        let mut out = Vec::with_capacity(refs.len());
        for r in refs {
            let Some(source) = self.sources.get(&r.category) else {
                continue;
            };
            let Some((price, change)) = self.price_for(source, r).await else {
                continue;
            };
            let mut snap = InstrumentSnapshot::from_ref(self.name, r, price);
            snap.change_24h_pct = change;
            snap.meta.insert("source".into(), json!(self.vendor));
            snap.meta.insert("hours_window".into(), json!(hours_window));
            out.push(snap);
        }
        Ok(out)
    }

    async fn expected_count(&self, category: Category) -> Result<Option<usize>, MercatoError> {
        let Some(source) = self.sources.get(&category) else {
            return Ok(None);
        };
        let doc = self.fetcher.get_text(&source.page_url(0)).await?;
        Ok(self.extractor.expected_count(&doc, category))
    }
}

/// Builder for [`ScrapingAdapter`].
pub struct ScrapingAdapterBuilder {
    name: &'static str,
    vendor: &'static str,
    extractor: Option<Arc<dyn Extractor>>,
    sources: BTreeMap<Category, CategorySource>,
    transport: Option<Arc<dyn HttpTransport>>,
    limiter: Option<Arc<RateLimiter>>,
    retry: RetryPolicy,
    cache: Option<Arc<CacheManager>>,
    timeout: Duration,
}

impl ScrapingAdapterBuilder {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            vendor: name,
            extractor: None,
            sources: BTreeMap::new(),
            transport: None,
            limiter: None,
            retry: RetryPolicy::default(),
            cache: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Human-readable vendor label (defaults to the name).
    #[must_use]
    pub const fn vendor(mut self, vendor: &'static str) -> Self {
        self.vendor = vendor;
        self
    }

    /// Extraction strategy shared by every category.
    #[must_use]
    pub fn extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Serve `category` from `source`.
    #[must_use]
    pub fn source(mut self, category: Category, source: CategorySource) -> Self {
        self.sources.insert(category, source);
        self
    }

    /// Transport override; defaults to [`ReqwestTransport`].
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Pace requests with a limiter of its own.
    #[must_use]
    pub fn rate_limit(mut self, cfg: RateLimitConfig) -> Self {
        self.limiter = Some(Arc::new(RateLimiter::new(cfg)));
        self
    }

    /// Pace requests with a shared limiter, e.g. from a `RateLimiterRegistry`.
    #[must_use]
    pub fn limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Retry policy for every raw page and quote request.
    #[must_use]
    pub const fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Cache raw listing pages under the instrument-list TTL.
    #[must_use]
    pub fn cache(mut self, cache: Arc<CacheManager>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Per-attempt request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Finish configuration.
    ///
    /// # Errors
    /// Returns `InvalidArg` without an extractor or without any source, and a
    /// transport error if the default HTTP client cannot be created.
    pub fn build(self) -> Result<ScrapingAdapter, MercatoError> {
        let extractor = self
            .extractor
            .ok_or_else(|| MercatoError::InvalidArg(format!("{}: no extractor configured", self.name)))?;
        if self.sources.is_empty() {
            return Err(MercatoError::InvalidArg(format!(
                "{}: no category sources configured",
                self.name
            )));
        }
        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(t) => t,
            None => Arc::new(
                ReqwestTransport::new().map_err(|e| MercatoError::transport(self.name, e))?,
            ),
        };
        let limiter = self
            .limiter
            .unwrap_or_else(|| Arc::new(RateLimiter::new(RateLimitConfig::default())));
        let fetcher = Fetcher::new(self.name, transport, limiter, self.retry).timeout(self.timeout);
        Ok(ScrapingAdapter {
            name: self.name,
            vendor: self.vendor,
            fetcher,
            extractor,
            sources: self.sources,
            cache: self.cache,
        })
    }
}
