use std::sync::Arc;

use mercato::{AdapterBuilder, CacheManager, Category, MarketAdapter, MercatoError};
use mercato_scrape::{CategorySource, RegexExtractor, ScrapingAdapter};

/// Row pattern used when `MERCATO_DEMOS_ROW_PATTERN` is not set.
const DEFAULT_ROW: &str = r#"<tr[^>]*data-symbol="(?P<symbol>[^"]+)"[^>]*>\s*<td[^>]*>(?P<name>[^<]*)</td>\s*<td[^>]*>(?P<price>[^<]*)</td>\s*<td[^>]*>(?P<change>[^<]*)</td>"#;

/// Whether the demos should stay offline.
#[must_use]
pub fn use_mock() -> bool {
    std::env::var("MERCATO_DEMOS_USE_MOCK").is_ok()
}

/// Adapters for the demos.
///
/// With `MERCATO_DEMOS_USE_MOCK` set (as in CI) two fixture mocks are
/// returned. Otherwise a scraping adapter reads the crypto listing at
/// `MERCATO_DEMOS_CRYPTO_URL`, wrapped with the caching middleware.
///
/// # Errors
/// Returns `InvalidArg` when the live configuration is missing or invalid.
pub fn get_adapters() -> Result<Vec<Arc<dyn MarketAdapter>>, MercatoError> {
    if use_mock() {
        println!("--- (Using mock adapters for CI) ---");
        let primary: Arc<dyn MarketAdapter> = Arc::new(mercato_mock::MockAdapter::new());
        let backup: Arc<dyn MarketAdapter> = Arc::new(
            mercato_mock::MockAdapter::new()
                .named("mock-backup")
                .only(&[Category::Crypto]),
        );
        return Ok(vec![primary, backup]);
    }

    let url = std::env::var("MERCATO_DEMOS_CRYPTO_URL").map_err(|_| {
        MercatoError::InvalidArg(
            "set MERCATO_DEMOS_CRYPTO_URL or MERCATO_DEMOS_USE_MOCK=1".into(),
        )
    })?;
    let row = std::env::var("MERCATO_DEMOS_ROW_PATTERN").unwrap_or_else(|_| DEFAULT_ROW.into());
    let raw = ScrapingAdapter::builder("scrape")
        .vendor("Listing page")
        .extractor(Arc::new(RegexExtractor::new(&row)?.with_currency("USD")))
        .source(Category::Crypto, CategorySource::new(&url)?)
        .build()?;
    let adapter = AdapterBuilder::new(Arc::new(raw))
        .with_cache(Arc::new(CacheManager::default()))
        .build();
    Ok(vec![adapter])
}
