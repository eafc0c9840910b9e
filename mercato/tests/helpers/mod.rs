// Re-export helpers so tests can `use helpers::*;`
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use mercato::{
    Category, Cursor, InstrumentRef, InstrumentSnapshot, MarketAdapter, Mercato, MercatoError,
    RefPage,
};
use mercato_mock::MockAdapter;

/// Common symbol constants used across tests.
pub const AAPL: &str = "AAPL";
pub const MSFT: &str = "MSFT";
pub const BTC_USD: &str = "BTC-USD";
pub const ETH_USD: &str = "ETH-USD";

/// The five crypto symbols of the mock fixtures, in listing order.
pub const CRYPTO: [&str; 5] = ["BTC-USD", "ETH-USD", "BNB-USD", "ADA-USD", "SOL-USD"];

/// A priced reference.
pub fn priced(symbol: &str, category: Category, price: f64) -> InstrumentRef {
    InstrumentRef::new(symbol, category).with_price(price, None)
}

/// Healthy mock under `name`, restricted to `categories`.
pub fn mock(name: &'static str, categories: &[Category]) -> Arc<MockAdapter> {
    Arc::new(MockAdapter::new().named(name).only(categories))
}

/// Mock under `name` whose every call fails.
pub fn broken(name: &'static str, categories: &[Category]) -> Arc<MockAdapter> {
    Arc::new(
        MockAdapter::new()
            .named(name)
            .only(categories)
            .failing("upstream unavailable"),
    )
}

/// Orchestrator over `adapters` with default configuration.
pub fn mercato_with(adapters: Vec<Arc<dyn MarketAdapter>>) -> Mercato {
    adapters
        .into_iter()
        .fold(Mercato::builder(), |b, a| b.with_adapter(a))
        .build()
        .expect("valid test orchestrator")
}

/// Symbols of a snapshot list, in order.
pub fn symbols(data: &[InstrumentSnapshot]) -> Vec<&str> {
    data.iter().map(|s| s.symbol.as_str()).collect()
}

/// Adapter that panics while listing.
pub struct PanickingAdapter;

#[async_trait]
impl MarketAdapter for PanickingAdapter {
    fn name(&self) -> &'static str {
        "panicky"
    }

    fn vendor(&self) -> &'static str {
        "Panicky"
    }

    fn supports_category(&self, _category: Category) -> bool {
        true
    }

    async fn list_refs(
        &self,
        _category: Category,
        _cursor: Option<&Cursor>,
        _page_size: usize,
    ) -> Result<RefPage, MercatoError> {
        panic!("listing exploded")
    }

    async fn fetch_snapshots(
        &self,
        _refs: &[InstrumentRef],
        _hours_window: u32,
    ) -> Result<Vec<InstrumentSnapshot>, MercatoError> {
        Ok(Vec::new())
    }
}
