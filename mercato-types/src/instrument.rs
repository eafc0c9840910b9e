use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Category;

/// Free-form snapshot metadata (volume, market cap, source url, ...).
pub type Meta = BTreeMap<String, serde_json::Value>;

/// A provider-local reference to an instrument, as produced by a listing step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentRef {
    /// Provider-local symbol; never empty.
    pub symbol: String,
    /// Category the listing was requested for.
    pub category: Category,
    /// Display name, when the listing shows one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Listing exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    /// Quote currency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Price already observed on the listing page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// 24h change in percent already observed on the listing page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_24h_pct: Option<f64>,
}

impl InstrumentRef {
    /// Build a bare reference carrying only a symbol and a category.
    pub fn new(symbol: impl Into<String>, category: Category) -> Self {
        Self {
            symbol: symbol.into(),
            category,
            name: None,
            exchange: None,
            currency: None,
            price: None,
            change_24h_pct: None,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the listing exchange.
    #[must_use]
    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = Some(exchange.into());
        self
    }

    /// Set the quote currency.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// Attach an observed price and optional 24h change.
    #[must_use]
    pub const fn with_price(mut self, price: f64, change_24h_pct: Option<f64>) -> Self {
        self.price = Some(price);
        self.change_24h_pct = change_24h_pct;
        self
    }
}

/// A point-in-time price snapshot for one instrument from one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSnapshot {
    /// Name of the adapter that produced the snapshot.
    pub provider: String,
    /// Asset category.
    pub category: Category,
    /// Symbol as listed by the provider.
    pub symbol: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Listing exchange.
    #[serde(default)]
    pub exchange: Option<String>,
    /// Quote currency.
    #[serde(default)]
    pub currency: Option<String>,
    /// Last price.
    pub price: f64,
    /// Change over 24 hours in percent.
    #[serde(default)]
    pub change_24h_pct: Option<f64>,
    /// Change over one hour in percent.
    #[serde(default)]
    pub change_1h_pct: Option<f64>,
    /// Capture time.
    pub ts: DateTime<Utc>,
    /// Provider-specific extras.
    #[serde(default)]
    pub meta: Meta,
}

impl InstrumentSnapshot {
    /// Build a snapshot from a listing reference and a fetched price.
    ///
    /// Descriptive fields are carried over from the reference.
    pub fn from_ref(provider: impl Into<String>, r: &InstrumentRef, price: f64) -> Self {
        Self {
            provider: provider.into(),
            category: r.category,
            symbol: r.symbol.clone(),
            name: r.name.clone(),
            exchange: r.exchange.clone(),
            currency: r.currency.clone(),
            price,
            change_24h_pct: r.change_24h_pct,
            change_1h_pct: None,
            ts: Utc::now(),
            meta: Meta::new(),
        }
    }

    /// Numeric metadata value, if present.
    #[must_use]
    pub fn meta_f64(&self, key: &str) -> Option<f64> {
        self.meta.get(key).and_then(serde_json::Value::as_f64)
    }
}
