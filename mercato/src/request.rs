use std::collections::HashSet;
use std::sync::Arc;

use mercato_core::{AggregateCursor, Category, Cursor, MarketAdapter, MercatoError};
use serde::{Deserialize, Serialize};

use crate::Mercato;

/// Keyword selecting every registered provider or every category.
const ALL: &str = "all";

/// Parameters of one aggregate call.
///
/// Every field is optional. Empty provider or category lists (or the
/// keyword `"all"`) select everything; unset numbers fall back to the
/// orchestrator's `MercatoConfig`. Nothing is checked until the request
/// reaches [`Mercato::aggregate`], which rejects bad input before any
/// adapter is called.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRequest {
    /// Provider names; empty means all.
    #[serde(default)]
    pub providers: Vec<String>,
    /// Category names; empty means all.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Elements per unit page.
    #[serde(default)]
    pub page_size: Option<usize>,
    /// Continuation token from a previous response.
    #[serde(default)]
    pub cursor: Option<String>,
    /// Hours window handed to the snapshot step.
    #[serde(default)]
    pub hours_window: Option<u32>,
    /// Concurrent units.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    /// Collapse duplicate symbols.
    #[serde(default)]
    pub dedupe: Option<bool>,
    /// Skip the response cache for this call.
    #[serde(default)]
    pub no_cache: bool,
}

impl AggregateRequest {
    /// Request everything with configured defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider by name.
    #[must_use]
    pub fn provider(mut self, name: impl Into<String>) -> Self {
        self.providers.push(name.into());
        self
    }

    /// Add a category.
    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.categories.push(category.as_str().to_string());
        self
    }

    /// Add a category by name; unknown names are rejected by `aggregate`.
    #[must_use]
    pub fn category_name(mut self, name: impl Into<String>) -> Self {
        self.categories.push(name.into());
        self
    }

    /// Set the page size.
    #[must_use]
    pub const fn page_size(mut self, n: usize) -> Self {
        self.page_size = Some(n);
        self
    }

    /// Resume from a previous response's `next_cursor`.
    #[must_use]
    pub fn cursor(mut self, token: impl Into<String>) -> Self {
        self.cursor = Some(token.into());
        self
    }

    /// Set the hours window.
    #[must_use]
    pub const fn hours_window(mut self, hours: u32) -> Self {
        self.hours_window = Some(hours);
        self
    }

    /// Set the number of concurrent units.
    #[must_use]
    pub const fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = Some(n);
        self
    }

    /// Toggle duplicate collapsing.
    #[must_use]
    pub const fn dedupe(mut self, yes: bool) -> Self {
        self.dedupe = Some(yes);
        self
    }

    /// Bypass the response cache.
    #[must_use]
    pub const fn no_cache(mut self, yes: bool) -> Self {
        self.no_cache = yes;
        self
    }
}

/// Where each unit starts reading.
#[derive(Debug, Clone)]
pub(crate) enum Resume {
    /// Every unit starts at offset 0.
    Start,
    /// One plain cursor offered to every unit; units it does not fit restart.
    Flat(Cursor),
    /// Only the listed units are pending.
    Units(AggregateCursor),
}

impl Resume {
    fn from_token(
        token: Option<&str>,
        providers: &[&str],
        categories: &[Category],
        page_size: usize,
    ) -> Self {
        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            return Self::Start;
        };
        if let Some(agg) = AggregateCursor::decode(token) {
            if agg.issued_for(providers, categories, page_size) {
                return Self::Units(agg);
            }
            #[cfg(feature = "tracing")]
            tracing::warn!(
                issued_page_size = agg.page_size,
                page_size,
                "cursor issued for another request; restarting at offset 0"
            );
            return Self::Start;
        }
        if let Some(c) = Cursor::decode(token) {
            return Self::Flat(c);
        }
        #[cfg(feature = "tracing")]
        tracing::warn!("undecodable cursor; restarting at offset 0");
        Self::Start
    }

    /// `None` when the unit has no pages left; otherwise its starting cursor.
    pub(crate) fn for_unit(&self, provider: &str, category: Category) -> Option<Option<Cursor>> {
        match self {
            Self::Start => Some(None),
            Self::Flat(c) => Some(Some(c.clone())),
            Self::Units(agg) => agg.unit(provider, category).map(|c| Some(c.clone())),
        }
    }
}

/// A request after boundary validation.
pub(crate) struct Plan {
    pub providers: Vec<Arc<dyn MarketAdapter>>,
    pub categories: Vec<Category>,
    pub page_size: usize,
    pub hours_window: u32,
    pub concurrency: usize,
    pub dedupe: bool,
    pub resume: Resume,
}

fn selects_all(names: &[String]) -> bool {
    names.is_empty() || names.iter().any(|n| n.trim().eq_ignore_ascii_case(ALL))
}

impl Mercato {
    /// Validate `req` against the configuration and registered adapters.
    pub(crate) fn plan(&self, req: &AggregateRequest) -> Result<Plan, MercatoError> {
        let cfg = &self.cfg;

        let page_size = req.page_size.unwrap_or(cfg.default_page_size);
        if page_size == 0 || page_size > cfg.max_page_size {
            return Err(MercatoError::InvalidArg(format!(
                "page_size must be within 1..={}, got {page_size}",
                cfg.max_page_size
            )));
        }

        let concurrency = req.max_concurrency.unwrap_or(cfg.max_concurrency);
        if concurrency == 0 || concurrency > cfg.hard_max_concurrency {
            return Err(MercatoError::InvalidArg(format!(
                "max_concurrency must be within 1..={}, got {concurrency}",
                cfg.hard_max_concurrency
            )));
        }

        let hours_window = req.hours_window.unwrap_or(cfg.default_hours_window);
        if hours_window == 0 {
            return Err(MercatoError::InvalidArg(
                "hours_window must be at least 1".to_string(),
            ));
        }

        let providers = if selects_all(&req.providers) {
            self.adapters.clone()
        } else {
            let mut seen: HashSet<&str> = HashSet::new();
            let mut out = Vec::new();
            for raw in &req.providers {
                let name = raw.trim();
                let adapter = self
                    .adapter(name)
                    .ok_or_else(|| MercatoError::InvalidArg(format!("unknown provider '{name}'")))?;
                if seen.insert(adapter.name()) {
                    out.push(Arc::clone(adapter));
                }
            }
            out
        };

        let categories = if selects_all(&req.categories) {
            Category::ALL.to_vec()
        } else {
            let mut out: Vec<Category> = Vec::new();
            for raw in &req.categories {
                let c: Category = raw.parse()?;
                if !out.contains(&c) {
                    out.push(c);
                }
            }
            out
        };

        let names: Vec<&str> = providers.iter().map(|a| a.name()).collect();
        let resume = Resume::from_token(req.cursor.as_deref(), &names, &categories, page_size);

        Ok(Plan {
            providers,
            categories,
            page_size,
            hours_window,
            concurrency,
            dedupe: req.dedupe.unwrap_or(cfg.dedupe_by_default),
            resume,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mercato_core::UnitCursor;

    #[test]
    fn empty_or_garbage_tokens_start_over() {
        let crypto = [Category::Crypto];
        assert!(matches!(Resume::from_token(None, &["mock"], &crypto, 2), Resume::Start));
        assert!(matches!(Resume::from_token(Some("  "), &["mock"], &crypto, 2), Resume::Start));
        assert!(matches!(Resume::from_token(Some("%%%"), &["mock"], &crypto, 2), Resume::Start));
    }

    #[test]
    fn aggregate_tokens_pin_pending_units() {
        let agg = AggregateCursor {
            providers: vec!["mock".into()],
            categories: vec![Category::Stocks, Category::Crypto],
            page_size: 2,
            units: vec![UnitCursor {
                provider: "mock".into(),
                category: Category::Crypto,
                cursor: Cursor::new("mock", Category::Crypto, 2, 2),
            }],
        };
        let both = [Category::Stocks, Category::Crypto];
        let resume = Resume::from_token(Some(&agg.encode()), &["mock"], &both, 2);
        let pending = resume.for_unit("mock", Category::Crypto).unwrap().unwrap();
        assert_eq!(pending.offset, 2);
        assert!(resume.for_unit("mock", Category::Stocks).is_none());

        let other_size = Resume::from_token(Some(&agg.encode()), &["mock"], &both, 3);
        assert!(matches!(other_size, Resume::Start));
        let other_categories = Resume::from_token(Some(&agg.encode()), &["mock"], &[Category::Stocks], 2);
        assert!(matches!(other_categories, Resume::Start));
        let other_providers = Resume::from_token(Some(&agg.encode()), &["mock", "b"], &both, 2);
        assert!(matches!(other_providers, Resume::Start));
    }

    #[test]
    fn flat_tokens_reach_every_unit() {
        let token = Cursor::bare(4, 2).encode();
        let resume = Resume::from_token(Some(&token), &["any"], &[Category::Forex], 2);
        let c = resume.for_unit("any", Category::Forex).unwrap().unwrap();
        assert_eq!(c.offset, 4);
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let req: AggregateRequest =
            serde_json::from_str(r#"{"categories":["crypto"],"page_size":2}"#).unwrap();
        assert!(req.providers.is_empty());
        assert_eq!(req.page_size, Some(2));
        assert!(!req.no_cache);
        assert_eq!(req.dedupe, None);
    }
}
