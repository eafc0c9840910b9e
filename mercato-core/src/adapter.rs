use async_trait::async_trait;

use crate::pagination::Cursor;
use mercato_types::{Category, InstrumentRef, InstrumentSnapshot, MercatoError};

/// One page of instrument references plus the continuation for the next one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefPage {
    /// At most `page_size` references, in the adapter's stable order.
    pub refs: Vec<InstrumentRef>,
    /// Present iff more references remain after this page.
    pub next_cursor: Option<Cursor>,
    /// Set when the listing behind this page was cut short upstream; holds the reason.
    pub partial: Option<String>,
}

impl RefPage {
    /// The `(∅, None)` page returned for unsupported categories and exhausted listings.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            refs: Vec::new(),
            next_cursor: None,
            partial: None,
        }
    }

    /// A complete page.
    #[must_use]
    pub const fn new(refs: Vec<InstrumentRef>, next_cursor: Option<Cursor>) -> Self {
        Self {
            refs,
            next_cursor,
            partial: None,
        }
    }

    /// Mark the page as drawn from an incomplete listing.
    #[must_use]
    pub fn truncated(mut self, reason: impl Into<String>) -> Self {
        self.partial = Some(reason.into());
        self
    }

    /// True when the listing behind this page is incomplete.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.partial.is_some()
    }
}

/// Contract every data source implements.
///
/// Adapters are discovered by name and category support, listed page by page
/// through opaque cursors, and asked to turn references into snapshots.
/// Provider-specific failures surface as `Err`; the orchestrator treats them as
/// unit failures and never lets them abort sibling units.
#[async_trait]
pub trait MarketAdapter: Send + Sync {
    /// Stable provider name used in statuses, cursors, cache keys and dedupe priority.
    fn name(&self) -> &'static str;

    /// Human-readable vendor label.
    fn vendor(&self) -> &'static str;

    /// Whether the adapter can list `category`.
    fn supports_category(&self, category: Category) -> bool;

    /// List one page of references for `category`.
    ///
    /// Returns at most `page_size` references and a cursor iff more remain.
    /// Unsupported categories yield [`RefPage::empty`]. Cursors issued for a
    /// different provider, category or page size restart at offset 0. The
    /// underlying order is stable across calls.
    async fn list_refs(
        &self,
        category: Category,
        cursor: Option<&Cursor>,
        page_size: usize,
    ) -> Result<RefPage, MercatoError>;

    /// Turn references into snapshots.
    ///
    /// Never returns a symbol absent from `refs`; references that fail
    /// individually are dropped.
    async fn fetch_snapshots(
        &self,
        refs: &[InstrumentRef],
        hours_window: u32,
    ) -> Result<Vec<InstrumentSnapshot>, MercatoError>;

    /// Independently observed row count for `category`, when the source shows one.
    async fn expected_count(&self, _category: Category) -> Result<Option<usize>, MercatoError> {
        Ok(None)
    }
}
