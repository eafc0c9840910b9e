//! Opaque continuation tokens.
//!
//! A cursor is urlsafe base64 over a small JSON object. Decoding never fails
//! loudly: anything that is not a well-formed token decodes to `None`, and a
//! token issued for another (provider, category, page size) resolves to
//! offset 0.

use base64::Engine;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use mercato_types::Category;

fn encode_json<T: Serialize>(value: &T) -> String {
    // Serializing these plain structs cannot fail.
    let json = serde_json::to_vec(value).unwrap_or_default();
    URL_SAFE.encode(json)
}

fn decode_json<T: DeserializeOwned>(token: &str) -> Option<T> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    let bytes = URL_SAFE
        .decode(token)
        .or_else(|_| URL_SAFE_NO_PAD.decode(token.trim_end_matches('=')))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Continuation token for one (provider, category) listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Provider the cursor was issued by.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Category the cursor was issued for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Offset of the first element of the next page.
    pub offset: usize,
    /// Page size the cursor was issued for.
    #[serde(rename = "limit")]
    pub page_size: usize,
}

impl Cursor {
    /// Cursor bound to a provider and category.
    pub fn new(provider: impl Into<String>, category: Category, offset: usize, page_size: usize) -> Self {
        Self {
            provider: Some(provider.into()),
            category: Some(category),
            offset,
            page_size,
        }
    }

    /// Context-free cursor; it only carries an offset and a page size.
    #[must_use]
    pub const fn bare(offset: usize, page_size: usize) -> Self {
        Self {
            provider: None,
            category: None,
            offset,
            page_size,
        }
    }

    /// Opaque string form.
    #[must_use]
    pub fn encode(&self) -> String {
        encode_json(self)
    }

    /// Parse an opaque token; malformed input yields `None`.
    #[must_use]
    pub fn decode(token: &str) -> Option<Self> {
        decode_json(token)
    }

    /// Whether the cursor may be used for this listing context.
    ///
    /// Missing provider or category fields match anything; the page size must
    /// always agree.
    #[must_use]
    pub fn matches(&self, provider: &str, category: Category, page_size: usize) -> bool {
        self.page_size == page_size
            && self.provider.as_deref().is_none_or(|p| p == provider)
            && self.category.is_none_or(|c| c == category)
    }

    /// Offset to resume from in this context; 0 when the cursor belongs elsewhere.
    #[must_use]
    pub fn offset_for(&self, provider: &str, category: Category, page_size: usize) -> usize {
        if self.matches(provider, category, page_size) {
            self.offset
        } else {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                provider,
                category = category.as_str(),
                page_size,
                "cursor issued for another context; restarting at offset 0"
            );
            0
        }
    }
}

/// Slice one page out of a stably ordered listing.
///
/// The page starts at the cursor's offset when the cursor belongs to this
/// context, otherwise at 0. `end = start + page_size`; a next cursor is
/// returned iff `end < items.len()`.
#[must_use]
pub fn paginate<T: Clone>(
    items: &[T],
    provider: &str,
    category: Category,
    cursor: Option<&Cursor>,
    page_size: usize,
) -> (Vec<T>, Option<Cursor>) {
    let page_size = page_size.max(1);
    let start = cursor.map_or(0, |c| c.offset_for(provider, category, page_size));
    let total = items.len();
    if start >= total {
        return (Vec::new(), None);
    }
    let end = start.saturating_add(page_size);
    let page = items[start..end.min(total)].to_vec();
    let next = (end < total).then(|| Cursor::new(provider, category, end, page_size));
    (page, next)
}

/// Resume point for one unfinished (provider, category) unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCursor {
    /// Provider name.
    pub provider: String,
    /// Category.
    pub category: Category,
    /// Adapter-issued cursor for the unit's next page.
    pub cursor: Cursor,
}

/// Continuation token for a whole aggregate request.
///
/// Only units that still had pages left are listed; following the token
/// resumes those units and skips the exhausted ones. The token remembers the
/// provider and category selection it was issued for and is only honored by
/// a request with the same selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateCursor {
    /// Provider names of the issuing request, in scheduling order.
    pub providers: Vec<String>,
    /// Categories of the issuing request, in scheduling order.
    pub categories: Vec<Category>,
    /// Page size every unit was issued with.
    pub page_size: usize,
    /// Unfinished units in scheduling order.
    pub units: Vec<UnitCursor>,
}

impl AggregateCursor {
    /// Opaque string form.
    #[must_use]
    pub fn encode(&self) -> String {
        encode_json(self)
    }

    /// Parse an opaque token; malformed input yields `None`.
    #[must_use]
    pub fn decode(token: &str) -> Option<Self> {
        decode_json(token)
    }

    /// Whether the token was issued for this provider and category selection
    /// at this page size.
    #[must_use]
    pub fn issued_for(&self, providers: &[&str], categories: &[Category], page_size: usize) -> bool {
        self.page_size == page_size
            && self.categories == categories
            && self.providers.iter().map(String::as_str).eq(providers.iter().copied())
    }

    /// Cursor for a unit, if it is still pending.
    #[must_use]
    pub fn unit(&self, provider: &str, category: Category) -> Option<&Cursor> {
        self.units
            .iter()
            .find(|u| u.provider == provider && u.category == category)
            .map(|u| &u.cursor)
    }

    /// True when no unit has pages left.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.units.is_empty()
    }
}
