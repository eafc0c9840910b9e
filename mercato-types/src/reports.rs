use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Category, InstrumentSnapshot, ProviderStatus};

/// Metadata block returned with every aggregate response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMeta {
    /// When the response was assembled.
    pub timestamp: DateTime<Utc>,
    /// Providers that took part, in request order.
    pub providers: Vec<String>,
    /// Categories that took part, in request order.
    pub categories: Vec<Category>,
    /// Page size used for every unit.
    pub page_size: usize,
    /// Hours window passed to the snapshot step.
    pub hours_window: u32,
    /// Per-provider outcome.
    pub status: BTreeMap<String, ProviderStatus>,
    /// Continuation token, absent once every unit is exhausted.
    pub next_cursor: Option<String>,
}

/// Metadata plus the merged snapshot list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResponse {
    /// Request metadata and per-provider status.
    pub meta: AggregateMeta,
    /// Validated (and optionally deduplicated) snapshots.
    pub data: Vec<InstrumentSnapshot>,
}

impl AggregateResponse {
    /// Returns true when no snapshot survived.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Outcome of an integrity walk over one (provider, category).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyStatus {
    /// Walk count equals the expected hint.
    Match,
    /// Walk count differs from the expected hint.
    Mismatch,
    /// The walk hit the element cap before exhausting the listing.
    Truncated,
    /// The adapter exposes no expected count; only the walk count is known.
    Unverified,
    /// The walk failed.
    Error,
}

/// Recomputed-value check for one sampled instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleCheck {
    /// Sampled symbol.
    pub symbol: String,
    /// Price shown on the listing page, if any.
    pub listed_price: Option<f64>,
    /// Price returned by the snapshot step, if any.
    pub snapshot_price: Option<f64>,
    /// Whether the snapshot passed validation.
    pub valid: bool,
    /// Whether listed and snapshot prices agree.
    pub consistent: bool,
}

/// Integrity report for one (provider, category).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryVerification {
    /// Provider that was walked.
    pub provider: String,
    /// Category that was walked.
    pub category: Category,
    /// Independently observed row count, when the adapter exposes one.
    pub expected_count: Option<usize>,
    /// Elements seen while walking every page.
    pub scraped_count: usize,
    /// Comparison outcome.
    pub status: VerifyStatus,
    /// Failure message when `status` is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Wall time of the walk.
    pub latency_ms: u64,
    /// Small sample of recomputed-value checks.
    pub samples: Vec<SampleCheck>,
}

/// Result of a verification run across providers and categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// When the run finished.
    pub timestamp: DateTime<Utc>,
    /// One entry per walked (provider, category).
    pub results: Vec<CategoryVerification>,
}
