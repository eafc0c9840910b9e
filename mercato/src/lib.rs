//! Mercato aggregates instrument price snapshots across multiple providers.
//!
//! Overview
//! - Fans an aggregate request out over every (provider, category) pair of
//!   adapters implementing the `mercato_core` contracts.
//! - Validates snapshots, collapses duplicate symbols by an explicit provider
//!   priority and reports a status per provider.
//! - Hands back one opaque cursor that resumes every unit with pages left.
//!
//! Key behaviors and trade-offs
//! - Concurrency: units share a counting semaphore capped by the configured
//!   hard maximum; lower limits are gentler on rate-limited sources at the
//!   cost of latency.
//! - Isolation: a unit that fails, times out or panics only affects its own
//!   provider's status. A request deadline abandons unfinished units but keeps
//!   what finished.
//! - Dedupe: the priority table is configuration, not a heuristic. Without
//!   one, registration order decides.
//! - Caching: fully healthy responses are cached for the api-response TTL and
//!   provider statuses for the provider-health TTL. Pass `no_cache` to force
//!   fresh data.
//!
//! Examples
//! Building an orchestrator over two adapters with an explicit priority:
//! ```rust,ignore
//! use std::sync::Arc;
//! use mercato::{MarketAdapter, Mercato};
//!
//! let primary: Arc<dyn MarketAdapter> = Arc::new(PrimaryAdapter::new());
//! let backup: Arc<dyn MarketAdapter> = Arc::new(BackupAdapter::new());
//!
//! let mercato = Mercato::builder()
//!     .with_adapter(primary.clone())
//!     .with_adapter(backup.clone())
//!     .dedupe_priority(&[primary, backup])
//!     .request_timeout(std::time::Duration::from_secs(30))
//!     .build()?;
//! ```
//!
//! Walking a category page by page:
//! ```rust,ignore
//! use mercato::{AggregateRequest, Category};
//!
//! let mut cursor: Option<String> = None;
//! loop {
//!     let mut req = AggregateRequest::new().category(Category::Crypto).page_size(100);
//!     if let Some(c) = cursor.take() {
//!         req = req.cursor(c);
//!     }
//!     let resp = mercato.aggregate(req).await?;
//!     // ... consume resp.data ...
//!     match resp.meta.next_cursor {
//!         Some(next) => cursor = Some(next),
//!         None => break,
//!     }
//! }
//! ```
//!
//! Checking listing integrity and provider health:
//! ```rust,ignore
//! let report = mercato.verify(&[Category::Stocks], &[]).await?;
//! for r in &report.results {
//!     println!("{} {}: {:?} ({} rows)", r.provider, r.category, r.status, r.scraped_count);
//! }
//! let health = mercato.health().await;
//! ```
//!
//! See `demos/examples/` for runnable end-to-end demonstrations.
#![warn(missing_docs)]

pub(crate) mod core;
mod request;
mod router;

pub use core::{Mercato, MercatoBuilder};
pub use request::AggregateRequest;
pub use router::util::join_with_deadline;

pub use mercato_middleware::{AdapterBuilder, CacheManager, CacheMiddleware, RateLimitMiddleware};

// Re-export core types for convenience
pub use mercato_core::{
    AggregateCursor,
    AggregateMeta,
    AggregateResponse,
    CacheKind,
    CacheTtlConfig,
    Category,
    CategoryVerification,
    Cursor,
    InstrumentRef,
    InstrumentSnapshot,
    MarketAdapter,
    MercatoConfig,
    MercatoError,
    PriorityTable,
    ProviderStatus,
    RateLimitConfig,
    RefPage,
    RetryConfig,
    SampleCheck,
    StatusKind,
    TransportError,
    ValidationConfig,
    Validator,
    VerifyReport,
    VerifyStatus,
};
