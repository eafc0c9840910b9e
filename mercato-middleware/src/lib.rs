#![doc = include_str!("../README.md")]
//! mercato-middleware
//!
//! Re-exports for pacing, retry, caching and adapter wrappers.

mod builder;
mod cache;
mod fetcher;
mod pacing;
mod rate_limit;
mod retry;

pub use crate::builder::AdapterBuilder;
pub use crate::cache::{
    CacheBackend, CacheManager, CacheMiddleware, CacheStats, CachingAdapter, LruBackend,
    MokaBackend,
};
pub use crate::fetcher::Fetcher;
pub use crate::pacing::{PacedAdapter, RateLimitMiddleware};
pub use crate::rate_limit::{RateLimiter, RateLimiterRegistry};
pub use crate::retry::RetryPolicy;
