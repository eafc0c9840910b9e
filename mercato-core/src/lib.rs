//! mercato-core
//!
//! Contracts and pure algorithms shared across the mercato workspace.
//!
//! - `adapter`: the `MarketAdapter` trait every data source implements.
//! - `middleware`: the `Middleware` trait for adapter wrappers.
//! - `transport`: the HTTP seam used by network-backed adapters.
//! - `pagination`: opaque cursors and offset slicing.
//! - `validate`: snapshot plausibility checks and value sanitizers.
//! - `dedupe`: priority-based collapsing of duplicate symbols.
//!
//! Everything outside `adapter` and `transport` is synchronous and free of I/O,
//! so it can be tested without a runtime.
#![warn(missing_docs)]

/// Provider adapter contract.
pub mod adapter;
/// Deduplication by provider priority.
pub mod dedupe;
/// Middleware trait implemented by adapter wrappers.
pub mod middleware;
/// Cursor encoding and page slicing.
pub mod pagination;
/// Outbound HTTP seam.
pub mod transport;
/// Plausibility checks and sanitizers.
pub mod validate;

pub use adapter::{MarketAdapter, RefPage};
pub use dedupe::{PriorityTable, dedupe};
pub use middleware::Middleware;
pub use pagination::{AggregateCursor, Cursor, UnitCursor, paginate};
pub use transport::{HttpRequest, HttpResponse, HttpTransport};
pub use validate::{Rejection, Validator, normalize_symbol, sanitize_percent, sanitize_price};

pub use mercato_types::*;
