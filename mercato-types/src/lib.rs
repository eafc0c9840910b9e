//! Mercato data transfer objects, configuration primitives and errors.
#![warn(missing_docs)]

mod cache;
mod category;
mod config;
mod error;
mod instrument;
mod provider;
mod reports;

pub use cache::CacheKind;
pub use category::Category;
pub use config::{
    CacheTtlConfig, MercatoConfig, PriceRange, RateLimitConfig, RetryConfig, ValidationConfig,
};
pub use error::{MercatoError, TransportError};
pub use instrument::{InstrumentRef, InstrumentSnapshot, Meta};
pub use provider::{ProviderStatus, StatusKind};
pub use reports::{
    AggregateMeta, AggregateResponse, CategoryVerification, SampleCheck, VerifyReport,
    VerifyStatus,
};
