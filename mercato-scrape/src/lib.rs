#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod adapter;
mod extract;
mod source;
mod transport;

pub use adapter::{Listing, ScrapingAdapter, ScrapingAdapterBuilder};
pub use extract::{Extractor, RegexExtractor};
pub use source::CategorySource;
pub use transport::{ReqwestTransport, USER_AGENTS, random_user_agent};
