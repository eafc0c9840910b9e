use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::MercatoError;

/// Asset class an instrument belongs to.
///
/// Categories drive adapter support checks, validation ranges and the
/// fan-out grid of an aggregate request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Currency pairs.
    Forex,
    /// Listed equities.
    Stocks,
    /// Crypto assets quoted against USD.
    Crypto,
    /// Market indices.
    Indices,
    /// Commodity futures.
    Commodities,
}

impl Category {
    /// Every category in canonical order.
    pub const ALL: [Self; 5] = [
        Self::Forex,
        Self::Stocks,
        Self::Crypto,
        Self::Indices,
        Self::Commodities,
    ];

    /// Stable, lowercase identifier used in cursors, cache keys and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forex => "forex",
            Self::Stocks => "stocks",
            Self::Crypto => "crypto",
            Self::Indices => "indices",
            Self::Commodities => "commodities",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = MercatoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| MercatoError::InvalidArg(format!("unknown category: {s}")))
    }
}
