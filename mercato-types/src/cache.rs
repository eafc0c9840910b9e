use core::fmt;

use serde::{Deserialize, Serialize};

/// Kind of cached data; each kind carries its own TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKind {
    /// Per-symbol snapshot data.
    MarketData,
    /// One listing page of instrument references.
    InstrumentList,
    /// Last known status of a provider.
    ProviderHealth,
    /// A fully merged aggregate response.
    ApiResponse,
}

impl CacheKind {
    /// Every cache kind.
    pub const ALL: [Self; 4] = [
        Self::MarketData,
        Self::InstrumentList,
        Self::ProviderHealth,
        Self::ApiResponse,
    ];

    /// Key prefix for entries of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MarketData => "market_data",
            Self::InstrumentList => "instrument_list",
            Self::ProviderHealth => "provider_health",
            Self::ApiResponse => "api_response",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
