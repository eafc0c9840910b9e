use core::fmt;

use serde::{Deserialize, Serialize};

/// Coarse health of a provider within one aggregate request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    /// Every unit succeeded.
    Ok,
    /// Some data arrived but at least one unit failed.
    Degraded,
    /// No data arrived for the provider.
    Fail,
}

impl StatusKind {
    /// Lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Degraded => "degraded",
            Self::Fail => "fail",
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one provider within an aggregate request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    /// Roll-up of the provider's units.
    pub status: StatusKind,
    /// First failure message, if any unit failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Wall time of the provider's slowest unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl ProviderStatus {
    /// A healthy status.
    #[must_use]
    pub const fn ok(latency_ms: Option<u64>) -> Self {
        Self {
            status: StatusKind::Ok,
            message: None,
            latency_ms,
        }
    }

    /// A failed status with a reason.
    pub fn fail(message: impl Into<String>, latency_ms: Option<u64>) -> Self {
        Self {
            status: StatusKind::Fail,
            message: Some(message.into()),
            latency_ms,
        }
    }

    /// A partially successful status with a reason.
    pub fn degraded(message: impl Into<String>, latency_ms: Option<u64>) -> Self {
        Self {
            status: StatusKind::Degraded,
            message: Some(message.into()),
            latency_ms,
        }
    }
}
