use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single outbound HTTP exchange.
///
/// Transport errors are classified so the retry policy can decide whether an
/// attempt is worth repeating without inspecting provider-specific payloads.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// The request did not complete within its timeout.
    #[error("request timed out")]
    Timeout,

    /// The connection could not be established or was reset.
    #[error("connection error: {0}")]
    Connect(String),

    /// The server answered with a non-success status.
    #[error("http status {code}")]
    Status {
        /// HTTP status code.
        code: u16,
    },

    /// The body could not be read or decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl TransportError {
    /// Returns true for conditions a later attempt may not hit again:
    /// timeouts, connection errors, 5xx and 429.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connect(_) => true,
            Self::Status { code } => *code == 429 || *code >= 500,
            Self::Decode(_) => false,
        }
    }

    /// Returns true when the server signalled rate limiting (HTTP 429).
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Status { code: 429 })
    }
}

/// Unified error type for the mercato workspace.
///
/// Adapters and middleware return these; the aggregate scheduler turns any
/// unit-level error into a `fail` provider status instead of propagating it.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq)]
#[non_exhaustive]
pub enum MercatoError {
    /// Issues with the returned or expected data (malformed payload, etc.).
    #[error("data issue: {0}")]
    Data(String),

    /// Invalid input argument, rejected before any network work.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// An individual adapter returned an error.
    #[error("{connector} failed: {msg}")]
    Connector {
        /// Adapter name that failed.
        connector: String,
        /// Human-readable error message.
        msg: String,
    },

    /// A resource could not be found (HTTP 404 and friends).
    #[error("not found: {what}")]
    NotFound {
        /// Description of the missing resource.
        what: String,
    },

    /// An HTTP exchange failed and was not retried further.
    #[error("{connector} transport failure: {error}")]
    Transport {
        /// Adapter name that issued the request.
        connector: String,
        /// Classified transport failure.
        error: TransportError,
    },

    /// Every retry attempt failed with a transient error.
    #[error("{connector} gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Adapter name that issued the request.
        connector: String,
        /// Number of attempts made.
        attempts: u32,
        /// The last transport failure observed.
        last: TransportError,
    },

    /// A single unit exceeded the configured per-provider timeout.
    #[error("provider timed out: {capability} via {connector}")]
    ProviderTimeout {
        /// Adapter name that timed out.
        connector: String,
        /// Capability label (e.g. "list", "snapshots").
        capability: String,
    },

    /// The overall request exceeded the configured deadline.
    #[error("request timed out: {capability}")]
    RequestTimeout {
        /// Capability label for which the request timed out.
        capability: String,
    },

    /// Unknown/opaque error.
    #[error("unknown error: {0}")]
    Other(String),
}

impl MercatoError {
    /// Helper: build a `Connector` error with the adapter name and message.
    pub fn connector(connector: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Connector {
            connector: connector.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build a `NotFound` error for a description of the missing resource.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Helper: build a `Transport` error.
    pub fn transport(connector: impl Into<String>, error: TransportError) -> Self {
        Self::Transport {
            connector: connector.into(),
            error,
        }
    }

    /// Helper: build a `ProviderTimeout` error.
    pub fn provider_timeout(connector: impl Into<String>, capability: impl Into<String>) -> Self {
        Self::ProviderTimeout {
            connector: connector.into(),
            capability: capability.into(),
        }
    }

    /// Helper: build a `RequestTimeout` error.
    #[must_use]
    pub fn request_timeout(capability: impl Into<String>) -> Self {
        Self::RequestTimeout {
            capability: capability.into(),
        }
    }

    /// Returns true if this error should be surfaced to users as actionable.
    ///
    /// Benign not-found conditions are not actionable.
    #[must_use]
    pub const fn is_actionable(&self) -> bool {
        !matches!(self, Self::NotFound { .. })
    }

    /// Returns true for configuration or argument errors raised at the
    /// aggregate boundary.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidArg(_))
    }
}
