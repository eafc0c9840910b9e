use std::time::Duration;

use async_trait::async_trait;

use mercato_types::TransportError;

/// A single GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute URL.
    pub url: String,
    /// Header pairs sent verbatim.
    pub headers: Vec<(String, String)>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HttpRequest {
    /// GET `url` with no headers and a 30 second timeout.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Override the timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A completed response, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Decoded body text.
    pub body: String,
}

impl HttpResponse {
    /// Body for 2xx responses, `TransportError::Status` otherwise.
    ///
    /// # Errors
    /// Returns the status as an error when it is outside 200..300.
    pub fn into_body(self) -> Result<String, TransportError> {
        if (200..300).contains(&self.status) {
            Ok(self.body)
        } else {
            Err(TransportError::Status { code: self.status })
        }
    }
}

/// Outbound HTTP seam. Implementations perform one attempt; pacing and
/// retries live above this trait.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform a GET.
    async fn get(&self, req: &HttpRequest) -> Result<HttpResponse, TransportError>;
}
