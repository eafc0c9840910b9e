use std::sync::Arc;
use std::time::Duration;

use mercato_core::{HttpRequest, HttpTransport};
use mercato_types::MercatoError;

use crate::{RateLimiter, RetryPolicy};

/// One provider's outbound path: pacing, retries and a transport.
///
/// Every attempt, retries included, takes a grant from the provider's limiter.
#[derive(Clone)]
pub struct Fetcher {
    connector: &'static str,
    transport: Arc<dyn HttpTransport>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    headers: Vec<(String, String)>,
    timeout: Duration,
}

impl Fetcher {
    /// Fetcher for `connector` over `transport`.
    pub fn new(
        connector: &'static str,
        transport: Arc<dyn HttpTransport>,
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            connector,
            transport,
            limiter,
            retry,
            headers: Vec::new(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Add a header sent with every request.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Per-attempt timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Provider this fetcher belongs to.
    #[must_use]
    pub const fn connector(&self) -> &'static str {
        self.connector
    }

    /// GET `url` and return the body of a 2xx response.
    ///
    /// # Errors
    /// Propagates the retry policy's classification: `NotFound`, `Transport`
    /// or `RetriesExhausted`.
    pub async fn get_text(&self, url: &str) -> Result<String, MercatoError> {
        let req = HttpRequest {
            url: url.to_string(),
            headers: self.headers.clone(),
            timeout: self.timeout,
        };
        self.retry
            .run(self.connector, |_attempt| {
                let req = &req;
                async move {
                    self.limiter.acquire().await;
                    self.transport.get(req).await?.into_body()
                }
            })
            .await
    }

    /// Like [`get_text`](Self::get_text) but failures become `None`.
    pub async fn get_text_soft(&self, url: &str) -> Option<String> {
        match self.get_text(url).await {
            Ok(body) => Some(body),
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(connector = self.connector, url, error = %_e, "fetch gave up");
                None
            }
        }
    }
}
