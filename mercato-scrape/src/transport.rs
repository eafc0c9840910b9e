use std::time::Duration;

use async_trait::async_trait;
use mercato_core::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use rand::seq::IndexedRandom;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};

/// Desktop browser user agents rotated per request.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:123.0) Gecko/20100101 Firefox/123.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:123.0) Gecko/20100101 Firefox/123.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:123.0) Gecko/20100101 Firefox/123.0",
];

const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
    ),
    ("accept-language", "en-US,en;q=0.9"),
    ("dnt", "1"),
    ("upgrade-insecure-requests", "1"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("cache-control", "max-age=0"),
];

/// Pick one of [`USER_AGENTS`] at random.
#[must_use]
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Production [`HttpTransport`] over `reqwest`.
///
/// Sends the browser header set on every request, rotating the user agent
/// unless the request carries its own. One call is one attempt; pacing and
/// retries belong to the caller.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Transport over a default client.
    ///
    /// # Errors
    /// Returns `TransportError::Connect` if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(Self { client })
    }

    /// Transport over a caller-configured client (proxies, cookie store, ...).
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn headers_for(req: &HttpRequest) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in BROWSER_HEADERS {
            map.insert(*k, HeaderValue::from_static(*v));
        }
        map.insert(USER_AGENT, HeaderValue::from_static(random_user_agent()));
        for (k, v) in &req.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(k.as_bytes()),
                HeaderValue::from_str(v),
            ) {
                map.insert(name, value);
            }
        }
        map
    }
}

fn classify(e: &reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_decode() || e.is_body() {
        TransportError::Decode(e.to_string())
    } else {
        TransportError::Connect(e.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "mercato_scrape::http_get", skip(self, req), fields(url = %req.url))
    )]
    async fn get(&self, req: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let resp = self
            .client
            .get(&req.url)
            .headers(Self::headers_for(req))
            .timeout(req.timeout)
            .send()
            .await
            .map_err(|e| classify(&e))?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| classify(&e))?;
        Ok(HttpResponse { status, body })
    }
}
