use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use mercato_core::{
    Category, HttpRequest, HttpTransport, MarketAdapter, MercatoError, TransportError,
};
use mercato_middleware::{RateLimiter, RetryPolicy};
use mercato_scrape::{CategorySource, RegexExtractor, ReqwestTransport, ScrapingAdapter};

const ROW: &str = r#"<tr><td class="s">(?P<symbol>[^<]+)</td><td class="p">(?P<price>[^<]+)</td><td class="c">(?P<change>[^<]+)</td></tr>"#;

fn row(symbol: &str, price: &str, change: &str) -> String {
    format!(r#"<tr><td class="s">{symbol}</td><td class="p">{price}</td><td class="c">{change}</td></tr>"#)
}

#[tokio::test]
async fn transport_sends_browser_headers() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/ping")
                .header_exists("user-agent")
                .header("accept-language", "en-US,en;q=0.9");
            then.status(200).body("pong");
        })
        .await;

    let t = ReqwestTransport::new().unwrap();
    let resp = t.get(&HttpRequest::get(server.url("/ping"))).await.unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, "pong");
}

#[tokio::test]
async fn non_success_statuses_are_returned_not_raised() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/busy");
            then.status(503).body("later");
        })
        .await;

    let t = ReqwestTransport::new().unwrap();
    let resp = t.get(&HttpRequest::get(server.url("/busy"))).await.unwrap();
    assert_eq!(resp.status, 503);
    assert_eq!(resp.into_body(), Err(TransportError::Status { code: 503 }));
}

#[tokio::test]
async fn unreachable_host_is_a_connect_error() {
    let t = ReqwestTransport::new().unwrap();
    let req = HttpRequest::get("http://127.0.0.1:1/").timeout(Duration::from_secs(2));
    let err = t.get(&req).await.unwrap_err();
    assert!(err.is_transient(), "{err:?}");
}

#[tokio::test]
async fn adapter_reads_paged_listing_over_http() {
    let server = MockServer::start_async().await;
    let page1 = [
        row("aapl", "185.50", "+1.85%"),
        row("msft", "385.75", "+2.15%"),
    ]
    .concat();
    let page2 = row("nvda", "890.45", "+4.50%");
    server
        .mock_async(|when, then| {
            when.method(GET).path("/stocks").query_param("page", "1");
            then.status(200).body(page1.as_str());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/stocks").query_param("page", "2");
            then.status(200).body(page2.as_str());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/stocks").query_param("page", "3");
            then.status(200).body("<table></table>");
        })
        .await;

    let adapter = ScrapingAdapter::builder("http-demo")
        .extractor(Arc::new(RegexExtractor::new(ROW).unwrap()))
        .source(
            Category::Stocks,
            CategorySource::new(&server.url("/stocks")).unwrap().paged("page", 5),
        )
        .transport(Arc::new(ReqwestTransport::new().unwrap()))
        .limiter(Arc::new(RateLimiter::with_interval(Duration::ZERO)))
        .retry(RetryPolicy::none())
        .build()
        .unwrap();

    let page = adapter.list_refs(Category::Stocks, None, 2).await.unwrap();
    let symbols: Vec<&str> = page.refs.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(symbols, ["AAPL", "MSFT"]);
    let rest = adapter
        .list_refs(Category::Stocks, page.next_cursor.as_ref(), 2)
        .await
        .unwrap();
    assert_eq!(rest.refs.len(), 1);
    assert_eq!(rest.refs[0].symbol, "NVDA");
    assert!(rest.next_cursor.is_none());

    let snaps = adapter.fetch_snapshots(&rest.refs, 1).await.unwrap();
    assert_eq!(snaps.len(), 1);
    assert_eq!(snaps[0].price, 890.45);
    assert_eq!(snaps[0].change_24h_pct, Some(4.5));
}

#[tokio::test]
async fn missing_listing_is_not_found() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/gone");
            then.status(404);
        })
        .await;

    let adapter = ScrapingAdapter::builder("http-demo")
        .extractor(Arc::new(RegexExtractor::new(ROW).unwrap()))
        .source(Category::Forex, CategorySource::new(&server.url("/gone")).unwrap())
        .limiter(Arc::new(RateLimiter::with_interval(Duration::ZERO)))
        .retry(RetryPolicy::none())
        .build()
        .unwrap();
    let err = adapter.list_refs(Category::Forex, None, 10).await.unwrap_err();
    assert!(matches!(err, MercatoError::NotFound { .. }));
}
