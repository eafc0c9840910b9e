mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::*;
use mercato::{AggregateRequest, Category, Mercato, StatusKind};
use mercato_mock::{DynamicMockAdapter, MockAdapter, MockBehavior};
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn hanging_unit_times_out_alone() {
    let (stuck, ctl) = DynamicMockAdapter::new_with_controller("stuck");
    ctl.set_listing(Category::Crypto, MockBehavior::Hang).await;

    let mercato = Mercato::builder()
        .with_adapter(stuck)
        .with_adapter(mock("good", &[Category::Crypto]))
        .provider_timeout(Duration::from_secs(1))
        .build()
        .unwrap();

    let resp = mercato
        .aggregate(AggregateRequest::new().category(Category::Crypto))
        .await
        .unwrap();

    assert_eq!(resp.data.len(), 5);
    let s = &resp.meta.status["stuck"];
    assert_eq!(s.status, StatusKind::Fail);
    assert!(s.message.as_deref().unwrap().contains("timed out"));
    assert!(s.latency_ms.unwrap() >= 1_000);
    assert_eq!(resp.meta.status["good"].status, StatusKind::Ok);
    assert_eq!(ctl.listing_requests().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn request_deadline_keeps_finished_units() {
    let slow = MockAdapter::new()
        .named("slow")
        .only(&[Category::Crypto])
        .with_delay(Duration::from_secs(10));
    let mercato = Mercato::builder()
        .with_adapter(Arc::new(slow))
        .with_adapter(mock("fast", &[Category::Crypto]))
        .request_timeout(Duration::from_secs(2))
        .build()
        .unwrap();

    let started = Instant::now();
    let resp = mercato
        .aggregate(AggregateRequest::new().category(Category::Crypto))
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(3));

    assert_eq!(resp.data.len(), 5);
    assert!(resp.data.iter().all(|s| s.provider == "fast"));
    let slow = &resp.meta.status["slow"];
    assert_eq!(slow.status, StatusKind::Fail);
    assert!(slow.message.as_deref().unwrap().contains("request timed out"));
    assert!(resp.meta.next_cursor.is_none());
}

#[tokio::test(start_paused = true)]
async fn partial_provider_is_degraded() {
    let (flaky, ctl) = DynamicMockAdapter::new_with_controller("flaky");
    ctl.set_listing(
        Category::Stocks,
        MockBehavior::Return(vec![priced(AAPL, Category::Stocks, 185.5)]),
    )
    .await;
    ctl.set_listing(Category::Crypto, MockBehavior::Hang).await;

    let mercato = Mercato::builder()
        .with_adapter(flaky)
        .provider_timeout(Duration::from_secs(1))
        .build()
        .unwrap();
    let resp = mercato
        .aggregate(
            AggregateRequest::new()
                .category(Category::Stocks)
                .category(Category::Crypto),
        )
        .await
        .unwrap();

    assert_eq!(symbols(&resp.data), vec![AAPL]);
    let s = &resp.meta.status["flaky"];
    assert_eq!(s.status, StatusKind::Degraded);
    assert!(s.message.as_deref().unwrap().starts_with("crypto:"));
}

#[tokio::test(start_paused = true)]
async fn semaphore_bounds_concurrent_units() {
    let slow = |name: &'static str| {
        Arc::new(
            MockAdapter::new()
                .named(name)
                .only(&[Category::Crypto])
                .with_delay(Duration::from_secs(1)),
        )
    };
    let mercato = Mercato::builder()
        .with_adapter(slow("a"))
        .with_adapter(slow("b"))
        .with_adapter(slow("c"))
        .with_adapter(slow("d"))
        .build()
        .unwrap();
    let req = |n: usize| {
        AggregateRequest::new()
            .category(Category::Crypto)
            .max_concurrency(n)
            .no_cache(true)
    };

    // Each unit sleeps once to list and once to fetch.
    let started = Instant::now();
    let serial = mercato.aggregate(req(1)).await.unwrap();
    assert!(started.elapsed() >= Duration::from_secs(8));
    assert_eq!(serial.data.len(), 5);

    let started = Instant::now();
    mercato.aggregate(req(4)).await.unwrap();
    let parallel = started.elapsed();
    assert!(parallel >= Duration::from_secs(2));
    assert!(parallel < Duration::from_secs(3));
}
