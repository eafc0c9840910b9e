mod helpers;

use std::sync::Arc;

use helpers::*;
use mercato::{
    AggregateCursor, AggregateRequest, Category, Cursor, MarketAdapter, Mercato, MercatoConfig,
    StatusKind,
};
use mercato_mock::MockAdapter;

fn crypto_page(size: usize) -> AggregateRequest {
    AggregateRequest::new()
        .provider("mock")
        .category(Category::Crypto)
        .page_size(size)
}

#[tokio::test]
async fn crypto_walk_follows_the_cursor() {
    let mercato = mercato_with(vec![mock("mock", &[Category::Crypto])]);

    let first = mercato.aggregate(crypto_page(2)).await.unwrap();
    assert_eq!(symbols(&first.data), vec![BTC_USD, ETH_USD]);
    assert_eq!(first.meta.providers, vec!["mock"]);
    assert_eq!(first.meta.categories, vec![Category::Crypto]);
    assert_eq!(first.meta.page_size, 2);
    assert_eq!(first.meta.hours_window, 1);
    assert_eq!(first.meta.status["mock"].status, StatusKind::Ok);
    let c1 = first.meta.next_cursor.clone().expect("more pages after the first");

    let second = mercato.aggregate(crypto_page(2).cursor(c1)).await.unwrap();
    assert_eq!(symbols(&second.data), vec!["BNB-USD", "ADA-USD"]);
    let c2 = second.meta.next_cursor.clone().expect("one element left");

    let third = mercato.aggregate(crypto_page(2).cursor(c2)).await.unwrap();
    assert_eq!(symbols(&third.data), vec!["SOL-USD"]);
    assert!(third.meta.next_cursor.is_none());
}

#[tokio::test]
async fn failing_provider_does_not_hide_healthy_data() {
    let mercato = mercato_with(vec![
        broken("bad", &[Category::Crypto]),
        mock("good", &[Category::Crypto]),
    ]);
    let resp = mercato
        .aggregate(AggregateRequest::new().category(Category::Crypto).page_size(10))
        .await
        .unwrap();

    assert_eq!(symbols(&resp.data), CRYPTO.to_vec());
    assert!(resp.data.iter().all(|s| s.provider == "good"));

    let bad = &resp.meta.status["bad"];
    assert_eq!(bad.status, StatusKind::Fail);
    assert!(bad.message.as_deref().unwrap().contains("upstream unavailable"));
    assert_eq!(resp.meta.status["good"].status, StatusKind::Ok);
}

#[tokio::test]
async fn panicking_adapter_is_contained() {
    let mercato = mercato_with(vec![
        Arc::new(PanickingAdapter),
        mock("good", &[Category::Crypto]),
    ]);
    let resp = mercato
        .aggregate(AggregateRequest::new().category(Category::Crypto))
        .await
        .unwrap();

    assert_eq!(resp.data.len(), 5);
    let panicky = &resp.meta.status["panicky"];
    assert_eq!(panicky.status, StatusKind::Fail);
    assert!(panicky.message.as_deref().unwrap().contains("panicked"));
}

#[tokio::test]
async fn bad_input_is_rejected_before_any_call() {
    let m = mock("mock", &[Category::Crypto]);
    let mercato = mercato_with(vec![m.clone()]);

    let rejected = [
        crypto_page(0),
        crypto_page(501),
        crypto_page(2).max_concurrency(5),
        crypto_page(2).max_concurrency(0),
        crypto_page(2).hours_window(0),
        crypto_page(2).provider("nope"),
        AggregateRequest::new().category_name("bonds"),
    ];
    for req in rejected {
        let err = mercato.aggregate(req.clone()).await.unwrap_err();
        assert!(err.is_invalid_input(), "{req:?} gave {err:?}");
    }
    assert_eq!(m.list_calls(), 0);

    let edge = mercato
        .aggregate(crypto_page(500).max_concurrency(4))
        .await
        .unwrap();
    assert_eq!(edge.data.len(), 5);
}

#[tokio::test]
async fn all_keyword_selects_everything() {
    let mercato = mercato_with(vec![mock("mock", &[Category::Stocks, Category::Crypto])]);
    let resp = mercato
        .aggregate(
            AggregateRequest::new()
                .provider("all")
                .category_name("ALL")
                .page_size(50),
        )
        .await
        .unwrap();
    assert_eq!(resp.meta.categories, Category::ALL.to_vec());
    assert_eq!(resp.data.len(), 8 + 5);
}

#[tokio::test]
async fn unsupported_pairs_are_not_scheduled() {
    let m = mock("mock", &[Category::Crypto]);
    let mercato = mercato_with(vec![m.clone()]);
    let resp = mercato
        .aggregate(
            AggregateRequest::new()
                .category(Category::Stocks)
                .category(Category::Crypto),
        )
        .await
        .unwrap();
    assert_eq!(m.list_calls(), 1);
    assert_eq!(resp.data.len(), 5);
    assert_eq!(resp.meta.status["mock"].status, StatusKind::Ok);
}

#[tokio::test]
async fn implausible_snapshots_are_dropped() {
    let m = MockAdapter::new()
        .named("mock")
        .only(&[])
        .with_refs(
            Category::Crypto,
            vec![
                priced(BTC_USD, Category::Crypto, 43_250.0),
                priced("HUGE-USD", Category::Crypto, 1e9),
                priced("ZERO-USD", Category::Crypto, 0.0),
            ],
        );
    let mercato = mercato_with(vec![Arc::new(m)]);
    let resp = mercato
        .aggregate(AggregateRequest::new().category(Category::Crypto))
        .await
        .unwrap();
    assert_eq!(symbols(&resp.data), vec![BTC_USD]);
    assert_eq!(resp.meta.status["mock"].status, StatusKind::Ok);
}

#[tokio::test]
async fn dedupe_follows_configured_priority() {
    let a: Arc<dyn MarketAdapter> = mock("a", &[Category::Crypto]);
    let b: Arc<dyn MarketAdapter> = mock("b", &[Category::Crypto]);
    let req = || AggregateRequest::new().category(Category::Crypto);

    let by_registration = mercato_with(vec![a.clone(), b.clone()]);
    let resp = by_registration.aggregate(req()).await.unwrap();
    assert_eq!(resp.data.len(), 5);
    assert!(resp.data.iter().all(|s| s.provider == "a"));

    let preferred = Mercato::builder()
        .with_adapter(a.clone())
        .with_adapter(b.clone())
        .dedupe_priority(&[b.clone(), a.clone()])
        .build()
        .unwrap();
    let resp = preferred.aggregate(req()).await.unwrap();
    assert_eq!(symbols(&resp.data), CRYPTO.to_vec());
    assert!(resp.data.iter().all(|s| s.provider == "b"));

    let raw = preferred.aggregate(req().dedupe(false)).await.unwrap();
    assert_eq!(raw.data.len(), 10);
}

#[tokio::test]
async fn composite_cursor_resumes_only_pending_units() {
    let m = mock("mock", &[Category::Stocks, Category::Crypto]);
    let mercato = mercato_with(vec![m.clone()]);
    let req = || {
        AggregateRequest::new()
            .category(Category::Stocks)
            .category(Category::Crypto)
            .page_size(3)
            .no_cache(true)
    };

    let p1 = mercato.aggregate(req()).await.unwrap();
    assert_eq!(
        symbols(&p1.data),
        vec![AAPL, MSFT, "GOOGL", BTC_USD, ETH_USD, "BNB-USD"]
    );
    let token = p1.meta.next_cursor.unwrap();
    let agg = AggregateCursor::decode(&token).unwrap();
    assert_eq!(agg.units.len(), 2);

    let p2 = mercato.aggregate(req().cursor(token)).await.unwrap();
    assert_eq!(
        symbols(&p2.data),
        vec!["AMZN", "TSLA", "META", "ADA-USD", "SOL-USD"]
    );
    let token = p2.meta.next_cursor.unwrap();
    let agg = AggregateCursor::decode(&token).unwrap();
    assert_eq!(agg.units.len(), 1);
    assert_eq!(agg.units[0].category, Category::Stocks);

    let p3 = mercato.aggregate(req().cursor(token)).await.unwrap();
    assert_eq!(symbols(&p3.data), vec!["NVDA", "NFLX"]);
    assert!(p3.meta.next_cursor.is_none());
    assert_eq!(m.list_calls(), 5);
}

#[tokio::test]
async fn plain_and_garbage_cursors() {
    let mercato = mercato_with(vec![mock("mock", &[Category::Crypto])]);

    let flat = Cursor::bare(3, 2).encode();
    let resp = mercato.aggregate(crypto_page(2).cursor(flat)).await.unwrap();
    assert_eq!(symbols(&resp.data), vec!["ADA-USD", "SOL-USD"]);
    assert!(resp.meta.next_cursor.is_none());

    let resp = mercato
        .aggregate(crypto_page(2).cursor("garbage!!"))
        .await
        .unwrap();
    assert_eq!(symbols(&resp.data), vec![BTC_USD, ETH_USD]);

    // A token issued for another page size restarts the walk.
    let first = mercato.aggregate(crypto_page(2)).await.unwrap();
    let resp = mercato
        .aggregate(crypto_page(3).cursor(first.meta.next_cursor.unwrap()))
        .await
        .unwrap();
    assert_eq!(symbols(&resp.data), vec![BTC_USD, ETH_USD, "BNB-USD"]);
}

#[tokio::test]
async fn builder_rejects_bad_setups() {
    assert!(Mercato::builder().build().unwrap_err().is_invalid_input());

    let dup = Mercato::builder()
        .with_adapter(mock("same", &[Category::Crypto]))
        .with_adapter(mock("same", &[Category::Stocks]))
        .build();
    assert!(dup.unwrap_err().is_invalid_input());

    let over = Mercato::builder()
        .with_adapter(mock("m", &[Category::Crypto]))
        .max_concurrency(9)
        .build();
    assert!(over.unwrap_err().is_invalid_input());

    let ceiling_raised = Mercato::builder()
        .with_adapter(mock("m", &[Category::Crypto]))
        .config(MercatoConfig {
            max_concurrency: 8,
            hard_max_concurrency: 8,
            ..MercatoConfig::default()
        })
        .build();
    let err = ceiling_raised.unwrap_err();
    assert!(err.is_invalid_input());
    assert!(err.to_string().contains("hard_max_concurrency"), "{err}");

    let at_limit = Mercato::builder()
        .with_adapter(mock("m", &[Category::Crypto]))
        .config(MercatoConfig {
            hard_max_concurrency: MercatoConfig::CONCURRENCY_LIMIT,
            ..MercatoConfig::default()
        })
        .build();
    assert!(at_limit.is_ok());
}

#[tokio::test]
async fn unknown_priority_names_are_ignored() {
    let cfg = MercatoConfig {
        dedupe_priority: vec!["ghost".into(), "b".into(), "b".into(), "a".into()],
        ..Default::default()
    };
    let mercato = Mercato::builder()
        .with_adapter(mock("a", &[Category::Crypto]))
        .with_adapter(mock("b", &[Category::Crypto]))
        .config(cfg)
        .build()
        .unwrap();
    assert_eq!(mercato.config().dedupe_priority, vec!["b", "a"]);
    assert_eq!(mercato.providers(), vec!["a", "b"]);

    let resp = mercato
        .aggregate(AggregateRequest::new().category(Category::Crypto))
        .await
        .unwrap();
    assert!(resp.data.iter().all(|s| s.provider == "b"));
}

#[tokio::test]
async fn cursor_from_another_selection_restarts() {
    let mercato = mercato_with(vec![
        mock("mock", &[Category::Stocks, Category::Crypto]),
        mock("other", &[Category::Stocks, Category::Crypto]),
    ]);
    let first = mercato.aggregate(crypto_page(2)).await.unwrap();
    let token = first.meta.next_cursor.unwrap();

    let stocks = mercato
        .aggregate(
            AggregateRequest::new()
                .provider("mock")
                .category(Category::Stocks)
                .page_size(2)
                .cursor(token.clone()),
        )
        .await
        .unwrap();
    assert_eq!(symbols(&stocks.data), vec![AAPL, MSFT]);
    assert!(stocks.meta.next_cursor.is_some());

    let widened = mercato
        .aggregate(
            AggregateRequest::new()
                .category(Category::Crypto)
                .page_size(2)
                .dedupe(false)
                .cursor(token),
        )
        .await
        .unwrap();
    let providers: Vec<&str> = widened.data.iter().map(|s| s.provider.as_str()).collect();
    assert_eq!(providers, vec!["mock", "mock", "other", "other"]);
    assert_eq!(symbols(&widened.data), vec![BTC_USD, ETH_USD, BTC_USD, ETH_USD]);
}
