use std::sync::Arc;
use std::time::Duration;

use mercato_core::{
    CacheKind, CacheTtlConfig, Category, InstrumentRef, InstrumentSnapshot, ProviderStatus,
};
use mercato_middleware::{CacheBackend, CacheManager, LruBackend, MokaBackend};
use serde_json::json;

fn snap(provider: &str, symbol: &str) -> InstrumentSnapshot {
    let r = InstrumentRef::new(symbol, Category::Stocks);
    InstrumentSnapshot::from_ref(provider, &r, 10.0)
}

#[tokio::test(start_paused = true)]
async fn entry_expires_after_ttl() {
    let backend = LruBackend::new(16);
    backend
        .set("k", json!(1), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(backend.get("k").await.unwrap(), Some(json!(1)));

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert_eq!(backend.get("k").await.unwrap(), None);
    // Reading the expired entry evicted it.
    assert_eq!(backend.len().await, 0);
}

#[tokio::test(start_paused = true)]
async fn long_ttl_is_an_immediate_hit() {
    let backend = LruBackend::new(16);
    backend
        .set("k", json!({"a": 1}), Duration::from_secs(60))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.get("k").await.unwrap(), Some(json!({"a": 1})));
    let age = backend.age("k").await.expect("live entry");
    assert!(age >= Duration::from_secs(30) && age < Duration::from_secs(31));
}

#[tokio::test(start_paused = true)]
async fn zero_ttl_stores_nothing() {
    let backend = LruBackend::new(16);
    backend.set("k", json!(1), Duration::from_secs(5)).await.unwrap();
    backend.set("k", json!(2), Duration::ZERO).await.unwrap();
    assert_eq!(backend.get("k").await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn purge_drops_only_expired_entries() {
    let backend = LruBackend::new(16);
    backend.set("short", json!(1), Duration::from_secs(1)).await.unwrap();
    backend.set("long", json!(2), Duration::from_secs(10)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(backend.len().await, 2);
    assert_eq!(backend.purge_expired().await, 1);
    assert_eq!(backend.len().await, 1);
    assert_eq!(backend.purged_total(), 1);
    assert_eq!(backend.get("long").await.unwrap(), Some(json!(2)));
}

#[tokio::test(start_paused = true)]
async fn janitor_compacts_under_concurrent_traffic() {
    let backend = Arc::new(LruBackend::new(64));
    for i in 0..8 {
        backend
            .set(&format!("short:{i}"), json!(i), Duration::from_secs(10))
            .await
            .unwrap();
    }
    backend.set("long", json!("kept"), Duration::from_secs(3600)).await.unwrap();
    let janitor = backend.spawn_janitor(Duration::from_secs(15));

    let workers: Vec<_> = (0..4)
        .map(|w| {
            let b = Arc::clone(&backend);
            tokio::spawn(async move {
                for round in 0..20 {
                    b.set(&format!("hot:{w}"), json!(round), Duration::from_secs(3600))
                        .await
                        .unwrap();
                    assert_eq!(b.get("long").await.unwrap(), Some(json!("kept")));
                    assert_eq!(b.get(&format!("hot:{w}")).await.unwrap(), Some(json!(round)));
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            })
        })
        .collect();
    for w in workers {
        w.await.unwrap();
    }

    // One pass at t=15s reclaimed the short-lived entries and nothing else.
    assert_eq!(backend.purged_total(), 8);
    assert_eq!(backend.len().await, 5);

    // The task ends once the backend is gone.
    drop(backend);
    tokio::time::timeout(Duration::from_secs(60), janitor)
        .await
        .expect("janitor exits after the backend is dropped")
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn capacity_evicts_least_recently_used() {
    let backend = LruBackend::new(2);
    let ttl = Duration::from_secs(60);
    backend.set("a", json!(1), ttl).await.unwrap();
    backend.set("b", json!(2), ttl).await.unwrap();
    let _ = backend.get("a").await.unwrap();
    backend.set("c", json!(3), ttl).await.unwrap();
    assert_eq!(backend.get("b").await.unwrap(), None);
    assert_eq!(backend.get("a").await.unwrap(), Some(json!(1)));
}

#[tokio::test]
async fn moka_backend_basic_operations() {
    let backend = MokaBackend::new(100);
    let ttl = Duration::from_secs(60);
    backend.set("market_data|p|A", json!(1), ttl).await.unwrap();
    backend.set("market_data|p|B", json!(2), ttl).await.unwrap();
    backend.set("market_data|q|A", json!(3), ttl).await.unwrap();
    assert_eq!(backend.get("market_data|p|A").await.unwrap(), Some(json!(1)));
    assert_eq!(backend.len().await, 3);

    assert_eq!(backend.delete_prefix("market_data|p|").await.unwrap(), 2);
    assert_eq!(backend.get("market_data|p|B").await.unwrap(), None);
    assert!(backend.delete("market_data|q|A").await.unwrap());
    assert!(!backend.delete("market_data|q|A").await.unwrap());

    backend.set("x", json!(0), ttl).await.unwrap();
    backend.clear().await.unwrap();
    assert_eq!(backend.get("x").await.unwrap(), None);
}

#[test]
fn long_keys_are_digested() {
    let cache = CacheManager::default();
    let short = cache.key(CacheKind::MarketData, &["mock", "AAPL", "stocks"]);
    assert_eq!(short, "market_data|mock|AAPL|stocks");

    let spaced = cache.key(CacheKind::ApiResponse, &["prices", "a b"]);
    assert_eq!(spaced, "api_response|prices|a%20b");

    let long_arg = "X".repeat(250);
    let long = cache.key(CacheKind::MarketData, &["mock", &long_arg]);
    assert!(long.starts_with("market_data:"));
    assert_eq!(long.len(), "market_data:".len() + 64);
    assert_eq!(long, cache.key(CacheKind::MarketData, &["mock", &long_arg]));
}

#[test]
fn distinct_arguments_never_share_a_key() {
    let cache = CacheManager::default();
    let kind = CacheKind::InstrumentList;
    let pairs: [(&[&str], &[&str]); 4] = [
        (&["a|b", "c"], &["a", "b|c"]),
        (&["a b"], &["a_b"]),
        (&["x", ""], &["x|"]),
        (&["50%7C"], &["50|"]),
    ];
    for (left, right) in pairs {
        assert_ne!(cache.key(kind, left), cache.key(kind, right), "{left:?} vs {right:?}");
    }
}

#[tokio::test]
async fn pipes_in_provider_names_stay_scoped() {
    let cache = CacheManager::default();
    cache.put_provider_health("a|b", &ProviderStatus::ok(Some(1))).await;
    cache.put_market_data(&snap("a", "B")).await;
    cache.put_market_data(&snap("a|b", "C")).await;

    assert_eq!(cache.invalidate_provider("a").await, 1);
    assert!(cache.market_data("a|b", "C", Category::Stocks).await.is_some());
    assert!(cache.provider_health("a|b").await.is_some());
}

#[tokio::test(start_paused = true)]
async fn manager_applies_kind_ttl_and_counts_hits() {
    let ttl = CacheTtlConfig::default().with_ttl(CacheKind::MarketData, Duration::from_secs(1));
    let cache = CacheManager::in_memory(ttl);
    let s = snap("mock", "AAPL");
    cache.put_market_data(&s).await;

    assert_eq!(cache.market_data("mock", "AAPL", Category::Stocks).await, Some(s));
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert_eq!(cache.market_data("mock", "AAPL", Category::Stocks).await, None);

    let stats = cache.stats().await;
    assert_eq!(stats.backend, "lru");
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.ttl_secs.get("market_data"), Some(&1));
    assert_eq!(stats.ttl_secs.get("instrument_list"), Some(&300));
}

#[tokio::test]
async fn invalidate_provider_leaves_other_providers() {
    let cache = CacheManager::new(Arc::new(MokaBackend::default()), CacheTtlConfig::default());
    cache.put_market_data(&snap("alpha", "AAPL")).await;
    cache.put_market_data(&snap("alpha", "MSFT")).await;
    cache.put_market_data(&snap("beta", "AAPL")).await;
    let refs = vec![InstrumentRef::new("AAPL", Category::Stocks)];
    cache
        .put_instrument_list("alpha", Category::Stocks, "1", &refs)
        .await;
    cache
        .put_provider_health("alpha", &mercato_core::ProviderStatus::ok(Some(5)))
        .await;

    assert_eq!(cache.invalidate_provider("alpha").await, 4);
    assert_eq!(cache.market_data("alpha", "AAPL", Category::Stocks).await, None);
    assert!(cache.market_data("beta", "AAPL", Category::Stocks).await.is_some());
    assert_eq!(cache.provider_health("alpha").await, None);
}

#[tokio::test]
async fn api_responses_are_keyed_by_sorted_params() {
    let cache = CacheManager::default();
    let mut a = std::collections::BTreeMap::new();
    a.insert("page_size", "2".to_string());
    a.insert("categories", "crypto".to_string());
    cache.put_api_response("prices", &a, &json!({"n": 2})).await;

    let mut b = std::collections::BTreeMap::new();
    b.insert("categories", "crypto".to_string());
    b.insert("page_size", "2".to_string());
    let hit: Option<serde_json::Value> = cache.api_response("prices", &b).await;
    assert_eq!(hit, Some(json!({"n": 2})));
}
