use std::collections::HashSet;

use chrono::Utc;
use mercato_core::{Category, InstrumentSnapshot, Meta, PriorityTable, dedupe};
use proptest::prelude::*;

const PROVIDERS: [&str; 4] = ["mock", "scrape", "backup", "unlisted"];
const SYMBOLS: [&str; 6] = ["AAPL", "MSFT", "BTC-USD", "EURUSD=X", "^GSPC", "GC=F"];

fn arb_snapshot() -> impl Strategy<Value = InstrumentSnapshot> {
    (0..PROVIDERS.len(), 0..SYMBOLS.len(), 1u32..100_000u32).prop_map(|(p, s, cents)| {
        InstrumentSnapshot {
            provider: PROVIDERS[p].to_string(),
            category: Category::Stocks,
            symbol: SYMBOLS[s].to_string(),
            name: None,
            exchange: None,
            currency: None,
            price: f64::from(cents) / 100.0,
            change_24h_pct: None,
            change_1h_pct: None,
            ts: Utc::now(),
            meta: Meta::new(),
        }
    })
}

fn table() -> PriorityTable {
    PriorityTable::new(["mock", "scrape", "backup"])
}

proptest! {
    #[test]
    fn dedupe_idempotent(snaps in proptest::collection::vec(arb_snapshot(), 0..120)) {
        let once = dedupe(snaps, &table());
        let twice = dedupe(once.clone(), &table());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn exactly_one_per_input_symbol(snaps in proptest::collection::vec(arb_snapshot(), 0..120)) {
        let input_symbols: HashSet<String> = snaps.iter().map(|s| s.symbol.clone()).collect();
        let out = dedupe(snaps, &table());

        let out_symbols: Vec<&str> = out.iter().map(|s| s.symbol.as_str()).collect();
        let unique: HashSet<&str> = out_symbols.iter().copied().collect();
        prop_assert_eq!(unique.len(), out_symbols.len());
        prop_assert_eq!(out.len(), input_symbols.len());
        for s in &out {
            prop_assert!(input_symbols.contains(&s.symbol));
        }
    }

    #[test]
    fn survivor_has_best_rank(snaps in proptest::collection::vec(arb_snapshot(), 1..120)) {
        let t = table();
        let out = dedupe(snaps.clone(), &t);
        for kept in &out {
            let best = snaps
                .iter()
                .filter(|s| s.symbol == kept.symbol)
                .map(|s| t.rank(&s.provider))
                .min()
                .unwrap();
            prop_assert_eq!(t.rank(&kept.provider), best);
            // Ties resolve to the earliest snapshot among the best-ranked ones.
            let first_best = snaps
                .iter()
                .find(|s| s.symbol == kept.symbol && t.rank(&s.provider) == best)
                .unwrap();
            prop_assert_eq!(kept, first_best);
        }
    }
}
