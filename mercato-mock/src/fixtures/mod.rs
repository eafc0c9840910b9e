use mercato_core::{Category, InstrumentRef};

pub struct Fixture {
    pub symbol: &'static str,
    pub name: &'static str,
    pub exchange: &'static str,
    pub price: f64,
    pub change_24h_pct: f64,
    pub volume: f64,
    pub market_cap: Option<f64>,
}

const fn fx(
    symbol: &'static str,
    name: &'static str,
    exchange: &'static str,
    price: f64,
    change_24h_pct: f64,
    volume: f64,
    market_cap: Option<f64>,
) -> Fixture {
    Fixture {
        symbol,
        name,
        exchange,
        price,
        change_24h_pct,
        volume,
        market_cap,
    }
}

const FOREX: &[Fixture] = &[
    fx("EURUSD=X", "EUR/USD", "CCY", 1.0850, -0.25, 0.0, None),
    fx("GBPUSD=X", "GBP/USD", "CCY", 1.2650, 0.35, 0.0, None),
    fx("USDJPY=X", "USD/JPY", "CCY", 150.25, 0.45, 0.0, None),
    fx("USDCHF=X", "USD/CHF", "CCY", 0.8950, -0.15, 0.0, None),
    fx("AUDUSD=X", "AUD/USD", "CCY", 0.6550, 0.20, 0.0, None),
];

const STOCKS: &[Fixture] = &[
    fx("AAPL", "Apple Inc.", "NASDAQ", 185.50, 1.85, 52_000_000.0, Some(2.9e12)),
    fx("MSFT", "Microsoft Corporation", "NASDAQ", 385.75, 2.15, 24_000_000.0, Some(2.8e12)),
    fx("GOOGL", "Alphabet Inc.", "NASDAQ", 142.25, 1.45, 27_000_000.0, Some(1.8e12)),
    fx("AMZN", "Amazon.com Inc.", "NASDAQ", 145.80, 2.80, 41_000_000.0, Some(1.5e12)),
    fx("TSLA", "Tesla Inc.", "NASDAQ", 245.30, -1.20, 98_000_000.0, Some(7.8e11)),
    fx("META", "Meta Platforms Inc.", "NASDAQ", 485.90, 3.25, 15_000_000.0, Some(1.2e12)),
    fx("NVDA", "NVIDIA Corporation", "NASDAQ", 890.45, 4.50, 45_000_000.0, Some(2.2e12)),
    fx("NFLX", "Netflix Inc.", "NASDAQ", 485.20, 1.75, 4_000_000.0, Some(2.1e11)),
];

const CRYPTO: &[Fixture] = &[
    fx("BTC-USD", "Bitcoin", "CCC", 43250.00, 2.50, 2.5e10, Some(8.5e11)),
    fx("ETH-USD", "Ethereum", "CCC", 2650.50, 1.80, 1.2e10, Some(3.2e11)),
    fx("BNB-USD", "BNB", "CCC", 315.75, 3.20, 8.0e8, Some(4.8e10)),
    fx("ADA-USD", "Cardano", "CCC", 0.4850, 1.50, 3.5e8, Some(1.7e10)),
    fx("SOL-USD", "Solana", "CCC", 98.25, 4.80, 2.1e9, Some(4.3e10)),
];

const INDICES: &[Fixture] = &[
    fx("^GSPC", "S&P 500", "SNP", 4520.50, 0.85, 0.0, None),
    fx("^IXIC", "NASDAQ Composite", "NIM", 14250.75, 1.25, 0.0, None),
    fx("^DJI", "Dow Jones Industrial Average", "DJI", 35250.00, 0.65, 0.0, None),
    fx("^FTSE", "FTSE 100", "FGI", 7650.25, 0.45, 0.0, None),
    fx("^N225", "Nikkei 225", "OSA", 32500.50, 1.15, 0.0, None),
];

const COMMODITIES: &[Fixture] = &[
    fx("GC=F", "Gold", "CMX", 2050.50, 0.75, 180_000.0, None),
    fx("CL=F", "Crude Oil", "NYM", 75.25, -1.85, 320_000.0, None),
    fx("SI=F", "Silver", "CMX", 23.45, 1.25, 60_000.0, None),
    fx("PL=F", "Platinum", "NYM", 985.75, 0.90, 12_000.0, None),
    fx("PA=F", "Palladium", "NYM", 1250.30, 2.10, 4_000.0, None),
];

pub const fn table(category: Category) -> &'static [Fixture] {
    match category {
        Category::Forex => FOREX,
        Category::Stocks => STOCKS,
        Category::Crypto => CRYPTO,
        Category::Indices => INDICES,
        Category::Commodities => COMMODITIES,
    }
}

pub fn by_symbol(category: Category, symbol: &str) -> Option<&'static Fixture> {
    table(category).iter().find(|f| f.symbol == symbol)
}

pub fn refs(category: Category) -> Vec<InstrumentRef> {
    table(category)
        .iter()
        .map(|f| {
            InstrumentRef::new(f.symbol, category)
                .with_name(f.name)
                .with_exchange(f.exchange)
                .with_currency("USD")
                .with_price(f.price, Some(f.change_24h_pct))
        })
        .collect()
}
