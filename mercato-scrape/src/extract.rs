use std::sync::Arc;

use mercato_core::{
    Category, InstrumentRef, MercatoError, normalize_symbol, sanitize_percent, sanitize_price,
};
use regex::{Captures, Regex};

/// Strategy that turns one raw document into instrument references.
///
/// Implementations must be pure: the same document always yields the same
/// references in the same order.
pub trait Extractor: Send + Sync {
    /// References found in a listing document.
    fn extract_refs(&self, doc: &str, category: Category) -> Vec<InstrumentRef>;

    /// Total row count the document advertises, if any.
    fn expected_count(&self, _doc: &str, _category: Category) -> Option<usize> {
        None
    }

    /// Price and 24h change found in a per-symbol quote document.
    fn extract_quote(&self, _doc: &str, _r: &InstrumentRef) -> Option<(f64, Option<f64>)> {
        None
    }
}

impl dyn Extractor {
    /// Build an extractor from a closure over the raw listing document.
    pub fn from_fn<F>(f: F) -> Arc<dyn Extractor>
    where
        F: Send + Sync + 'static + Fn(&str, Category) -> Vec<InstrumentRef>,
    {
        struct FnExtractor<F>(F);

        impl<F> Extractor for FnExtractor<F>
        where
            F: Send + Sync + 'static + Fn(&str, Category) -> Vec<InstrumentRef>,
        {
            fn extract_refs(&self, doc: &str, category: Category) -> Vec<InstrumentRef> {
                (self.0)(doc, category)
            }
        }

        Arc::new(FnExtractor(f))
    }
}

/// Extractor driven by regular expressions with named groups.
///
/// The row pattern must define `symbol`; `name`, `exchange`, `price` and
/// `change` are optional. Prices and percentages go through the shared
/// sanitizers, so thousands separators, decimal commas and accounting
/// parentheses are accepted. Rows whose symbol is blank are skipped; a
/// negative or unparseable price leaves the reference unpriced.
#[derive(Debug, Clone)]
pub struct RegexExtractor {
    row: Regex,
    total: Option<Regex>,
    quote: Option<Regex>,
    currency: Option<String>,
}

fn compile(pattern: &str) -> Result<Regex, MercatoError> {
    Regex::new(pattern).map_err(|e| MercatoError::InvalidArg(format!("bad pattern {pattern:?}: {e}")))
}

fn group<'h>(caps: &Captures<'h>, name: &str) -> Option<&'h str> {
    caps.name(name)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
}

impl RegexExtractor {
    /// Extractor over `row`, which must contain a `symbol` group.
    ///
    /// # Errors
    /// Returns `InvalidArg` when the pattern does not compile or lacks `symbol`.
    pub fn new(row: &str) -> Result<Self, MercatoError> {
        let row = compile(row)?;
        if !row.capture_names().flatten().any(|n| n == "symbol") {
            return Err(MercatoError::InvalidArg(
                "row pattern needs a `symbol` group".into(),
            ));
        }
        Ok(Self {
            row,
            total: None,
            quote: None,
            currency: None,
        })
    }

    /// Pattern whose `count` group (or first group) holds the advertised row total.
    ///
    /// # Errors
    /// Returns `InvalidArg` when the pattern does not compile.
    pub fn with_total(mut self, pattern: &str) -> Result<Self, MercatoError> {
        self.total = Some(compile(pattern)?);
        Ok(self)
    }

    /// Pattern applied to per-symbol quote documents; uses `price` and `change`.
    ///
    /// # Errors
    /// Returns `InvalidArg` when the pattern does not compile.
    pub fn with_quote(mut self, pattern: &str) -> Result<Self, MercatoError> {
        self.quote = Some(compile(pattern)?);
        Ok(self)
    }

    /// Currency stamped on every extracted reference.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    fn price_of(caps: &Captures<'_>) -> Option<f64> {
        group(caps, "price")
            .and_then(sanitize_price)
            .filter(|p| *p >= 0.0)
    }
}

impl Extractor for RegexExtractor {
    fn extract_refs(&self, doc: &str, category: Category) -> Vec<InstrumentRef> {
        self.row
            .captures_iter(doc)
            .filter_map(|caps| {
                let symbol = normalize_symbol(group(&caps, "symbol")?)?;
                let mut r = InstrumentRef::new(symbol, category);
                if let Some(name) = group(&caps, "name") {
                    r = r.with_name(name);
                }
                if let Some(exchange) = group(&caps, "exchange") {
                    r = r.with_exchange(exchange);
                }
                if let Some(currency) = &self.currency {
                    r = r.with_currency(currency.clone());
                }
                if let Some(price) = Self::price_of(&caps) {
                    let change = group(&caps, "change").and_then(sanitize_percent);
                    r = r.with_price(price, change);
                }
                Some(r)
            })
            .collect()
    }

    fn expected_count(&self, doc: &str, _category: Category) -> Option<usize> {
        let caps = self.total.as_ref()?.captures(doc)?;
        let raw = caps.name("count").or_else(|| caps.get(1))?.as_str();
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        digits.parse().ok()
    }

    fn extract_quote(&self, doc: &str, _r: &InstrumentRef) -> Option<(f64, Option<f64>)> {
        let caps = self.quote.as_ref()?.captures(doc)?;
        let price = Self::price_of(&caps)?;
        Some((price, group(&caps, "change").and_then(sanitize_percent)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROW: &str = r#"<tr data-symbol="(?P<symbol>[^"]+)"><td>(?P<name>[^<]*)</td><td>(?P<price>[^<]*)</td><td>(?P<change>[^<]*)</td></tr>"#;

    #[test]
    fn rows_become_priced_refs() {
        let doc = r#"
            <tr data-symbol="btc-usd"><td>Bitcoin</td><td>$43,250.00</td><td>+2.50%</td></tr>
            <tr data-symbol=" eth-usd "><td>Ethereum</td><td>2.650,50</td><td>(1,80%)</td></tr>
            <tr data-symbol="   "><td>Blank</td><td>1</td><td>0</td></tr>
        "#;
        let ex = RegexExtractor::new(ROW).unwrap().with_currency("USD");
        let refs = ex.extract_refs(doc, Category::Crypto);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].symbol, "BTC-USD");
        assert_eq!(refs[0].price, Some(43_250.0));
        assert_eq!(refs[0].change_24h_pct, Some(2.5));
        assert_eq!(refs[1].symbol, "ETH-USD");
        assert_eq!(refs[1].price, Some(2_650.5));
        assert_eq!(refs[1].change_24h_pct, Some(-1.8));
        assert_eq!(refs[1].currency.as_deref(), Some("USD"));
    }

    #[test]
    fn unparseable_price_leaves_ref_unpriced() {
        let doc = r#"<tr data-symbol="AAPL"><td>Apple</td><td>n/a</td><td>-</td></tr>"#;
        let refs = RegexExtractor::new(ROW)
            .unwrap()
            .extract_refs(doc, Category::Stocks);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].price, None);
    }

    #[test]
    fn row_pattern_requires_symbol_group() {
        let err = RegexExtractor::new(r"<td>(?P<price>\d+)</td>").unwrap_err();
        assert!(err.is_invalid_input());
        assert!(RegexExtractor::new("(unclosed").unwrap_err().is_invalid_input());
    }

    #[test]
    fn total_reads_grouped_digits() {
        let ex = RegexExtractor::new(ROW)
            .unwrap()
            .with_total(r"Showing \d+ of (?P<count>[\d,]+) results")
            .unwrap();
        let doc = "<p>Showing 25 of 1,204 results</p>";
        assert_eq!(ex.expected_count(doc, Category::Stocks), Some(1204));
        assert_eq!(ex.expected_count("nothing here", Category::Stocks), None);
    }

    #[test]
    fn closures_are_extractors() {
        let ex = <dyn Extractor>::from_fn(|doc, category| {
            doc.split_whitespace()
                .map(|s| InstrumentRef::new(s, category))
                .collect()
        });
        let refs = ex.extract_refs("AAA BBB", Category::Indices);
        assert_eq!(refs.len(), 2);
        assert_eq!(ex.expected_count("AAA", Category::Indices), None);
    }
}
