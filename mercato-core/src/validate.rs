//! Plausibility checks for snapshots and sanitizers for scraped values.
//!
//! Validation never raises: a snapshot either passes or is reported with a
//! [`Rejection`] and dropped by the caller.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use regex::Regex;

use mercato_types::{Category, InstrumentSnapshot, MercatoError, ValidationConfig};

/// Why a snapshot was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Empty symbol after trimming.
    EmptySymbol,
    /// Symbol does not match any accepted shape for the category.
    SymbolShape,
    /// Price is NaN or infinite.
    NonFinitePrice,
    /// Price is zero or negative.
    NonPositivePrice,
    /// Price outside the category range.
    PriceOutOfRange,
    /// A present change percent is non-finite or outside the category range.
    ChangeOutOfRange,
    /// Capture time lies in the future.
    FutureTimestamp,
    /// Capture time is older than the maximum age.
    Stale,
    /// Negative or non-finite `volume` metadata.
    Volume,
    /// `market_cap` metadata outside `(0, max_market_cap)`.
    MarketCap,
}

/// Per-category plausibility checks with precompiled symbol patterns.
#[derive(Debug, Clone)]
pub struct Validator {
    cfg: ValidationConfig,
    patterns: BTreeMap<Category, Vec<Regex>>,
}

impl Validator {
    /// Compile a validator from configuration.
    ///
    /// # Errors
    /// Returns `InvalidArg` when a symbol pattern is not a valid regex.
    pub fn new(cfg: ValidationConfig) -> Result<Self, MercatoError> {
        let mut patterns = BTreeMap::new();
        for (category, sources) in &cfg.symbol_patterns {
            let compiled = sources
                .iter()
                .map(|p| {
                    Regex::new(p).map_err(|e| {
                        MercatoError::InvalidArg(format!("bad {category} symbol pattern {p:?}: {e}"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            patterns.insert(*category, compiled);
        }
        Ok(Self { cfg, patterns })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ValidationConfig {
        &self.cfg
    }

    /// Returns true when the snapshot is plausible.
    #[must_use]
    pub fn validate(&self, snap: &InstrumentSnapshot) -> bool {
        self.check(snap).is_ok()
    }

    /// Run every check and report the first failure.
    ///
    /// # Errors
    /// Returns the [`Rejection`] describing the first failed check.
    pub fn check(&self, snap: &InstrumentSnapshot) -> Result<(), Rejection> {
        self.check_symbol(snap.category, &snap.symbol)?;
        self.check_price(snap.category, snap.price)?;
        for change in [snap.change_24h_pct, snap.change_1h_pct].into_iter().flatten() {
            self.check_change(snap.category, change)?;
        }

        let now = Utc::now();
        if snap.ts > now + Duration::seconds(self.cfg.future_tolerance_secs) {
            return Err(Rejection::FutureTimestamp);
        }
        if now - snap.ts > Duration::hours(self.cfg.max_age_hours) {
            return Err(Rejection::Stale);
        }

        if let Some(volume) = snap.meta_f64("volume")
            && !(volume.is_finite() && volume >= 0.0)
        {
            return Err(Rejection::Volume);
        }
        if let Some(cap) = snap.meta_f64("market_cap")
            && !(cap.is_finite() && cap > 0.0 && cap < self.cfg.max_market_cap)
        {
            return Err(Rejection::MarketCap);
        }
        Ok(())
    }

    /// Price check alone.
    ///
    /// # Errors
    /// Returns the failed price rejection.
    pub fn check_price(&self, category: Category, price: f64) -> Result<(), Rejection> {
        if !price.is_finite() {
            return Err(Rejection::NonFinitePrice);
        }
        if price <= 0.0 {
            return Err(Rejection::NonPositivePrice);
        }
        match self.cfg.price.get(&category) {
            Some(range) if !range.contains(price) => Err(Rejection::PriceOutOfRange),
            _ => Ok(()),
        }
    }

    fn check_change(&self, category: Category, change: f64) -> Result<(), Rejection> {
        if !change.is_finite() {
            return Err(Rejection::ChangeOutOfRange);
        }
        match self.cfg.change_pct.get(&category) {
            Some(range) if !range.contains(change) => Err(Rejection::ChangeOutOfRange),
            _ => Ok(()),
        }
    }

    fn check_symbol(&self, category: Category, symbol: &str) -> Result<(), Rejection> {
        let Some(symbol) = normalize_symbol(symbol) else {
            return Err(Rejection::EmptySymbol);
        };
        match self.patterns.get(&category) {
            Some(ps) if !ps.is_empty() && !ps.iter().any(|re| re.is_match(&symbol)) => {
                Err(Rejection::SymbolShape)
            }
            _ => Ok(()),
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        let cfg = ValidationConfig::default();
        // Built-in patterns are known to compile; anything that does not is skipped.
        let patterns = cfg
            .symbol_patterns
            .iter()
            .map(|(c, ps)| (*c, ps.iter().filter_map(|p| Regex::new(p).ok()).collect()))
            .collect();
        Self { cfg, patterns }
    }
}

/// Trim and uppercase a symbol; `None` when nothing is left.
#[must_use]
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let s = raw.trim();
    (!s.is_empty()).then(|| s.to_uppercase())
}

/// Parse a scraped price string.
///
/// Handles currency symbols, thousands separators, decimal commas, a leading
/// sign (including the unicode minus) and accounting parentheses for
/// negatives. Returns `None` for anything unparseable or non-finite.
#[must_use]
pub fn sanitize_price(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parenthesized = trimmed.contains('(') && trimmed.contains(')');

    let mut cleaned = String::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        match ch {
            '0'..='9' | '.' | ',' | '+' | '-' => cleaned.push(ch),
            '\u{2212}' => cleaned.push('-'),
            _ => {}
        }
    }

    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };
    if digits.is_empty() || digits.contains(['+', '-']) {
        return None;
    }

    let normalized = normalize_separators(digits)?;
    let value: f64 = normalized.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative || parenthesized { -value } else { value })
}

/// Parse a scraped percent string such as `"+1.25%"`, `"(0,5 %)"` or `"-3"`.
#[must_use]
pub fn sanitize_percent(raw: &str) -> Option<f64> {
    sanitize_price(&raw.replace('%', ""))
}

fn normalize_separators(digits: &str) -> Option<String> {
    let commas = digits.matches(',').count();
    let dots = digits.matches('.').count();

    let out = match (commas, dots) {
        (0, 0 | 1) => digits.to_string(),
        (0, _) => digits.replace('.', ""),
        (_, 0) => {
            let decimals = digits.rsplit(',').next().map_or(0, str::len);
            if commas == 1 && decimals <= 2 {
                digits.replace(',', ".")
            } else {
                digits.replace(',', "")
            }
        }
        _ => {
            // Whichever separator comes last is the decimal point.
            let last_comma = digits.rfind(',')?;
            let last_dot = digits.rfind('.')?;
            if last_dot > last_comma {
                if dots > 1 {
                    return None;
                }
                digits.replace(',', "")
            } else {
                if commas > 1 {
                    return None;
                }
                digits.replace('.', "").replace(',', ".")
            }
        }
    };
    (!out.is_empty() && out != ".").then_some(out)
}
