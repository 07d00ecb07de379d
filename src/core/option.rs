//! Option contract quotes
//!
//! One `OptionQuote` per observed contract per scan cycle. Quotes are
//! immutable snapshots; everything the engine derives from them is computed
//! from these fields alone.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Hour (UTC) treated as the expiry-day close
const EXPIRY_CLOSE_HOUR_UTC: u32 = 21;
const SECONDS_PER_YEAR: f64 = 365.0 * 86_400.0;

/// Option right (Call or Put)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionRight {
    Call,
    Put,
}

impl OptionRight {
    /// Payoff direction: +1 for call, -1 for put
    pub fn phi(&self) -> f64 {
        match self {
            OptionRight::Call => 1.0,
            OptionRight::Put => -1.0,
        }
    }

    /// Intrinsic value at given spot
    pub fn intrinsic(&self, spot: f64, strike: f64) -> f64 {
        match self {
            OptionRight::Call => (spot - strike).max(0.0),
            OptionRight::Put => (strike - spot).max(0.0),
        }
    }

    /// Puts are the bearish side of the book
    pub fn is_bearish(&self) -> bool {
        matches!(self, OptionRight::Put)
    }

    /// OCC symbol letter
    pub fn code(&self) -> char {
        match self {
            OptionRight::Call => 'C',
            OptionRight::Put => 'P',
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OptionRight::Call => "CALLS",
            OptionRight::Put => "PUTS",
        }
    }
}

/// Option market observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionQuote {
    /// Underlying symbol
    pub ticker: String,
    pub strike: f64,
    pub expiry: NaiveDate,
    pub right: OptionRight,
    pub bid: f64,
    pub ask: f64,
    /// Last traded price
    pub last: f64,
    /// Session volume (contracts)
    pub volume: u64,
    pub open_interest: u64,
    /// Implied volatility as reported by the feed; non-positive means missing
    pub implied_vol: f64,
    /// Underlying spot at quote time
    pub underlying_price: f64,
    pub timestamp: DateTime<Utc>,
}

impl OptionQuote {
    /// OCC-style contract symbol, e.g. `NVDA240621C00150000`
    pub fn contract_symbol(&self) -> String {
        let strike_milli = (self.strike * 1000.0).round().max(0.0) as u64;
        format!(
            "{}{}{}{:08}",
            self.ticker,
            self.expiry.format("%y%m%d"),
            self.right.code(),
            strike_milli
        )
    }

    /// Bid/ask midpoint, if both sides are quoted
    pub fn mid(&self) -> Option<f64> {
        if self.bid > 0.0 && self.ask > 0.0 && self.ask >= self.bid {
            Some((self.bid + self.ask) / 2.0)
        } else {
            None
        }
    }

    /// Best available price (mid > last)
    pub fn best_price(&self) -> Option<f64> {
        self.mid().or(if self.last > 0.0 { Some(self.last) } else { None })
    }

    /// Premium traded: volume x last x multiplier
    pub fn notional(&self, multiplier: f64) -> f64 {
        self.volume as f64 * self.last.max(0.0) * multiplier
    }

    /// Volume over open interest, OI floored at 1
    pub fn volume_oi_ratio(&self) -> f64 {
        self.volume as f64 / (self.open_interest.max(1)) as f64
    }

    /// Volume exceeding open interest suggests new positions being opened
    pub fn is_opening(&self) -> bool {
        self.volume > self.open_interest
    }

    /// Time to expiry in years, measured to the expiry-day close
    pub fn time_to_expiry(&self) -> f64 {
        let close = self
            .expiry
            .and_hms_opt(EXPIRY_CLOSE_HOUR_UTC, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive));

        match close {
            Some(close) => (close - self.timestamp).num_seconds() as f64 / SECONDS_PER_YEAR,
            None => 0.0,
        }
    }

    /// Calendar days to expiry from the quote date
    pub fn days_to_expiry(&self) -> i64 {
        (self.expiry - self.timestamp.date_naive()).num_days()
    }

    /// |K - S| / S in percent
    pub fn moneyness_pct(&self) -> f64 {
        if self.underlying_price > 0.0 {
            (self.strike - self.underlying_price).abs() / self.underlying_price * 100.0
        } else {
            f64::INFINITY
        }
    }

    /// Signed out-of-the-money distance in percent (negative when ITM)
    pub fn otm_pct(&self) -> f64 {
        if self.underlying_price <= 0.0 {
            return 0.0;
        }
        self.right.phi() * (self.strike - self.underlying_price) / self.underlying_price * 100.0
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_quote(right: OptionRight, strike: f64) -> OptionQuote {
        OptionQuote {
            ticker: "NVDA".to_string(),
            strike,
            expiry: NaiveDate::from_ymd_opt(2024, 6, 21).unwrap(),
            right,
            bid: 5.10,
            ask: 5.20,
            last: 5.20,
            volume: 8500,
            open_interest: 1200,
            implied_vol: 0.45,
            underlying_price: 138.5,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 22, 15, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_option_right() {
        assert_eq!(OptionRight::Call.phi(), 1.0);
        assert_eq!(OptionRight::Put.phi(), -1.0);

        assert_eq!(OptionRight::Call.intrinsic(110.0, 100.0), 10.0);
        assert_eq!(OptionRight::Put.intrinsic(90.0, 100.0), 10.0);
        assert_eq!(OptionRight::Call.intrinsic(90.0, 100.0), 0.0);
        assert!(OptionRight::Put.is_bearish());
    }

    #[test]
    fn test_contract_symbol() {
        let q = sample_quote(OptionRight::Call, 150.0);
        assert_eq!(q.contract_symbol(), "NVDA240621C00150000");

        let p = sample_quote(OptionRight::Put, 132.5);
        assert_eq!(p.contract_symbol(), "NVDA240621P00132500");
    }

    #[test]
    fn test_notional_and_ratio() {
        let mut q = sample_quote(OptionRight::Call, 150.0);
        assert!((q.notional(100.0) - 4_420_000.0).abs() < 1e-6);
        assert!((q.volume_oi_ratio() - 8500.0 / 1200.0).abs() < 1e-12);
        assert!(q.is_opening());

        q.open_interest = 0;
        assert_eq!(q.volume_oi_ratio(), 8500.0);
    }

    #[test]
    fn test_time_to_expiry() {
        let q = sample_quote(OptionRight::Call, 150.0);
        assert_eq!(q.days_to_expiry(), 30);

        // 30 days plus six hours to the 21:00 UTC close
        let expected = (30.0 * 86_400.0 + 6.0 * 3600.0) / SECONDS_PER_YEAR;
        assert!((q.time_to_expiry() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_moneyness() {
        let q = sample_quote(OptionRight::Call, 150.0);
        assert!(q.otm_pct() > 0.0);
        let p = sample_quote(OptionRight::Put, 150.0);
        assert!(p.otm_pct() < 0.0);
        assert!((q.moneyness_pct() - p.moneyness_pct()).abs() < 1e-12);
    }

    #[test]
    fn test_mid_requires_both_sides() {
        let mut q = sample_quote(OptionRight::Call, 150.0);
        assert!((q.mid().unwrap() - 5.15).abs() < 1e-12);
        q.bid = 0.0;
        assert!(q.mid().is_none());
        assert_eq!(q.best_price(), Some(5.20));
    }
}
