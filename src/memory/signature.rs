//! Trade pattern signatures
//!
//! A signature is a SHA-256 digest over the ticker, the trade type and a
//! coarse strike/expiry bucket, so that contracts expressing the same
//! pattern share history while distinct patterns do not alias.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::OptionQuote;

/// Width of a moneyness bucket in percent
const MONEYNESS_BUCKET_PCT: f64 = 5.0;

/// Coarse days-to-expiry bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpiryBucket {
    /// 0-7 days
    Weekly,
    /// 8-30 days
    Monthly,
    /// 31-90 days
    Quarterly,
    /// 91+ days
    Leaps,
}

impl ExpiryBucket {
    pub fn from_days(days: i64) -> Self {
        match days {
            i64::MIN..=7 => ExpiryBucket::Weekly,
            8..=30 => ExpiryBucket::Monthly,
            31..=90 => ExpiryBucket::Quarterly,
            _ => ExpiryBucket::Leaps,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ExpiryBucket::Weekly => "0-7D",
            ExpiryBucket::Monthly => "8-30D",
            ExpiryBucket::Quarterly => "31-90D",
            ExpiryBucket::Leaps => "91D+",
        }
    }
}

/// Stable key for a (ticker, trade type, strike/expiry bucket) pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradeSignature {
    pub ticker: String,
    /// Trade type category ("CALLS" / "PUTS")
    pub trade_type: String,
    /// Signed OTM distance bucket, in steps of 5%
    pub moneyness_bucket: i32,
    pub expiry_bucket: ExpiryBucket,
    /// Hex-encoded SHA-256 of the fields above
    pub key: String,
}

impl TradeSignature {
    pub fn new(
        ticker: &str,
        trade_type: &str,
        moneyness_bucket: i32,
        expiry_bucket: ExpiryBucket,
    ) -> Self {
        let ticker = ticker.trim().to_uppercase();
        let trade_type = trade_type.trim().to_uppercase();

        let mut hasher = Sha256::new();
        hasher.update(ticker.as_bytes());
        hasher.update(b"|");
        hasher.update(trade_type.as_bytes());
        hasher.update(b"|");
        hasher.update(moneyness_bucket.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(expiry_bucket.code().as_bytes());
        let key = hex::encode(hasher.finalize());

        Self {
            ticker,
            trade_type,
            moneyness_bucket,
            expiry_bucket,
            key,
        }
    }

    /// Signature of the pattern a quote belongs to
    pub fn for_quote(quote: &OptionQuote) -> Self {
        let bucket = (quote.otm_pct() / MONEYNESS_BUCKET_PCT).floor();
        let bucket = if bucket.is_finite() {
            bucket.clamp(i32::MIN as f64, i32::MAX as f64) as i32
        } else {
            0
        };

        Self::new(
            &quote.ticker,
            quote.right.label(),
            bucket,
            ExpiryBucket::from_days(quote.days_to_expiry()),
        )
    }
}

impl fmt::Display for TradeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{:+}/{} ({})",
            self.ticker,
            self.trade_type,
            self.moneyness_bucket,
            self.expiry_bucket.code(),
            self.key.get(..12).unwrap_or(self.key.as_str())
        )
    }
}
