//! Quiet put accumulation
//!
//! Heavy opening volume in short-dated OTM puts while their volatility stays
//! cheap against the rest of the put wing. Informed sellers of the stock buy
//! protection without bidding up its price.

use crate::core::OptionQuote;

use super::{
    DetectorKind, DetectorReading, DetectorSignal, InsiderConfig, SkewBias, VolatilitySkew,
};

/// Quiet put accumulation reading for one contract
///
/// Calls, and puts on a chain without a measurable skew, are not applicable.
/// Raw is volume/OI; the reading only carries strength when the contract is
/// an OTM put inside `max_dte` whose volatility is at or below the put wing
/// average on a chain that is not bearishly skewed.
pub fn insider_put_reading(
    quote: &OptionQuote,
    implied_vol: Option<f64>,
    skew: Option<&VolatilitySkew>,
    config: &InsiderConfig,
) -> DetectorReading {
    let not_applicable = |reason: &str| DetectorReading::NotApplicable {
        kind: DetectorKind::InsiderPut,
        reason: reason.to_string(),
    };

    if !quote.right.is_bearish() {
        return not_applicable("call contract");
    }
    let (skew, vol) = match (skew, implied_vol) {
        (Some(skew), Some(vol)) => (skew, vol),
        (None, _) => return not_applicable("no chain skew"),
        (_, None) => return not_applicable("no implied volatility"),
    };

    let ratio = quote.volume_oi_ratio();
    let short_dated = (0..=config.max_dte).contains(&quote.days_to_expiry());
    let quiet = vol <= skew.put_iv && skew.bias != SkewBias::Bearish;
    let setup = quote.otm_pct() > 0.0 && short_dated && quiet;

    let signal = DetectorSignal {
        kind: DetectorKind::InsiderPut,
        raw: ratio,
        strength: if setup { config.ratio.strength(ratio) } else { 0.0 },
        passed: setup && config.ratio.passes(ratio),
    };
    DetectorReading::Signal(signal)
}
