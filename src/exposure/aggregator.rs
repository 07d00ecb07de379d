//! Stage 1: Per-strike exposure aggregation
//!
//! Rebuilt from scratch every cycle; the map is never patched in place.

use std::collections::BTreeMap;

use crate::core::{FlowError, FlowResult, GreeksResult, OptionQuote};

use super::{ExposureConfig, ExposureMap, ExposureRejection, StrikeExposure, StrikeKey};

/// Aggregate signed dealer exposure per strike
///
/// # Arguments
/// * `entries` - Contracts with their Greeks (one ticker)
/// * `spot` - Underlying price for the cycle, the wall tie-break reference
/// * `config` - Multiplier and dealer sign convention
///
/// # Returns
/// Exposure map; individually invalid entries are reported in
/// `ExposureMap::rejected` instead of failing the aggregation.
/// A genuinely empty input is `EmptyChain`; a non-positive spot is
/// `InvalidInput`.
pub fn aggregate_exposure(
    entries: &[(OptionQuote, GreeksResult)],
    spot: f64,
    config: &ExposureConfig,
) -> FlowResult<ExposureMap> {
    let first = entries
        .first()
        .ok_or_else(|| FlowError::empty_chain("no contracts to aggregate"))?;

    let ticker = first.0.ticker.clone();
    if !(spot > 0.0) || !spot.is_finite() {
        return Err(FlowError::invalid_input(format!(
            "{}: invalid spot {} for exposure",
            ticker, spot
        )));
    }

    let mut strikes: BTreeMap<StrikeKey, StrikeExposure> = BTreeMap::new();
    let mut rejected: Vec<ExposureRejection> = Vec::new();

    for (quote, greeks) in entries {
        if let Err(reason) = check_entry(quote, greeks, &ticker) {
            tracing::warn!(
                "Exposure: dropping {} ({})",
                quote.contract_symbol(),
                reason
            );
            rejected.push(ExposureRejection {
                contract: quote.contract_symbol(),
                reason,
            });
            continue;
        }

        let factor = quote.open_interest as f64
            * config.contract_multiplier
            * config.dealer_convention.sign(quote.right);

        let level = strikes
            .entry(StrikeKey::from_strike(quote.strike))
            .or_insert_with(|| StrikeExposure::empty(quote.strike));

        level.net_gamma += greeks.gamma * factor;
        level.net_vanna += greeks.vanna * factor;
        level.net_charm += greeks.charm * factor;
        level.open_interest += quote.open_interest;
        level.contracts += 1;
    }

    Ok(ExposureMap {
        ticker,
        spot,
        strikes,
        rejected,
    })
}

fn check_entry(quote: &OptionQuote, greeks: &GreeksResult, ticker: &str) -> Result<(), String> {
    if quote.ticker != ticker {
        return Err(format!("ticker {} in chain for {}", quote.ticker, ticker));
    }
    if !(quote.strike > 0.0) || !quote.strike.is_finite() {
        return Err(format!("invalid strike {}", quote.strike));
    }
    if !(quote.underlying_price > 0.0) || !quote.underlying_price.is_finite() {
        return Err(format!("invalid underlying price {}", quote.underlying_price));
    }
    if !greeks.is_finite() {
        return Err("non-finite greeks".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::option::tests::sample_quote;
    use crate::core::OptionRight;
    use crate::exposure::DealerConvention;

    fn entry(right: OptionRight, strike: f64, oi: u64, gamma: f64) -> (OptionQuote, GreeksResult) {
        let mut q = sample_quote(right, strike);
        q.open_interest = oi;
        (q, GreeksResult::new(0.5, gamma, 0.1, -0.2, 0.01, 3.0))
    }

    #[test]
    fn test_empty_input_is_error() {
        let err = aggregate_exposure(&[], 138.5, &ExposureConfig::default()).unwrap_err();
        assert!(matches!(err, FlowError::EmptyChain(_)));
    }

    #[test]
    fn test_signed_aggregation() {
        let entries = vec![
            entry(OptionRight::Call, 150.0, 1000, 0.02),
            entry(OptionRight::Put, 150.0, 400, 0.02),
            entry(OptionRight::Put, 140.0, 500, 0.01),
        ];
        let map = aggregate_exposure(&entries, 138.5, &ExposureConfig::default()).unwrap();

        assert_eq!(map.len(), 2);
        let at_150 = map.entry(150.0).unwrap();
        // (1000 - 400) * 100 * 0.02
        assert!((at_150.net_gamma - 1200.0).abs() < 1e-9);
        assert_eq!(at_150.contracts, 2);
        assert_eq!(at_150.open_interest, 1400);

        let at_140 = map.entry(140.0).unwrap();
        assert!((at_140.net_gamma + 500.0).abs() < 1e-9);
        assert!((map.spot - 138.5).abs() < 1e-12);
    }

    #[test]
    fn test_inverted_convention_flips_sign() {
        let entries = vec![entry(OptionRight::Call, 150.0, 1000, 0.02)];
        let config = ExposureConfig {
            dealer_convention: DealerConvention::PutsPositive,
            ..Default::default()
        };
        let map = aggregate_exposure(&entries, 138.5, &config).unwrap();
        assert!(map.entry(150.0).unwrap().net_gamma < 0.0);
    }

    #[test]
    fn test_all_invalid_gives_empty_map() {
        let mut bad_strike = entry(OptionRight::Call, 150.0, 1000, 0.02);
        bad_strike.0.strike = -1.0;
        let mut bad_greeks = entry(OptionRight::Put, 140.0, 1000, 0.02);
        bad_greeks.1.gamma = f64::NAN;

        let map = aggregate_exposure(&[bad_strike, bad_greeks], 138.5, &ExposureConfig::default()).unwrap();
        assert!(map.is_empty());
        assert_eq!(map.rejected.len(), 2);
    }

    #[test]
    fn test_strike_keys_merge_float_noise() {
        let entries = vec![
            entry(OptionRight::Call, 150.0, 100, 0.02),
            entry(OptionRight::Call, 150.0 + 1e-9, 100, 0.02),
        ];
        let map = aggregate_exposure(&entries, 138.5, &ExposureConfig::default()).unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_wall_tie_uses_cycle_spot() {
        // Equal call gamma at 130 and 150; every quote reports 138.5
        let entries = vec![
            entry(OptionRight::Call, 130.0, 1000, 0.02),
            entry(OptionRight::Call, 150.0, 1000, 0.02),
        ];
        let config = ExposureConfig::default();

        let near_low = aggregate_exposure(&entries, 138.5, &config).unwrap();
        assert_eq!(near_low.spot, 138.5);
        assert_eq!(near_low.key_levels().call_wall, Some(130.0));

        let near_high = aggregate_exposure(&entries, 146.0, &config).unwrap();
        assert_eq!(near_high.spot, 146.0);
        assert_eq!(near_high.key_levels().call_wall, Some(150.0));
    }

    #[test]
    fn test_invalid_spot_rejected() {
        let entries = vec![entry(OptionRight::Call, 150.0, 1000, 0.02)];
        let err = aggregate_exposure(&entries, 0.0, &ExposureConfig::default()).unwrap_err();
        assert!(matches!(err, FlowError::InvalidInput(_)));
        assert!(aggregate_exposure(&entries, f64::NAN, &ExposureConfig::default()).is_err());
    }
}
